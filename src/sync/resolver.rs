//! Network context resolution
//!
//! Every read and write goes through [`NetworkResolver::resolve`], which
//! re-checks the chain on each call: the user may switch networks in the
//! wallet at any time without disconnecting.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::core::Notifier;
use crate::domain::SyncError;
use crate::infrastructure::ethereum::WalletProvider;
use crate::sync::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    ReadOnly,
    Signing,
}

/// Capability to talk to the contract over a validated connection
///
/// Tied to the connection it was issued for; once that connection is torn
/// down or found on the wrong chain, every use fails with `StaleHandle`.
#[derive(Clone)]
pub struct ConnectionHandle {
    mode: HandleMode,
    wallet: Arc<dyn WalletProvider>,
    store: Arc<StateStore>,
    chain_id: u64,
    address: Option<Address>,
    generation: u64,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("mode", &self.mode)
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ConnectionHandle {
    pub fn mode(&self) -> HandleMode {
        self.mode
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.store.connection_generation() == self.generation
    }

    pub fn ensure_live(&self) -> Result<(), SyncError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(SyncError::StaleHandle)
        }
    }

    /// The wallet behind this handle, after a liveness check
    pub fn wallet(&self) -> Result<&dyn WalletProvider, SyncError> {
        self.ensure_live()?;
        Ok(self.wallet.as_ref())
    }

    /// The wallet without the liveness check, for following a transaction
    /// that was already broadcast
    pub(crate) fn broadcast_wallet(&self) -> &dyn WalletProvider {
        self.wallet.as_ref()
    }

    pub fn into_signing(self) -> Result<SigningHandle, SyncError> {
        match (self.mode, self.address) {
            (HandleMode::Signing, Some(address)) => Ok(SigningHandle {
                inner: self,
                address,
            }),
            _ => Err(SyncError::CallerMisuse(
                "a signing handle is required for transactions".into(),
            )),
        }
    }
}

/// A handle able to authorize transactions for `address`
#[derive(Debug, Clone)]
pub struct SigningHandle {
    inner: ConnectionHandle,
    address: Address,
}

impl SigningHandle {
    pub fn signer(&self) -> Address {
        self.address
    }
}

impl Deref for SigningHandle {
    type Target = ConnectionHandle;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct NetworkResolver {
    wallet: Arc<dyn WalletProvider>,
    store: Arc<StateStore>,
    notifier: Notifier,
    expected_chain_id: u64,
    mismatch_reported: AtomicBool,
}

impl NetworkResolver {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        store: Arc<StateStore>,
        notifier: Notifier,
        expected_chain_id: u64,
    ) -> Self {
        Self {
            wallet,
            store,
            notifier,
            expected_chain_id,
            mismatch_reported: AtomicBool::new(false),
        }
    }

    /// Resolve for a user action, opening the session if needed
    pub async fn resolve(&self, needs_signing: bool) -> Result<ConnectionHandle, SyncError> {
        self.resolve_inner(needs_signing, true).await
    }

    /// Resolve for background work: never opens a session, and fails with
    /// `StaleHandle` once the session is gone
    pub async fn resolve_existing(&self) -> Result<ConnectionHandle, SyncError> {
        self.resolve_inner(false, false).await
    }

    async fn resolve_inner(
        &self,
        needs_signing: bool,
        open_session: bool,
    ) -> Result<ConnectionHandle, SyncError> {
        let generation = self.store.connection_generation();
        if !open_session {
            self.store.require_session(generation)?;
        }

        let address = self
            .wallet
            .connect()
            .await
            .map_err(|err| SyncError::WalletUnavailable(format!("{err:#}")))?;
        let chain_id = self
            .wallet
            .chain_id()
            .await
            .map_err(|err| SyncError::WalletUnavailable(format!("{err:#}")))?;

        if chain_id != self.expected_chain_id {
            self.store.invalidate_handles();
            if !self.mismatch_reported.swap(true, Ordering::SeqCst) {
                warn!(
                    expected = self.expected_chain_id,
                    actual = chain_id,
                    "wallet is on the wrong network"
                );
                self.notifier.warn(format!(
                    "Change the network to chain {}",
                    self.expected_chain_id
                ));
            }
            return Err(SyncError::NetworkMismatch {
                expected: self.expected_chain_id,
                actual: chain_id,
            });
        }
        self.mismatch_reported.store(false, Ordering::SeqCst);

        if needs_signing && address.is_none() {
            return Err(SyncError::WalletUnavailable(
                "no account available for signing".into(),
            ));
        }

        if !open_session {
            self.store.require_session(generation)?;
        } else if self.store.connect_session(generation, address)? {
            info!(
                endpoint = %self.wallet.endpoint_name(),
                account = ?address,
                chain_id,
                "wallet connected"
            );
        }

        Ok(ConnectionHandle {
            mode: if needs_signing {
                HandleMode::Signing
            } else {
                HandleMode::ReadOnly
            },
            wallet: Arc::clone(&self.wallet),
            store: Arc::clone(&self.store),
            chain_id,
            address,
            generation,
        })
    }

    pub async fn resolve_signing(&self) -> Result<SigningHandle, SyncError> {
        self.resolve(true).await?.into_signing()
    }
}
