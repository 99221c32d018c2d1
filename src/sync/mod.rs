//! Contract state synchronization client
//!
//! [`SyncClient`] wires the resolver, reader, executor and poll scheduler
//! around one explicit session store. The connect/disconnect pair bounds the
//! session lifecycle; nothing here is global.

pub mod executor;
pub mod reader;
pub mod resolver;
pub mod scheduler;
pub mod state;

use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::B256;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Settings;
use crate::core::Notifier;
use crate::domain::{ActionKind, ContractSnapshot, Settlement, SyncError};
use crate::infrastructure::ethereum::{PresaleContract, WalletProvider};

pub use executor::{settlement_result, TxExecutor};
pub use reader::StateReader;
pub use resolver::{ConnectionHandle, HandleMode, NetworkResolver, SigningHandle};
pub use scheduler::{PollContext, PollScheduler, PollTask};
pub use state::{ApplyGuard, ReadTicket, StateStore, SyncView};

pub struct SyncClient {
    settings: Settings,
    store: Arc<StateStore>,
    resolver: Arc<NetworkResolver>,
    reader: Arc<StateReader>,
    executor: TxExecutor,
    scheduler: Mutex<PollScheduler>,
    notifier: Notifier,
}

impl SyncClient {
    pub fn new(wallet: Arc<dyn WalletProvider>, settings: Settings, notifier: Notifier) -> Self {
        Self::with_reader(
            wallet,
            StateReader::new(PresaleContract::new(settings.contract_address)),
            settings,
            notifier,
        )
    }

    /// Client with a custom reader (e.g. an injected clock)
    pub fn with_reader(
        wallet: Arc<dyn WalletProvider>,
        reader: StateReader,
        settings: Settings,
        notifier: Notifier,
    ) -> Self {
        let store = Arc::new(StateStore::new());
        let contract = PresaleContract::new(settings.contract_address);
        let resolver = Arc::new(NetworkResolver::new(
            wallet,
            Arc::clone(&store),
            notifier.clone(),
            settings.expected_chain_id,
        ));
        let executor = TxExecutor::new(
            contract,
            settings.mint_price,
            settings.settle_timeout,
            settings.receipt_poll_interval,
            Arc::clone(&store),
        );
        Self {
            scheduler: Mutex::new(PollScheduler::new(Arc::clone(&store))),
            settings,
            store,
            resolver,
            reader: Arc::new(reader),
            executor,
            notifier,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn view(&self) -> SyncView {
        self.store.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.store.subscribe()
    }

    fn scheduler(&self) -> MutexGuard<'_, PollScheduler> {
        self.scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler().is_running()
    }

    pub fn is_task_running(&self, task: PollTask) -> bool {
        self.scheduler().is_task_running(task)
    }

    /// Connect the wallet, read the contract once, and start polling
    ///
    /// A failed initial read is logged but does not fail the connection;
    /// the polls will catch up. A `disconnect` that lands meanwhile wins:
    /// the call fails with `StaleHandle` and no poll is started.
    pub async fn connect(&self) -> Result<SyncView, SyncError> {
        let handle = self.resolver.resolve(false).await?;
        if let Err(err) = self.refresh_with(&handle).await {
            warn!(error = %err, "initial contract read failed");
        }
        self.start_polling(&handle)?;
        Ok(self.view())
    }

    /// Resolve and read once, without starting the polls
    pub async fn read_once(&self) -> Result<SyncView, SyncError> {
        let handle = self.resolver.resolve(false).await?;
        self.refresh_with(&handle).await?;
        Ok(self.view())
    }

    fn start_polling(&self, handle: &ConnectionHandle) -> Result<(), SyncError> {
        // Checked under the scheduler lock, which `disconnect` holds throughout
        let mut scheduler = self.scheduler();
        self.store.require_session(handle.generation())?;
        scheduler.start(PollContext {
            resolver: Arc::clone(&self.resolver),
            reader: Arc::clone(&self.reader),
            store: Arc::clone(&self.store),
            interval: self.settings.poll_interval,
        });
        Ok(())
    }

    /// Stop polling and drop the session
    pub fn disconnect(&self) {
        let mut scheduler = self.scheduler();
        scheduler.stop();
        self.store.disconnect();
        info!("wallet disconnected");
    }

    /// Manual refresh of the whole snapshot
    pub async fn refresh(&self) -> Result<ContractSnapshot, SyncError> {
        let handle = self.resolver.resolve(false).await?;
        self.refresh_with(&handle).await
    }

    async fn refresh_with(&self, handle: &ConnectionHandle) -> Result<ContractSnapshot, SyncError> {
        let ticket = self.store.issue_read();
        let snapshot = self.reader.read_snapshot(handle).await?;
        self.store
            .apply_snapshot(ApplyGuard::connection(handle.generation()), ticket, &snapshot);
        Ok(snapshot)
    }

    /// Submit `kind`, wait for it to settle, notify the user, and refresh
    /// the snapshot on confirmation
    pub async fn run_action(&self, kind: ActionKind) -> Result<B256, SyncError> {
        // Cheap gate before the wallet is contacted at all
        if let Some(pending) = self.store.pending() {
            return Err(SyncError::CallerMisuse(format!(
                "{kind} requested while {} is still pending",
                pending.kind
            )));
        }

        let handle = self.resolver.resolve_signing().await?;
        let pending = match self.executor.submit(kind, &handle).await {
            Ok(pending) => pending,
            Err(err) => {
                self.notify_failure(kind, &err);
                return Err(err);
            }
        };

        let settlement = self.executor.await_settlement(pending, &handle).await;
        if let Settlement::Confirmed { .. } = settlement {
            self.notify_success(kind);
            if let Err(err) = self.refresh_with(&handle).await {
                warn!(%kind, error = %err, "refresh after confirmation failed");
            }
        }
        let result = settlement_result(kind, settlement);
        if let Err(err) = &result {
            self.notify_failure(kind, err);
        }
        result
    }

    fn notify_success(&self, kind: ActionKind) {
        match kind {
            ActionKind::StartPresale => self.notifier.info("Presale started"),
            ActionKind::PresaleMint | ActionKind::PublicMint => {
                self.notifier.info("You successfully minted a Crypto Dev!")
            }
        }
    }

    fn notify_failure(&self, kind: ActionKind, err: &SyncError) {
        if let Some(text) = failure_notice(kind, err) {
            self.notifier.warn(text);
        }
    }
}

/// User notice for a failed action; `None` when retrying would not help,
/// e.g. a second press while the first action is still pending
fn failure_notice(kind: ActionKind, err: &SyncError) -> Option<String> {
    if !err.is_retryable() {
        return None;
    }
    Some(match kind {
        ActionKind::StartPresale => {
            format!("Something went wrong while starting the presale: {err}")
        }
        ActionKind::PresaleMint | ActionKind::PublicMint => {
            format!("There was a problem trying to mint, try again: {err}")
        }
    })
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.scheduler().stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_notice_for_retryable_errors() {
        let notice = failure_notice(
            ActionKind::PresaleMint,
            &SyncError::WalletRejected("User denied".into()),
        );
        assert!(notice.is_some_and(|text| text.starts_with("There was a problem trying to mint")));

        let notice = failure_notice(
            ActionKind::StartPresale,
            &SyncError::TimedOut {
                kind: ActionKind::StartPresale,
                tx_hash: B256::ZERO,
            },
        );
        assert!(notice.is_some_and(|text| text.contains("starting the presale")));
    }

    #[test]
    fn test_no_failure_notice_for_busy_slot() {
        let err = SyncError::CallerMisuse(
            "public mint requested while presale mint is still pending".into(),
        );
        assert_eq!(failure_notice(ActionKind::PublicMint, &err), None);
        assert_eq!(failure_notice(ActionKind::PublicMint, &SyncError::StaleHandle), None);
    }
}
