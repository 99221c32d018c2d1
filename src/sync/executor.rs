//! Transaction submission and settlement tracking

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{B256, U256};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::domain::{ActionKind, PendingAction, Settlement, SyncError};
use crate::infrastructure::ethereum::{PresaleContract, ReceiptStatus, WalletError, WalletProvider};
use crate::sync::resolver::SigningHandle;
use crate::sync::state::StateStore;

pub struct TxExecutor {
    contract: PresaleContract,
    mint_price: U256,
    settle_timeout: Duration,
    receipt_poll_interval: Duration,
    store: Arc<StateStore>,
}

impl TxExecutor {
    pub fn new(
        contract: PresaleContract,
        mint_price: U256,
        settle_timeout: Duration,
        receipt_poll_interval: Duration,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            contract,
            mint_price,
            settle_timeout,
            receipt_poll_interval,
            store,
        }
    }

    /// Sign and broadcast `kind`
    ///
    /// Fails with `CallerMisuse` before any network contact if another
    /// action is still pending. On any failure the slot is released again.
    pub async fn submit(
        &self,
        kind: ActionKind,
        handle: &SigningHandle,
    ) -> Result<PendingAction, SyncError> {
        handle.ensure_live()?;
        let pending = self.store.claim_pending(kind)?;

        let request = self
            .contract
            .action_request(kind, handle.signer(), self.mint_price);
        let wallet = match handle.wallet() {
            Ok(wallet) => wallet,
            Err(err) => {
                self.store.release_pending(pending.id);
                return Err(err);
            }
        };

        info!(%kind, from = %handle.signer(), "submitting transaction");
        match wallet.send_transaction(request).await {
            Ok(tx_hash) => {
                info!(%kind, tx = %tx_hash, "transaction broadcast");
                Ok(self
                    .store
                    .mark_submitted(pending.id, tx_hash)
                    .unwrap_or(PendingAction {
                        tx_hash: Some(tx_hash),
                        ..pending
                    }))
            }
            Err(err) => {
                self.store.release_pending(pending.id);
                warn!(%kind, error = %err, "transaction not submitted");
                Err(match err {
                    WalletError::Rejected(reason) => SyncError::WalletRejected(reason),
                    WalletError::Reverted(reason) => SyncError::TxReverted { kind, reason },
                    WalletError::Transport(err) => SyncError::WalletRejected(format!("{err:#}")),
                })
            }
        }
    }

    /// Wait for inclusion of a submitted action, bounded by the settle timeout
    ///
    /// The pending slot is released whatever the outcome.
    pub async fn await_settlement(
        &self,
        pending: PendingAction,
        handle: &SigningHandle,
    ) -> Settlement {
        let Some(tx_hash) = pending.tx_hash else {
            self.store.release_pending(pending.id);
            return Settlement::WalletRejected {
                reason: "transaction was never broadcast".into(),
            };
        };
        // The transaction is out; follow it even if the connection went stale
        if !handle.is_live() {
            debug!(kind = %pending.kind, tx = %tx_hash, "connection changed; still following tx");
        }
        let wallet = handle.broadcast_wallet();

        let outcome = timeout(
            self.settle_timeout,
            wait_for_receipt(wallet, tx_hash, self.receipt_poll_interval),
        )
        .await;
        self.store.release_pending(pending.id);

        match outcome {
            Ok(status) if status.success => {
                info!(kind = %pending.kind, tx = %tx_hash, block = ?status.block_number, "transaction confirmed");
                Settlement::Confirmed {
                    tx_hash,
                    block_number: status.block_number,
                }
            }
            Ok(status) => {
                warn!(kind = %pending.kind, tx = %tx_hash, "transaction reverted on chain");
                Settlement::Reverted {
                    tx_hash: Some(tx_hash),
                    reason: match status.block_number {
                        Some(block) => format!("execution reverted in block {block}"),
                        None => "execution reverted".to_string(),
                    },
                }
            }
            Err(_) => {
                warn!(kind = %pending.kind, tx = %tx_hash, timeout = ?self.settle_timeout, "settlement timed out");
                Settlement::TimedOut { tx_hash }
            }
        }
    }
}

/// Map a settlement onto the error taxonomy
pub fn settlement_result(kind: ActionKind, settlement: Settlement) -> Result<B256, SyncError> {
    match settlement {
        Settlement::Confirmed { tx_hash, .. } => Ok(tx_hash),
        Settlement::Reverted { reason, .. } => Err(SyncError::TxReverted { kind, reason }),
        Settlement::WalletRejected { reason } => Err(SyncError::WalletRejected(reason)),
        Settlement::TimedOut { tx_hash } => Err(SyncError::TimedOut { kind, tx_hash }),
    }
}

/// Poll for the receipt until the transaction is included
///
/// Lookup errors are logged and retried on the next interval; the caller's
/// timeout bounds the wait.
async fn wait_for_receipt(
    wallet: &dyn WalletProvider,
    tx_hash: B256,
    poll_interval: Duration,
) -> ReceiptStatus {
    loop {
        match wallet.receipt_status(tx_hash).await {
            Ok(Some(status)) => return status,
            Ok(None) => debug!(tx = %tx_hash, "transaction not yet included"),
            Err(err) => warn!(tx = %tx_hash, error = %err, "receipt lookup failed"),
        }
        sleep(poll_interval).await;
    }
}
