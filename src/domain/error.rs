//! Error taxonomy for the sync client

use alloy::primitives::B256;
use thiserror::Error;

use super::action::ActionKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Connected to the wrong chain; blocks every call until the user switches
    #[error("wrong network: expected chain {expected}, connected to {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error("wallet rejected the request: {0}")]
    WalletRejected(String),

    #[error("contract read failed: {0}")]
    ReadFailed(String),

    #[error("{kind} reverted: {reason}")]
    TxReverted { kind: ActionKind, reason: String },

    /// Programming-contract violation, e.g. submitting while a call is in flight
    #[error("caller misuse: {0}")]
    CallerMisuse(String),

    #[error("{kind} not settled in time (tx {tx_hash})")]
    TimedOut { kind: ActionKind, tx_hash: B256 },

    /// Handle issued for a connection that has since been torn down
    #[error("connection handle is no longer valid")]
    StaleHandle,

    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),
}

impl SyncError {
    /// Whether the user can recover by retrying the same action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::WalletRejected(_)
                | SyncError::ReadFailed(_)
                | SyncError::TxReverted { .. }
                | SyncError::TimedOut { .. }
        )
    }
}
