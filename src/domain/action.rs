//! Mutating contract actions and their lifecycle

use std::fmt;
use std::time::Instant;

use alloy::primitives::B256;

/// State-changing calls the client can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    StartPresale,
    PresaleMint,
    PublicMint,
}

impl ActionKind {
    /// Whether the call carries the mint price as payment
    pub fn is_payable(self) -> bool {
        matches!(self, ActionKind::PresaleMint | ActionKind::PublicMint)
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::StartPresale => "start presale",
            ActionKind::PresaleMint => "presale mint",
            ActionKind::PublicMint => "public mint",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The single in-flight mutating call of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAction {
    /// Monotonic per-client identifier, used to release the right slot
    pub id: u64,
    pub kind: ActionKind,
    /// Set once the wallet has broadcast the transaction
    pub tx_hash: Option<B256>,
    pub started_at: Instant,
}

/// Terminal outcome of a pending action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Confirmed { tx_hash: B256, block_number: Option<u64> },
    Reverted { tx_hash: Option<B256>, reason: String },
    WalletRejected { reason: String },
    TimedOut { tx_hash: B256 },
}

impl Settlement {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Settlement::Confirmed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payable_kinds() {
        assert!(!ActionKind::StartPresale.is_payable());
        assert!(ActionKind::PresaleMint.is_payable());
        assert!(ActionKind::PublicMint.is_payable());
    }

    #[test]
    fn test_settlement_confirmed() {
        let confirmed = Settlement::Confirmed {
            tx_hash: B256::ZERO,
            block_number: Some(1),
        };
        assert!(confirmed.is_confirmed());
        assert!(!Settlement::WalletRejected {
            reason: "denied".into()
        }
        .is_confirmed());
    }
}
