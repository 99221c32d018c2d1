//! Pure UI state machine

use super::action::{ActionKind, PendingAction};
use super::snapshot::{ContractSnapshot, Session};

/// Renderable states of the presale view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Disconnected,
    Busy,
    OwnerCanStartPresale,
    PresaleNotStarted,
    PresaleOpenForMint,
    PublicMintOpen,
}

impl UiState {
    /// The one action the view may offer in this state
    pub fn available_action(self) -> Option<ActionKind> {
        match self {
            UiState::OwnerCanStartPresale => Some(ActionKind::StartPresale),
            UiState::PresaleOpenForMint => Some(ActionKind::PresaleMint),
            UiState::PublicMintOpen => Some(ActionKind::PublicMint),
            UiState::Disconnected | UiState::Busy | UiState::PresaleNotStarted => None,
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            UiState::Disconnected => "Connect your wallet",
            UiState::Busy => "Loading...",
            UiState::OwnerCanStartPresale => "Start Presale",
            UiState::PresaleNotStarted => "Presale hasn't started yet",
            UiState::PresaleOpenForMint => {
                "Presale has started! If your address is whitelisted, mint a Crypto Dev"
            }
            UiState::PublicMintOpen => "Public Mint",
        }
    }
}

/// Derive the view state from current values
///
/// Rules are checked in order; the first match wins.
pub fn render(
    session: &Session,
    snapshot: &ContractSnapshot,
    pending: Option<&PendingAction>,
) -> UiState {
    if !session.wallet_connected {
        return UiState::Disconnected;
    }
    if pending.is_some() {
        return UiState::Busy;
    }
    if session.is_owner && !snapshot.presale_started {
        return UiState::OwnerCanStartPresale;
    }
    if !snapshot.presale_started {
        return UiState::PresaleNotStarted;
    }
    if !snapshot.presale_ended {
        UiState::PresaleOpenForMint
    } else {
        UiState::PublicMintOpen
    }
}
