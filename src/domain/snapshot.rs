//! Contract snapshot and session models

use alloy::primitives::{Address, U256};

/// Point-in-time capture of the presale contract state
///
/// Snapshots are values: two reads returning the same data compare equal,
/// and a new read always replaces the stored snapshot as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub presale_started: bool,
    /// Derived from `presale_ends_at` at read time
    pub presale_ended: bool,
    /// Raw `presaleEnded()` timestamp (unix seconds)
    pub presale_ends_at: u64,
    /// `None` when the ownership read was skipped (presale already running)
    pub owner: Option<Address>,
    pub token_ids_minted: u64,
}

impl ContractSnapshot {
    /// Apply a lifecycle reading, keeping the minted counter
    pub fn with_lifecycle(self, reading: &LifecycleReading) -> Self {
        Self {
            presale_started: reading.presale_started,
            presale_ended: reading.presale_ended,
            presale_ends_at: reading.presale_ends_at.unwrap_or(self.presale_ends_at),
            owner: reading.owner.or(self.owner),
            token_ids_minted: self.token_ids_minted,
        }
    }

    /// Apply a mint-count reading, keeping the lifecycle fields
    pub fn with_token_ids(self, token_ids_minted: u64) -> Self {
        Self {
            token_ids_minted,
            ..self
        }
    }

    /// Split into the two independently polled field groups
    pub fn lifecycle(&self) -> LifecycleReading {
        LifecycleReading {
            presale_started: self.presale_started,
            presale_ended: self.presale_ended,
            presale_ends_at: Some(self.presale_ends_at),
            owner: self.owner,
        }
    }
}

/// Result of one presale-lifecycle poll
///
/// `owner` is only read while the presale has not started; `presale_ends_at`
/// only once it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleReading {
    pub presale_started: bool,
    pub presale_ended: bool,
    pub presale_ends_at: Option<u64>,
    pub owner: Option<Address>,
}

/// Connected wallet session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub wallet_connected: bool,
    pub is_owner: bool,
    pub address: Option<Address>,
}

impl Session {
    pub fn connected(address: Option<Address>) -> Self {
        Self {
            wallet_connected: true,
            is_owner: false,
            address,
        }
    }

    /// Recompute `is_owner` against a freshly read owner
    ///
    /// An absent owner leaves the flag untouched: ownership only matters
    /// before the presale starts.
    pub fn with_owner(self, owner: Option<Address>) -> Self {
        match owner {
            Some(owner) => Self {
                is_owner: is_same_address(self.address, owner),
                ..self
            },
            None => self,
        }
    }
}

/// Addresses compare by value, which is case-insensitive on the hex form
pub fn is_same_address(current: Option<Address>, owner: Address) -> bool {
    current.is_some_and(|address| address == owner)
}

/// Presale end check at seconds granularity
///
/// The contract stores the end as a timestamp; the presale has ended once
/// that moment lies strictly in the past.
pub fn has_ended(ends_at: u64, now: u64) -> bool {
    ends_at < now
}

/// Clamp a contract counter into `u64`
pub fn counter_to_u64(value: U256) -> u64 {
    value.try_into().unwrap_or(u64::MAX)
}

/// Current wall-clock time in unix seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
