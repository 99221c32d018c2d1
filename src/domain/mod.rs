//! Domain models for the presale sync client
//!
//! Everything here is pure data and pure functions, independent of the
//! wallet transport and the async runtime.

pub mod action;
pub mod error;
pub mod render;
pub mod snapshot;

pub use action::{ActionKind, PendingAction, Settlement};
pub use error::SyncError;
pub use render::{render, UiState};
pub use snapshot::{has_ended, unix_now, ContractSnapshot, LifecycleReading, Session};
