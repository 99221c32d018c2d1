//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Alloy-based wallet provider and typed contract bindings
//! - Tokio runtime bridge between the terminal UI and the sync client

pub mod ethereum;
pub mod runtime;
