//! Presale sync: keeps a local view in step with an NFT presale contract
//! and drives its transaction lifecycle.

pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod sync;
