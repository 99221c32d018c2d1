//! Ethereum infrastructure - wallet provider and contract bindings

pub mod contract;
mod provider;

pub use contract::{ContractRead, PresaleContract};
pub use provider::{
    classify_send_error, create_wallet, AlloyWallet, ProviderConfig, ReceiptStatus, WalletError,
    WalletProvider,
};
