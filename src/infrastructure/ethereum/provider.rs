//! Wallet provider abstraction and Alloy implementation
//!
//! A [`WalletProvider`] plays the part of an injected browser wallet: it
//! hands out accounts on `connect`, reports the chain it is attached to, and
//! relays calls and transactions to a node.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::{RpcError, TransportError};
use anyhow::{Context, Result};
use thiserror::Error;
use tokio::sync::Mutex;

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// HTTP JSON-RPC endpoint
    Http(String),
    /// WebSocket endpoint
    WebSocket(String),
    /// IPC socket path (Unix only)
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl ProviderConfig {
    /// Get display name for this endpoint
    pub fn display(&self) -> String {
        match self {
            ProviderConfig::Http(url) => url.clone(),
            ProviderConfig::WebSocket(url) => url.clone(),
            #[cfg(unix)]
            ProviderConfig::Ipc(path) => path.display().to_string(),
        }
    }
}

/// Inclusion status of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptStatus {
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Why a transaction never made it on chain
#[derive(Debug, Error)]
pub enum WalletError {
    /// User or signer declined (EIP-1193 code 4001)
    #[error("{0}")]
    Rejected(String),
    /// Execution reverted during pre-flight (gas estimation)
    #[error("{0}")]
    Reverted(String),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// The wallet capability the sync client is built on
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Request account access; returns the selected account, if any
    ///
    /// Implementations only prompt once and return the cached account on
    /// later calls.
    async fn connect(&self) -> Result<Option<Address>>;

    /// Chain the provider is currently attached to
    async fn chain_id(&self) -> Result<u64>;

    /// Account able to sign, once connected
    fn signer_address(&self) -> Option<Address>;

    /// Execute a read-only call (eth_call)
    async fn call(&self, request: TransactionRequest) -> Result<Bytes>;

    /// Sign and broadcast a transaction; returns its hash
    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, WalletError>;

    /// Receipt status, `None` while the transaction is not yet included
    async fn receipt_status(&self, hash: B256) -> Result<Option<ReceiptStatus>>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

/// Alloy-backed wallet over any transport
///
/// Signs locally when a private key is supplied, otherwise relies on the
/// node's first unlocked account (anvil, hardhat).
pub struct AlloyWallet {
    provider: DynProvider<Ethereum>,
    local_signer: Option<Address>,
    connect_gate: Mutex<()>,
    account: RwLock<Option<Address>>,
    endpoint: String,
}

/// Create a wallet from configuration and an optional hex private key
pub async fn create_wallet(
    config: ProviderConfig,
    private_key: Option<&str>,
) -> Result<Arc<dyn WalletProvider>> {
    let signer = private_key
        .map(|key| {
            key.trim()
                .parse::<PrivateKeySigner>()
                .context("Invalid private key")
        })
        .transpose()?;
    let local_signer = signer.as_ref().map(|s| s.address());
    let endpoint = config.display();

    let provider = match (config, signer) {
        (ProviderConfig::Http(url), signer) => {
            let rpc_url = url.parse().context("Invalid HTTP URL")?;
            match signer {
                Some(signer) => ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(rpc_url)
                    .erased(),
                None => ProviderBuilder::new().connect_http(rpc_url).erased(),
            }
        }
        (ProviderConfig::WebSocket(url), signer) => match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect(&url)
                .await
                .context("Failed to create WebSocket provider")?
                .erased(),
            None => ProviderBuilder::new()
                .connect(&url)
                .await
                .context("Failed to create WebSocket provider")?
                .erased(),
        },
        #[cfg(unix)]
        (ProviderConfig::Ipc(path), signer) => {
            use alloy::providers::IpcConnect;
            let ipc = IpcConnect::new(path.to_string_lossy().to_string());
            match signer {
                Some(signer) => ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_ipc(ipc)
                    .await
                    .context("Failed to create IPC provider")?
                    .erased(),
                None => ProviderBuilder::new()
                    .connect_ipc(ipc)
                    .await
                    .context("Failed to create IPC provider")?
                    .erased(),
            }
        }
    };

    Ok(Arc::new(AlloyWallet {
        provider,
        local_signer,
        connect_gate: Mutex::new(()),
        account: RwLock::new(None),
        endpoint,
    }))
}

#[async_trait::async_trait]
impl WalletProvider for AlloyWallet {
    async fn connect(&self) -> Result<Option<Address>> {
        // Serialize concurrent connects so accounts are requested once
        let _gate = self.connect_gate.lock().await;
        if let Some(account) = self.signer_address() {
            return Ok(Some(account));
        }
        let selected = match self.local_signer {
            Some(address) => Some(address),
            None => self
                .provider
                .get_accounts()
                .await
                .context("Failed to request accounts")?
                .first()
                .copied(),
        };
        if let Ok(mut account) = self.account.write() {
            *account = selected;
        }
        Ok(selected)
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    fn signer_address(&self) -> Option<Address> {
        self.account.read().ok().and_then(|account| *account)
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes> {
        Ok(self.provider.call(request).await?)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, WalletError> {
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(classify_send_error)?;
        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, hash: B256) -> Result<Option<ReceiptStatus>> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| ReceiptStatus {
            success: r.status(),
            block_number: r.block_number,
        }))
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;
/// Geth/anvil execution-reverted error code
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Map a send failure onto rejection / revert / transport
pub fn classify_send_error(err: TransportError) -> WalletError {
    if let Some(payload) = err.as_error_resp() {
        return classify_error_payload(payload.code, &payload.message);
    }
    if let RpcError::LocalUsageError(inner) = &err {
        return WalletError::Rejected(inner.to_string());
    }
    WalletError::Transport(err.into())
}

fn classify_error_payload(code: i64, message: &str) -> WalletError {
    let lower = message.to_lowercase();
    if code == USER_REJECTED_CODE || lower.contains("user denied") || lower.contains("user rejected")
    {
        return WalletError::Rejected(message.to_string());
    }
    if code == EXECUTION_REVERTED_CODE || lower.contains("revert") {
        return WalletError::Reverted(message.to_string());
    }
    WalletError::Transport(anyhow::anyhow!("RPC error {code}: {message}"))
}
