//! In-memory wallet standing in for a node with the presale contract deployed

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use anyhow::{anyhow, Result};
use tokio::sync::mpsc::UnboundedReceiver;

use presale_sync::config::Settings;
use presale_sync::core::{Notice, Notifier};
use presale_sync::domain::ActionKind;
use presale_sync::infrastructure::ethereum::contract::reply;
use presale_sync::infrastructure::ethereum::{
    ContractRead, PresaleContract, ReceiptStatus, WalletError, WalletProvider,
};
use presale_sync::sync::{StateReader, SyncClient};

pub const ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");
pub const OTHER: Address = address!("00000000000000000000000000000000000000bb");

/// Wall clock seen by the reader in every test
pub const NOW: u64 = 1_700_000_000;

pub fn fixed_now() -> u64 {
    NOW
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    Success,
    Reverted,
    Pending,
}

#[derive(Debug, Clone)]
pub struct SentTx {
    pub kind: Option<ActionKind>,
    pub from: Option<Address>,
    pub value: Option<U256>,
}

#[derive(Debug)]
struct Chain {
    chain_id: u64,
    account: Option<Address>,
    owner: Address,
    presale_started: bool,
    presale_ends_at: u64,
    token_ids: u64,
    failing: HashSet<ContractRead>,
    reject_next_send: Option<String>,
    receipts: ReceiptMode,
    connect_delay: Option<Duration>,
}

pub struct MockWallet {
    chain: Mutex<Chain>,
    calls: Mutex<HashMap<ContractRead, usize>>,
    sent: Mutex<Vec<SentTx>>,
    connects: AtomicU64,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            chain: Mutex::new(Chain {
                chain_id: Settings::default().expected_chain_id,
                account: Some(ACCOUNT),
                owner: OTHER,
                presale_started: false,
                presale_ends_at: 0,
                token_ids: 0,
                failing: HashSet::new(),
                reject_next_send: None,
                receipts: ReceiptMode::Success,
                connect_delay: None,
            }),
            calls: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            connects: AtomicU64::new(0),
        }
    }

    fn chain(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap()
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.chain().chain_id = chain_id;
        self
    }

    pub fn with_owner(self, owner: Address) -> Self {
        self.chain().owner = owner;
        self
    }

    /// Presale already started, ending at `ends_at`
    pub fn with_presale(self, ends_at: u64) -> Self {
        {
            let mut chain = self.chain();
            chain.presale_started = true;
            chain.presale_ends_at = ends_at;
        }
        self
    }

    pub fn with_token_ids(self, token_ids: u64) -> Self {
        self.chain().token_ids = token_ids;
        self
    }

    pub fn with_receipts(self, mode: ReceiptMode) -> Self {
        self.chain().receipts = mode;
        self
    }

    /// Wallet takes `delay` to answer a connect request
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        self.chain().connect_delay = Some(delay);
        self
    }

    pub fn set_receipts(&self, mode: ReceiptMode) {
        self.chain().receipts = mode;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain().chain_id = chain_id;
    }

    pub fn set_token_ids(&self, token_ids: u64) {
        self.chain().token_ids = token_ids;
    }

    pub fn set_presale_started(&self, started: bool) {
        self.chain().presale_started = started;
    }

    pub fn start_presale(&self, ends_at: u64) {
        let mut chain = self.chain();
        chain.presale_started = true;
        chain.presale_ends_at = ends_at;
    }

    pub fn fail(&self, read: ContractRead) {
        self.chain().failing.insert(read);
    }

    pub fn heal(&self, read: ContractRead) {
        self.chain().failing.remove(&read);
    }

    pub fn reject_next_send(&self, reason: &str) {
        self.chain().reject_next_send = Some(reason.to_string());
    }

    pub fn calls(&self, read: ContractRead) -> usize {
        self.calls.lock().unwrap().get(&read).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

fn action_of(input: &[u8]) -> Option<ActionKind> {
    let contract = PresaleContract::new(Address::ZERO);
    [
        ActionKind::StartPresale,
        ActionKind::PresaleMint,
        ActionKind::PublicMint,
    ]
    .into_iter()
    .find(|kind| {
        contract
            .action_request(*kind, Address::ZERO, U256::ZERO)
            .input
            .input()
            .is_some_and(|expected| expected.as_ref() == input)
    })
}

#[async_trait::async_trait]
impl WalletProvider for MockWallet {
    async fn connect(&self) -> Result<Option<Address>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let delay = self.chain().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.chain().account)
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain().chain_id)
    }

    fn signer_address(&self) -> Option<Address> {
        self.chain().account
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes> {
        let input = request.input.input().cloned().unwrap_or_default();
        let read = ContractRead::from_calldata(&input).ok_or_else(|| anyhow!("unknown selector"))?;
        *self.calls.lock().unwrap().entry(read).or_default() += 1;

        let chain = self.chain();
        if chain.failing.contains(&read) {
            return Err(anyhow!("{} unavailable", read.name()));
        }
        Ok(match read {
            ContractRead::Owner => reply::address(chain.owner),
            ContractRead::PresaleStarted => reply::boolean(chain.presale_started),
            ContractRead::PresaleEnded => reply::uint(U256::from(chain.presale_ends_at)),
            ContractRead::TokenIds => reply::uint(U256::from(chain.token_ids)),
        })
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, WalletError> {
        let kind = request
            .input
            .input()
            .and_then(|input| action_of(input.as_ref()));
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentTx {
            kind,
            from: request.from,
            value: request.value,
        });

        let mut chain = self.chain();
        if let Some(reason) = chain.reject_next_send.take() {
            return Err(WalletError::Rejected(reason));
        }
        if chain.receipts == ReceiptMode::Success {
            match kind {
                Some(ActionKind::StartPresale) => {
                    chain.presale_started = true;
                    chain.presale_ends_at = NOW + 300;
                }
                Some(ActionKind::PresaleMint | ActionKind::PublicMint) => chain.token_ids += 1,
                None => {}
            }
        }
        Ok(B256::with_last_byte(sent.len() as u8))
    }

    async fn receipt_status(&self, _hash: B256) -> Result<Option<ReceiptStatus>> {
        Ok(match self.chain().receipts {
            ReceiptMode::Success => Some(ReceiptStatus {
                success: true,
                block_number: Some(1),
            }),
            ReceiptMode::Reverted => Some(ReceiptStatus {
                success: false,
                block_number: Some(1),
            }),
            ReceiptMode::Pending => None,
        })
    }

    fn endpoint_name(&self) -> String {
        "mock".to_string()
    }
}

pub fn settings() -> Settings {
    Settings {
        poll_interval: Duration::from_secs(1),
        settle_timeout: Duration::from_secs(30),
        receipt_poll_interval: Duration::from_millis(100),
        ..Settings::default()
    }
}

pub fn reader(settings: &Settings) -> StateReader {
    StateReader::with_clock(PresaleContract::new(settings.contract_address), fixed_now)
}

pub fn client(wallet: &Arc<MockWallet>) -> (Arc<SyncClient>, UnboundedReceiver<Notice>) {
    let settings = settings();
    let (notifier, notices) = Notifier::channel();
    let wallet: Arc<dyn WalletProvider> = wallet.clone();
    let client = SyncClient::with_reader(wallet, reader(&settings), settings, notifier);
    (Arc::new(client), notices)
}

pub fn drain(notices: &mut UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        out.push(notice);
    }
    out
}
