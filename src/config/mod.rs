use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::Deserialize;

/// Crypto Devs collection deployed on Goerli
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0C48BE8Df0Fe85D6Dc94D1c6e1e7092d2D037A66";
pub const DEFAULT_CHAIN_ID: u64 = 5;
pub const DEFAULT_MINT_PRICE: &str = "0.01";
pub const DEFAULT_MAX_SUPPLY: u64 = 20;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_SETTLE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;

/// Env var holding an optional hex private key for local signing
pub const PRIVATE_KEY_ENV: &str = "PRESALE_PRIVATE_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractSection {
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    /// Mint price in ether, e.g. "0.01"
    pub mint_price: Option<String>,
    pub max_supply: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollingSection {
    pub interval_secs: Option<u64>,
    pub settle_timeout_secs: Option<u64>,
    pub receipt_poll_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub name: Option<String>,
    pub rpc: Option<String>,
    pub ws: Option<String>,
    pub ipc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub contract: ContractSection,

    #[serde(default)]
    pub polling: PollingSection,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Immutable runtime settings, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub contract_address: Address,
    pub expected_chain_id: u64,
    pub mint_price: U256,
    pub max_supply: u64,
    pub poll_interval: Duration,
    pub settle_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Config::default()
            .settings()
            .expect("built-in defaults are valid")
    }
}

impl Config {
    pub fn settings(&self) -> Result<Settings> {
        let address = self
            .contract
            .address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CONTRACT_ADDRESS);
        let contract_address: Address = address
            .parse()
            .with_context(|| format!("Invalid contract address: {address}"))?;

        let price = self
            .contract
            .mint_price
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_MINT_PRICE);
        let mint_price =
            parse_ether(price).with_context(|| format!("Invalid mint price: {price}"))?;

        let interval_secs = self
            .polling
            .interval_secs
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);

        Ok(Settings {
            contract_address,
            expected_chain_id: self.contract.chain_id.unwrap_or(DEFAULT_CHAIN_ID),
            mint_price,
            max_supply: self.contract.max_supply.unwrap_or(DEFAULT_MAX_SUPPLY),
            poll_interval: Duration::from_secs(interval_secs),
            settle_timeout: Duration::from_secs(
                self.polling
                    .settle_timeout_secs
                    .unwrap_or(DEFAULT_SETTLE_TIMEOUT_SECS),
            ),
            receipt_poll_interval: Duration::from_millis(
                self.polling
                    .receipt_poll_ms
                    .unwrap_or(DEFAULT_RECEIPT_POLL_MS)
                    .max(50),
            ),
        })
    }
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_from(&path).unwrap_or_default()
}

pub fn load_from(path: &std::path::Path) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str::<Config>(&content).with_context(|| format!("parse config {}", path.display()))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PRESALE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("presale-sync").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("presale-sync").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "presale-sync", "presale-sync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("presale-sync"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("presale-sync"));
    }
    directories::ProjectDirs::from("io", "presale-sync", "presale-sync")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("presale-sync.log"))
}

/// Shorten an address for status lines: 0x0C48..7A66
pub fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 10 {
        return value.to_string();
    }
    let start: String = value.chars().take(6).collect();
    let end: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    format!("{}..{}", start, end)
}
