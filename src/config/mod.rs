//! Configuration for the Flow agent

pub mod access;

use crate::transaction::{PollPolicy, DEFAULT_GAS_LIMIT, MAX_GAS_LIMIT};
use crate::types::Address;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub use access::{AccessNodeConfig, AccessNodeSource, ACCESS_NODE_ENV};

/// Account address env var
pub const ADDRESS_ENV: &str = "FLOW_ADDRESS";

/// Account key index env var
pub const KEY_INDEX_ENV: &str = "FLOW_KEY_INDEX";

/// Profile contract address env var
pub const PROFILE_CONTRACT_ENV: &str = "FLOW_PROFILE_SMART_CONTRACT_ADDRESS";

/// Alias under which the Profile contract is imported
pub const PROFILE_ALIAS: &str = "0xProfile";

/// Supported Flow networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Emulator,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Emulator => "emulator",
        }
    }

    pub fn default_access_node(&self) -> &'static str {
        match self {
            Network::Mainnet => access::public_endpoints::MAINNET,
            Network::Testnet => access::public_endpoints::TESTNET,
            Network::Emulator => access::public_endpoints::EMULATOR,
        }
    }
}

/// The account this agent acts as
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account address; required for anything that signs
    #[serde(default)]
    pub address: Option<Address>,
    /// Index of the account key matching the loaded private key
    #[serde(default)]
    pub key_index: u32,
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network to talk to
    #[serde(default)]
    pub network: Network,
    /// Access node URL overriding the network default
    #[serde(default)]
    pub access_node: Option<String>,
    #[serde(default)]
    pub account: AccountConfig,
    /// Contract aliases (`0xProfile` -> address) resolved in imports
    #[serde(default)]
    pub contracts: HashMap<String, Address>,
    /// Compute limit for submitted transactions
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Seal tracking settings
    #[serde(default)]
    pub polling: PollPolicy,
    /// Path to audit log file; `null` disables audit logging
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: Option<String>,
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_audit_log_path() -> Option<String> {
    Some("audit.jsonl".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::default(),
            access_node: None,
            account: AccountConfig::default(),
            contracts: HashMap::new(),
            gas_limit: DEFAULT_GAS_LIMIT,
            polling: PollPolicy::default(),
            audit_log_path: default_audit_log_path(),
        }
    }
}

impl Config {
    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(address) = get(ADDRESS_ENV) {
            self.account.address = Some(
                address
                    .parse()
                    .map_err(|e| Error::Config(format!("{}: {}", ADDRESS_ENV, e)))?,
            );
        }
        if let Some(index) = get(KEY_INDEX_ENV) {
            self.account.key_index = index
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", KEY_INDEX_ENV, e)))?;
        }
        if let Some(address) = get(PROFILE_CONTRACT_ENV) {
            let address = address
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", PROFILE_CONTRACT_ENV, e)))?;
            self.contracts.insert(PROFILE_ALIAS.to_string(), address);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.gas_limit == 0 || self.gas_limit > MAX_GAS_LIMIT {
            return Err(Error::Config(format!(
                "gas_limit {} outside 1..={}",
                self.gas_limit, MAX_GAS_LIMIT
            )));
        }
        if self.polling.interval.is_zero() {
            return Err(Error::Config("polling.interval must be positive".to_string()));
        }
        if self.polling.timeout.is_zero() {
            return Err(Error::Config("polling.timeout must be positive".to_string()));
        }
        if let Some(alias) = self.contracts.keys().find(|k| !k.starts_with("0x")) {
            return Err(Error::Config(format!(
                "Contract alias {} must start with 0x",
                alias
            )));
        }
        Ok(())
    }

    /// Configured account address, required for signing
    pub fn account_address(&self) -> Result<Address> {
        self.account.address.ok_or_else(|| {
            Error::Config(format!(
                "No account address configured (set account.address or {})",
                ADDRESS_ENV
            ))
        })
    }

    pub fn access_node(&self) -> AccessNodeConfig {
        AccessNodeConfig::resolve(self.network, self.access_node.as_deref())
    }
}
