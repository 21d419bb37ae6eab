//! Flow Access Node collaborator
//!
//! `FlowAccess` is everything the transaction core needs from the network.
//! `RestAccessClient` implements it against the Access Node REST API; tests
//! use an in-memory mock that verifies signatures the way the network does.

#[cfg(test)]
pub(crate) mod mock;
mod rest;

pub use rest::RestAccessClient;

use crate::transaction::SignedTransaction;
use crate::types::{Address, Identifier, TransactionId};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header of a sealed block, used as the transaction's reference block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub id: Identifier,
    pub height: u64,
    pub timestamp: Option<String>,
}

/// A public key registered on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountKey {
    pub index: u32,
    /// 128 hex chars, no `0x`
    pub public_key: String,
    pub signing_algorithm: String,
    pub hashing_algorithm: String,
    pub sequence_number: u64,
    pub weight: u32,
    pub revoked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub address: Address,
    /// Balance in the smallest unit (10^-8 FLOW)
    pub balance: u64,
    pub keys: Vec<AccountKey>,
}

impl AccountInfo {
    pub fn key(&self, index: u32) -> Option<&AccountKey> {
        self.keys.iter().find(|k| k.index == index)
    }

    /// Balance rendered as a FLOW decimal, e.g. `100.00100000`
    pub fn balance_flow(&self) -> String {
        format!("{}.{:08}", self.balance / 100_000_000, self.balance % 100_000_000)
    }
}

/// Transaction status as reported by the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkStatus {
    #[default]
    Unknown,
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl NetworkStatus {
    /// Parse the API's status names; anything unrecognised is `Unknown`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pending" => NetworkStatus::Pending,
            "finalized" => NetworkStatus::Finalized,
            "executed" => NetworkStatus::Executed,
            "sealed" => NetworkStatus::Sealed,
            "expired" => NetworkStatus::Expired,
            _ => NetworkStatus::Unknown,
        }
    }
}

/// An event emitted by a transaction, payload still JSON-Cadence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub event_type: String,
    pub transaction_index: u32,
    pub event_index: u32,
    pub payload: Value,
}

/// One observation of a transaction's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionStatus {
    pub status: NetworkStatus,
    pub status_code: u32,
    pub error_message: String,
    pub block_id: Option<Identifier>,
    pub computation_used: u64,
    pub events: Vec<RawEvent>,
}

#[async_trait]
pub trait FlowAccess: Send + Sync {
    /// Latest sealed block, used as the reference block for new transactions
    async fn latest_sealed_block(&self) -> Result<BlockHeader>;

    async fn get_account(&self, address: &Address) -> Result<AccountInfo>;

    /// Run a read-only script; returns the JSON-Cadence result
    async fn execute_script(&self, script: &str, arguments: &[Vec<u8>]) -> Result<Value>;

    /// Broadcast a signed transaction. Not idempotent.
    async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<TransactionId>;

    async fn get_transaction_result(&self, id: &TransactionId) -> Result<TransactionStatus>;
}
