//! In-memory `FlowAccess` for tests
//!
//! Verifies every signature against registered account keys the way the
//! network does, then serves scripted transaction statuses.

use super::{
    AccountInfo, AccountKey, BlockHeader, FlowAccess, NetworkStatus, TransactionStatus,
};
use crate::testing::{account, TEST_PUBLIC_KEY};
use crate::transaction::{MessageCodec, SignedTransaction, TransactionSignature};
use crate::types::{Address, Identifier, TransactionId};
use crate::wallet::{verify_signature, HASH_ALGORITHM, SIGNATURE_ALGORITHM};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub struct MockAccess {
    accounts: Mutex<HashMap<Address, AccountInfo>>,
    sent: Mutex<Vec<SignedTransaction>>,
    send_failures: Mutex<VecDeque<Error>>,
    statuses: Mutex<VecDeque<Result<TransactionStatus>>>,
    last_status: Mutex<Option<TransactionStatus>>,
    script_results: Mutex<VecDeque<Result<Value>>>,
    scripts: Mutex<Vec<(String, Vec<Vec<u8>>)>>,
    polls: Mutex<u32>,
}

impl MockAccess {
    /// A network that knows the test account with the test key at index 0
    pub fn new() -> Self {
        let mock = Self {
            accounts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            send_failures: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            script_results: Mutex::new(VecDeque::new()),
            scripts: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
        };
        mock.add_account(account(), 0, TEST_PUBLIC_KEY);
        mock
    }

    pub fn add_account(&self, address: Address, key_index: u32, public_key: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        let info = accounts.entry(address).or_insert_with(|| AccountInfo {
            address,
            balance: 100_000_000_000,
            keys: vec![],
        });
        info.keys.push(AccountKey {
            index: key_index,
            public_key: public_key.to_string(),
            signing_algorithm: SIGNATURE_ALGORITHM.to_string(),
            hashing_algorithm: HASH_ALGORITHM.to_string(),
            sequence_number: 0,
            weight: 1000,
            revoked: false,
        });
    }

    pub fn fail_next_send(&self, error: Error) {
        self.send_failures.lock().unwrap().push_back(error);
    }

    /// Statuses returned by successive polls. Once exhausted the last
    /// successful status repeats; with nothing scripted the transaction is
    /// sealed immediately.
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = Result<TransactionStatus>>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    pub fn push_script_result(&self, result: Result<Value>) {
        self.script_results.lock().unwrap().push_back(result);
    }

    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn executed_scripts(&self) -> Vec<(String, Vec<Vec<u8>>)> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> u32 {
        *self.polls.lock().unwrap()
    }

    fn verify(&self, signature: &TransactionSignature, preimage: &[u8]) -> Result<()> {
        let accounts = self.accounts.lock().unwrap();
        let key = accounts
            .get(&signature.address)
            .and_then(|info| info.key(signature.key_index))
            .ok_or_else(|| {
                Error::Rejected(format!(
                    "unknown key {} on account {}",
                    signature.key_index, signature.address
                ))
            })?;
        if !verify_signature(&key.public_key, preimage, &signature.signature)? {
            return Err(Error::Rejected(format!(
                "invalid signature: signature could not be verified using public key {} of account {}",
                signature.key_index, signature.address
            )));
        }
        Ok(())
    }
}

pub fn status(status: NetworkStatus) -> TransactionStatus {
    TransactionStatus {
        status,
        ..TransactionStatus::default()
    }
}

pub fn sealed_with_event(event_type: &str, fields: Value) -> TransactionStatus {
    TransactionStatus {
        status: NetworkStatus::Sealed,
        block_id: Some(Identifier::new([0x33; 32])),
        computation_used: 42,
        events: vec![super::RawEvent {
            event_type: event_type.to_string(),
            transaction_index: 0,
            event_index: 0,
            payload: json!({"type": "Event", "value": {"id": event_type, "fields": fields}}),
        }],
        ..TransactionStatus::default()
    }
}

#[async_trait]
impl FlowAccess for MockAccess {
    async fn latest_sealed_block(&self) -> Result<BlockHeader> {
        Ok(BlockHeader {
            id: Identifier::new([0x44; 32]),
            height: 1000,
            timestamp: None,
        })
    }

    async fn get_account(&self, address: &Address) -> Result<AccountInfo> {
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| Error::Rejected(format!("account {} not found", address)))
    }

    async fn execute_script(&self, script: &str, arguments: &[Vec<u8>]) -> Result<Value> {
        self.scripts
            .lock()
            .unwrap()
            .push((script.to_string(), arguments.to_vec()));
        self.script_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(json!({"type": "Void"})))
    }

    async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<TransactionId> {
        if let Some(error) = self.send_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let payload = &transaction.payload;
        let payload_message = MessageCodec::canonicalize_payload(payload);
        for sig in &transaction.payload_signatures {
            self.verify(sig, &payload_message.preimage())?;
        }
        let envelope_message =
            MessageCodec::canonicalize_envelope(payload, &transaction.payload_signatures)?;
        for sig in &transaction.envelope_signatures {
            self.verify(sig, &envelope_message.preimage())?;
        }

        if let Some(key) = self
            .accounts
            .lock()
            .unwrap()
            .get_mut(&payload.proposal_key.address)
            .and_then(|info| {
                info.keys
                    .iter_mut()
                    .find(|k| k.index == payload.proposal_key.key_index)
            })
        {
            key.sequence_number += 1;
        }

        self.sent.lock().unwrap().push(transaction.clone());
        MessageCodec::transaction_id(transaction)
    }

    async fn get_transaction_result(&self, _id: &TransactionId) -> Result<TransactionStatus> {
        *self.polls.lock().unwrap() += 1;
        match self.statuses.lock().unwrap().pop_front() {
            Some(Ok(status)) => {
                *self.last_status.lock().unwrap() = Some(status.clone());
                Ok(status)
            }
            Some(Err(error)) => Err(error),
            None => Ok(self
                .last_status
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| status(NetworkStatus::Sealed))),
        }
    }
}
