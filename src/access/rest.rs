//! Flow Access Node REST client
//!
//! Binary fields travel as base64, addresses and ids as bare hex, and
//! integers as decimal strings.

use super::{
    AccountInfo, AccountKey, BlockHeader, FlowAccess, NetworkStatus, RawEvent, TransactionStatus,
};
use crate::transaction::{SignedTransaction, TransactionSignature};
use crate::types::{Address, Identifier, TransactionId};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the `/v1` REST API of a Flow Access Node
#[derive(Debug, Clone)]
pub struct RestAccessClient {
    client: Client,
    base_url: Url,
}

impl RestAccessClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid access node URL {}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid endpoint path {}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &'static str, url: Url) -> Result<T> {
        tracing::debug!(%url, operation, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(operation, e))?;
        parse_response(operation, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        body: &B,
    ) -> Result<T> {
        tracing::debug!(%url, operation, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::network(operation, e))?;
        parse_response(operation, response).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_for_status(operation, status, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Encoding(format!("Unexpected {} response: {}", operation, e)))
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

async fn error_for_status(operation: &'static str, status: StatusCode, response: Response) -> Error {
    let message = response
        .json::<ApiError>()
        .await
        .map(|e| e.message)
        .unwrap_or_else(|_| status.to_string());

    // Results are not indexed until the collection is finalized
    let transient = status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || (operation == "get_transaction_result" && status == StatusCode::NOT_FOUND);

    if transient {
        Error::network(operation, format!("HTTP {}: {}", status.as_u16(), message))
    } else {
        Error::Rejected(format!("{} (HTTP {}): {}", operation, status.as_u16(), message))
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an unsigned integer: {}", n))),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("expected integer, got {}", other))),
    }
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| Error::Encoding(format!("Invalid base64 in {}: {}", field, e)))
}

fn narrow(field: &str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Encoding(format!("{} out of range: {}", field, value)))
}

#[derive(Deserialize)]
struct BlockResponse {
    header: BlockHeaderResponse,
}

#[derive(Deserialize)]
struct BlockHeaderResponse {
    id: String,
    #[serde(deserialize_with = "string_or_number")]
    height: u64,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
struct AccountResponse {
    address: String,
    #[serde(deserialize_with = "string_or_number")]
    balance: u64,
    #[serde(default)]
    keys: Vec<AccountKeyResponse>,
}

#[derive(Deserialize)]
struct AccountKeyResponse {
    #[serde(deserialize_with = "string_or_number")]
    index: u64,
    public_key: String,
    signing_algorithm: String,
    hashing_algorithm: String,
    #[serde(deserialize_with = "string_or_number")]
    sequence_number: u64,
    #[serde(deserialize_with = "string_or_number")]
    weight: u64,
    #[serde(default)]
    revoked: bool,
}

impl AccountKeyResponse {
    fn into_key(self) -> Result<AccountKey> {
        Ok(AccountKey {
            index: narrow("key index", self.index)?,
            public_key: self
                .public_key
                .strip_prefix("0x")
                .unwrap_or(&self.public_key)
                .to_ascii_lowercase(),
            signing_algorithm: self.signing_algorithm,
            hashing_algorithm: self.hashing_algorithm,
            sequence_number: self.sequence_number,
            weight: narrow("key weight", self.weight)?,
            revoked: self.revoked,
        })
    }
}

#[derive(Serialize)]
struct ScriptRequest {
    script: String,
    arguments: Vec<String>,
}

#[derive(Serialize)]
struct ProposalKeyBody {
    address: String,
    key_index: String,
    sequence_number: String,
}

#[derive(Serialize)]
struct SignatureBody {
    address: String,
    key_index: String,
    signature: String,
}

impl From<&TransactionSignature> for SignatureBody {
    fn from(sig: &TransactionSignature) -> Self {
        Self {
            address: sig.address.to_hex(),
            key_index: sig.key_index.to_string(),
            signature: BASE64.encode(sig.signature.to_bytes()),
        }
    }
}

#[derive(Serialize)]
struct TransactionBody {
    script: String,
    arguments: Vec<String>,
    reference_block_id: String,
    gas_limit: String,
    payer: String,
    proposal_key: ProposalKeyBody,
    authorizers: Vec<String>,
    payload_signatures: Vec<SignatureBody>,
    envelope_signatures: Vec<SignatureBody>,
}

impl From<&SignedTransaction> for TransactionBody {
    fn from(tx: &SignedTransaction) -> Self {
        let payload = &tx.payload;
        Self {
            script: BASE64.encode(payload.script.as_bytes()),
            arguments: payload.arguments.iter().map(|a| BASE64.encode(a)).collect(),
            reference_block_id: payload.reference_block_id.to_hex(),
            gas_limit: payload.gas_limit.to_string(),
            payer: payload.payer.to_hex(),
            proposal_key: ProposalKeyBody {
                address: payload.proposal_key.address.to_hex(),
                key_index: payload.proposal_key.key_index.to_string(),
                sequence_number: payload.proposal_key.sequence_number.to_string(),
            },
            authorizers: payload.authorizers.iter().map(Address::to_hex).collect(),
            payload_signatures: tx.payload_signatures.iter().map(SignatureBody::from).collect(),
            envelope_signatures: tx.envelope_signatures.iter().map(SignatureBody::from).collect(),
        }
    }
}

#[derive(Deserialize)]
struct TransactionIdResponse {
    id: String,
}

#[derive(Deserialize)]
struct TransactionResultResponse {
    #[serde(default)]
    block_id: String,
    status: String,
    #[serde(default, deserialize_with = "string_or_number")]
    status_code: u64,
    #[serde(default)]
    error_message: String,
    #[serde(default, deserialize_with = "string_or_number")]
    computation_used: u64,
    #[serde(default)]
    events: Vec<EventResponse>,
}

#[derive(Deserialize)]
struct EventResponse {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(deserialize_with = "string_or_number")]
    transaction_index: u64,
    #[serde(deserialize_with = "string_or_number")]
    event_index: u64,
    payload: String,
}

impl TransactionResultResponse {
    fn into_status(self) -> Result<TransactionStatus> {
        let block_id = if self.block_id.is_empty() || self.block_id.chars().all(|c| c == '0') {
            None
        } else {
            Some(self.block_id.parse::<Identifier>()?)
        };
        let events = self
            .events
            .into_iter()
            .map(|e| {
                let bytes = decode_base64("event payload", &e.payload)?;
                Ok(RawEvent {
                    event_type: e.event_type,
                    transaction_index: narrow("transaction index", e.transaction_index)?,
                    event_index: narrow("event index", e.event_index)?,
                    payload: serde_json::from_slice(&bytes)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TransactionStatus {
            status: NetworkStatus::parse(&self.status),
            status_code: narrow("status code", self.status_code)?,
            error_message: self.error_message,
            block_id,
            computation_used: self.computation_used,
            events,
        })
    }
}

#[async_trait]
impl FlowAccess for RestAccessClient {
    async fn latest_sealed_block(&self) -> Result<BlockHeader> {
        let mut url = self.endpoint("v1/blocks")?;
        url.query_pairs_mut().append_pair("height", "sealed");
        let blocks: Vec<BlockResponse> = self.get_json("latest_sealed_block", url).await?;
        let header = blocks
            .into_iter()
            .next()
            .ok_or_else(|| Error::Encoding("No sealed block returned".to_string()))?
            .header;
        Ok(BlockHeader {
            id: header.id.parse()?,
            height: header.height,
            timestamp: header.timestamp,
        })
    }

    async fn get_account(&self, address: &Address) -> Result<AccountInfo> {
        let mut url = self.endpoint(&format!("v1/accounts/{}", address.to_hex()))?;
        url.query_pairs_mut().append_pair("expand", "keys");
        let account: AccountResponse = self.get_json("get_account", url).await?;
        Ok(AccountInfo {
            address: account.address.parse()?,
            balance: account.balance,
            keys: account
                .keys
                .into_iter()
                .map(AccountKeyResponse::into_key)
                .collect::<Result<Vec<_>>>()?,
        })
    }

    async fn execute_script(&self, script: &str, arguments: &[Vec<u8>]) -> Result<Value> {
        let mut url = self.endpoint("v1/scripts")?;
        url.query_pairs_mut().append_pair("block_height", "sealed");
        let body = ScriptRequest {
            script: BASE64.encode(script.as_bytes()),
            arguments: arguments.iter().map(|a| BASE64.encode(a)).collect(),
        };
        let encoded: String = self.post_json("execute_script", url, &body).await?;
        let bytes = decode_base64("script result", encoded.trim_matches('"'))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<TransactionId> {
        let url = self.endpoint("v1/transactions")?;
        let body = TransactionBody::from(transaction);
        let response: TransactionIdResponse =
            self.post_json("send_transaction", url, &body).await?;
        response.id.parse()
    }

    async fn get_transaction_result(&self, id: &TransactionId) -> Result<TransactionStatus> {
        let url = self.endpoint(&format!("v1/transaction_results/{}", id.to_hex()))?;
        let response: TransactionResultResponse =
            self.get_json("get_transaction_result", url).await?;
        response.into_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{ProposalKey, TransactionPayload};
    use crate::wallet::Signature;
    use serde_json::json;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = RestAccessClient::new("https://rest-testnet.onflow.org/api").unwrap();
        assert_eq!(
            client.endpoint("v1/blocks").unwrap().as_str(),
            "https://rest-testnet.onflow.org/api/v1/blocks"
        );
        assert!(RestAccessClient::new("not a url").is_err());
    }

    #[test]
    fn transaction_body_uses_api_encodings() {
        let account: Address = "0xf8d6e0586b0a20c7".parse().unwrap();
        let tx = SignedTransaction {
            payload: TransactionPayload {
                script: "transaction {}".to_string(),
                arguments: vec![b"{}".to_vec()],
                reference_block_id: Identifier::new([0xab; 32]),
                gas_limit: 100,
                proposal_key: ProposalKey {
                    address: account,
                    key_index: 1,
                    sequence_number: 42,
                },
                payer: account,
                authorizers: vec![account],
            },
            payload_signatures: vec![],
            envelope_signatures: vec![TransactionSignature {
                address: account,
                key_index: 1,
                signature: Signature::from_bytes(&[1u8; 64]).unwrap(),
            }],
        };

        let body = serde_json::to_value(TransactionBody::from(&tx)).unwrap();
        assert_eq!(body["script"], BASE64.encode("transaction {}"));
        assert_eq!(body["gas_limit"], "100");
        assert_eq!(body["payer"], "f8d6e0586b0a20c7");
        assert_eq!(body["proposal_key"]["sequence_number"], "42");
        assert_eq!(body["reference_block_id"], "ab".repeat(32));
        assert_eq!(body["envelope_signatures"][0]["key_index"], "1");
        assert_eq!(
            body["envelope_signatures"][0]["signature"],
            BASE64.encode([1u8; 64])
        );
    }

    #[test]
    fn transaction_result_decoding() {
        let payload = BASE64.encode(r#"{"type":"Event","value":{"id":"A.1.Profile.Updated","fields":[]}}"#);
        let raw = json!({
            "block_id": "cd".repeat(32),
            "status": "Sealed",
            "status_code": 0,
            "error_message": "",
            "computation_used": "17",
            "events": [{
                "type": "A.1.Profile.Updated",
                "transaction_id": "ef".repeat(32),
                "transaction_index": "0",
                "event_index": "2",
                "payload": payload
            }]
        });
        let response: TransactionResultResponse = serde_json::from_value(raw).unwrap();
        let status = response.into_status().unwrap();
        assert_eq!(status.status, NetworkStatus::Sealed);
        assert_eq!(status.computation_used, 17);
        assert_eq!(status.events[0].event_index, 2);
        assert_eq!(status.events[0].payload["type"], "Event");
        assert!(status.block_id.is_some());
    }

    #[test]
    fn pending_result_has_no_block() {
        let raw = json!({
            "block_id": "",
            "status": "Pending",
            "status_code": 0,
            "error_message": "",
            "computation_used": "0",
            "events": []
        });
        let response: TransactionResultResponse = serde_json::from_value(raw).unwrap();
        let status = response.into_status().unwrap();
        assert_eq!(status.status, NetworkStatus::Pending);
        assert_eq!(status.block_id, None);
    }

    #[test]
    fn account_keys_are_normalized() {
        let raw = json!({
            "address": "f8d6e0586b0a20c7",
            "balance": "100001000",
            "keys": [{
                "index": "0",
                "public_key": "0xABCD",
                "signing_algorithm": "ECDSA_P256",
                "hashing_algorithm": "SHA3_256",
                "sequence_number": "5",
                "weight": "1000",
                "revoked": false
            }]
        });
        let account: AccountResponse = serde_json::from_value(raw).unwrap();
        let key = account.keys.into_iter().next().unwrap().into_key().unwrap();
        assert_eq!(key.public_key, "abcd");
        assert_eq!(key.sequence_number, 5);
        assert_eq!(key.weight, 1000);
    }
}
