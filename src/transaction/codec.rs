//! Canonical message encoding
//!
//! The network recomputes these bytes independently to verify every
//! signature, so the encoding must match it bit for bit:
//!
//! - payload: `RLP([script, arguments, reference_block_id, gas_limit,
//!   proposal_address, proposal_key_index, proposal_sequence_number, payer,
//!   authorizers])`
//! - envelope: `RLP([payload, payload_signatures])`
//! - signature: `RLP([signer_index, key_index, signature])`
//!
//! The signed preimage is the 32-byte domain tag followed by the canonical
//! bytes, hashed with SHA3-256.

use crate::transaction::envelope::{SignedTransaction, TransactionPayload, TransactionSignature};
use crate::types::TransactionId;
use crate::{Error, Result};
use alloy::hex;
use alloy::rlp::{BufMut, Encodable, Header};
use sha3::{Digest, Sha3_256};

const DOMAIN_TAG_LENGTH: usize = 32;

/// Domain separation prefix identifying what a signature is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainTag {
    /// Transaction payloads and envelopes
    Transaction,
    /// Arbitrary user messages
    User,
}

impl DomainTag {
    pub fn label(&self) -> &'static str {
        match self {
            DomainTag::Transaction => "FLOW-V0.0-transaction",
            DomainTag::User => "FLOW-V0.0-user",
        }
    }

    /// The label right-padded with zero bytes to 32 bytes
    pub fn bytes(&self) -> [u8; DOMAIN_TAG_LENGTH] {
        let mut out = [0u8; DOMAIN_TAG_LENGTH];
        let label = self.label().as_bytes();
        out[..label.len()].copy_from_slice(label);
        out
    }
}

/// Canonical bytes plus the domain tag they are signed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    domain_tag: DomainTag,
    canonical_bytes: Vec<u8>,
}

impl SignaturePayload {
    pub fn new(domain_tag: DomainTag, canonical_bytes: Vec<u8>) -> Self {
        Self {
            domain_tag,
            canonical_bytes,
        }
    }

    pub fn domain_tag(&self) -> DomainTag {
        self.domain_tag
    }

    pub fn canonical_bytes(&self) -> &[u8] {
        &self.canonical_bytes
    }

    /// The same canonical bytes under a different tag
    pub fn with_domain_tag(&self, domain_tag: DomainTag) -> Self {
        Self {
            domain_tag,
            canonical_bytes: self.canonical_bytes.clone(),
        }
    }

    /// Exact bytes that are hashed and signed
    pub fn preimage(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DOMAIN_TAG_LENGTH + self.canonical_bytes.len());
        out.extend_from_slice(&self.domain_tag.bytes());
        out.extend_from_slice(&self.canonical_bytes);
        out
    }

    pub fn digest(&self) -> [u8; 32] {
        MessageCodec::hash(&self.preimage())
    }
}

/// Minimal RLP tree covering the shapes Flow transactions use
enum RlpItem<'a> {
    Bytes(&'a [u8]),
    Uint(u64),
    List(Vec<RlpItem<'a>>),
}

impl RlpItem<'_> {
    fn payload_length(items: &[RlpItem<'_>]) -> usize {
        items.iter().map(|item| item.length()).sum()
    }

    fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        out
    }
}

impl Encodable for RlpItem<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            RlpItem::Bytes(bytes) => <[u8] as Encodable>::encode(bytes, out),
            RlpItem::Uint(value) => value.encode(out),
            RlpItem::List(items) => {
                Header {
                    list: true,
                    payload_length: Self::payload_length(items),
                }
                .encode(out);
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    fn length(&self) -> usize {
        match self {
            RlpItem::Bytes(bytes) => <[u8] as Encodable>::length(bytes),
            RlpItem::Uint(value) => value.length(),
            RlpItem::List(items) => {
                let payload_length = Self::payload_length(items);
                Header {
                    list: true,
                    payload_length,
                }
                .length()
                    + payload_length
            }
        }
    }
}

/// Canonicalization and hashing of everything that gets signed
pub struct MessageCodec;

impl MessageCodec {
    /// SHA3-256 of `preimage`
    pub fn hash(preimage: &[u8]) -> [u8; 32] {
        Sha3_256::digest(preimage).into()
    }

    /// SHA3-256 of hex-encoded bytes
    pub fn hash_hex(input: &str) -> Result<[u8; 32]> {
        let trimmed = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(trimmed)
            .map_err(|e| Error::Encoding(format!("Invalid hex message: {}", e)))?;
        Ok(Self::hash(&bytes))
    }

    /// Payload message, signed by the proposer and authorizers that are not
    /// the payer.
    pub fn canonicalize_payload(payload: &TransactionPayload) -> SignaturePayload {
        let canonical = payload_item(payload).to_vec();
        SignaturePayload::new(DomainTag::Transaction, canonical)
    }

    /// Envelope message, signed by the payer over the payload and all
    /// payload signatures.
    pub fn canonicalize_envelope(
        payload: &TransactionPayload,
        payload_signatures: &[TransactionSignature],
    ) -> Result<SignaturePayload> {
        let signatures = signature_items(payload, payload_signatures)?;
        let item = RlpItem::List(vec![
            payload_item(payload),
            RlpItem::List(signatures.iter().map(|s| s.item()).collect()),
        ]);
        Ok(SignaturePayload::new(DomainTag::Transaction, item.to_vec()))
    }

    /// A user message (raw bytes) under the user domain tag
    pub fn canonicalize_user_message(message: &[u8]) -> SignaturePayload {
        SignaturePayload::new(DomainTag::User, message.to_vec())
    }

    /// A hex-encoded user message under the user domain tag
    pub fn canonicalize_user_message_hex(message_hex: &str) -> Result<SignaturePayload> {
        let trimmed = message_hex.strip_prefix("0x").unwrap_or(message_hex);
        let bytes = hex::decode(trimmed)
            .map_err(|e| Error::Encoding(format!("Invalid hex message: {}", e)))?;
        Ok(Self::canonicalize_user_message(&bytes))
    }

    /// Id the network assigns: SHA3-256 of the full transaction encoding
    pub fn transaction_id(transaction: &SignedTransaction) -> Result<TransactionId> {
        let payload = &transaction.payload;
        let payload_signatures = signature_items(payload, &transaction.payload_signatures)?;
        let envelope_signatures = signature_items(payload, &transaction.envelope_signatures)?;
        let item = RlpItem::List(vec![
            payload_item(payload),
            RlpItem::List(payload_signatures.iter().map(|s| s.item()).collect()),
            RlpItem::List(envelope_signatures.iter().map(|s| s.item()).collect()),
        ]);
        Ok(TransactionId::new(Self::hash(&item.to_vec())))
    }
}

fn payload_item(payload: &TransactionPayload) -> RlpItem<'_> {
    RlpItem::List(vec![
        RlpItem::Bytes(payload.script.as_bytes()),
        RlpItem::List(
            payload
                .arguments
                .iter()
                .map(|a| RlpItem::Bytes(a.as_slice()))
                .collect(),
        ),
        RlpItem::Bytes(payload.reference_block_id.as_bytes()),
        RlpItem::Uint(payload.gas_limit),
        RlpItem::Bytes(payload.proposal_key.address.as_bytes()),
        RlpItem::Uint(u64::from(payload.proposal_key.key_index)),
        RlpItem::Uint(payload.proposal_key.sequence_number),
        RlpItem::Bytes(payload.payer.as_bytes()),
        RlpItem::List(
            payload
                .authorizers
                .iter()
                .map(|a| RlpItem::Bytes(a.as_bytes()))
                .collect(),
        ),
    ])
}

struct IndexedSignature {
    signer_index: u64,
    key_index: u64,
    bytes: [u8; 64],
}

impl IndexedSignature {
    fn item(&self) -> RlpItem<'_> {
        RlpItem::List(vec![
            RlpItem::Uint(self.signer_index),
            RlpItem::Uint(self.key_index),
            RlpItem::Bytes(&self.bytes),
        ])
    }
}

/// Resolve signer indexes and sort by (signer index, key index)
fn signature_items(
    payload: &TransactionPayload,
    signatures: &[TransactionSignature],
) -> Result<Vec<IndexedSignature>> {
    let mut indexed = signatures
        .iter()
        .map(|sig| {
            let signer_index = payload.signer_index(&sig.address).ok_or_else(|| {
                Error::Encoding(format!(
                    "Signature from {} which is not a signer of this transaction",
                    sig.address
                ))
            })?;
            Ok(IndexedSignature {
                signer_index: signer_index as u64,
                key_index: u64::from(sig.key_index),
                bytes: sig.signature.to_bytes(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|s| (s.signer_index, s.key_index));
    Ok(indexed)
}
