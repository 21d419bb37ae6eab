//! Transaction envelopes
//!
//! `SignedEnvelope` is what callers assemble: script, typed arguments and one
//! bound authorization per role. The submitter turns it into a
//! `SignedTransaction`, the exact structure the network verifies.

use crate::transaction::authz::Authorization;
use crate::transaction::cadence::CadenceValue;
use crate::types::{Address, Identifier};
use crate::wallet::Signature;
use serde::Serialize;

/// Default compute limit when none is given
pub const DEFAULT_GAS_LIMIT: u64 = 100;

/// Upper bound on the compute limit accepted by the network
pub const MAX_GAS_LIMIT: u64 = 9999;

/// The key that proposes the transaction and the sequence number it consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

/// The signable part of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPayload {
    pub script: String,
    /// JSON-Cadence encoded arguments, in declaration order
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: Address,
    pub authorizers: Vec<Address>,
}

impl TransactionPayload {
    /// Ordered signer list: proposer, payer, then authorizers, each address
    /// once in first-seen order. A signature's signer index is its position
    /// here.
    pub fn signers(&self) -> Vec<Address> {
        let mut signers = Vec::with_capacity(2 + self.authorizers.len());
        let candidates = std::iter::once(self.proposal_key.address)
            .chain(std::iter::once(self.payer))
            .chain(self.authorizers.iter().copied());
        for address in candidates {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    pub fn signer_index(&self, address: &Address) -> Option<usize> {
        self.signers().iter().position(|a| a == address)
    }
}

/// One signature attached to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    pub key_index: u32,
    pub signature: Signature,
}

/// A fully signed transaction, ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub payload: TransactionPayload,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

/// An unsigned transaction with one bound authorization per role
///
/// Built once and submitted once; the submitter consumes it.
pub struct SignedEnvelope {
    pub script: String,
    pub arguments: Vec<CadenceValue>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub proposer: Option<Authorization>,
    pub proposal_sequence_number: u64,
    pub payer: Option<Authorization>,
    pub authorizers: Vec<Authorization>,
}

impl SignedEnvelope {
    pub fn builder(script: impl Into<String>) -> SignedEnvelopeBuilder {
        SignedEnvelopeBuilder {
            envelope: SignedEnvelope {
                script: script.into(),
                arguments: Vec::new(),
                reference_block_id: Identifier::new([0u8; 32]),
                gas_limit: DEFAULT_GAS_LIMIT,
                proposer: None,
                proposal_sequence_number: 0,
                payer: None,
                authorizers: Vec::new(),
            },
        }
    }
}

pub struct SignedEnvelopeBuilder {
    envelope: SignedEnvelope,
}

impl SignedEnvelopeBuilder {
    pub fn argument(mut self, value: CadenceValue) -> Self {
        self.envelope.arguments.push(value);
        self
    }

    pub fn arguments(mut self, values: impl IntoIterator<Item = CadenceValue>) -> Self {
        self.envelope.arguments.extend(values);
        self
    }

    pub fn reference_block(mut self, block_id: Identifier) -> Self {
        self.envelope.reference_block_id = block_id;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.envelope.gas_limit = gas_limit;
        self
    }

    /// Set the proposer and the sequence number of its proposal key
    pub fn proposer(mut self, authorization: Authorization, sequence_number: u64) -> Self {
        self.envelope.proposer = Some(authorization);
        self.envelope.proposal_sequence_number = sequence_number;
        self
    }

    pub fn payer(mut self, authorization: Authorization) -> Self {
        self.envelope.payer = Some(authorization);
        self
    }

    pub fn authorizer(mut self, authorization: Authorization) -> Self {
        self.envelope.authorizers.push(authorization);
        self
    }

    pub fn build(self) -> SignedEnvelope {
        self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn signer_list_dedups_in_role_order() {
        let payload = TransactionPayload {
            script: String::new(),
            arguments: vec![],
            reference_block_id: Identifier::new([0; 32]),
            gas_limit: 100,
            proposal_key: ProposalKey {
                address: addr("0x01"),
                key_index: 0,
                sequence_number: 0,
            },
            payer: addr("0x02"),
            authorizers: vec![addr("0x03"), addr("0x01"), addr("0x02")],
        };

        assert_eq!(
            payload.signers(),
            vec![addr("0x01"), addr("0x02"), addr("0x03")]
        );
        assert_eq!(payload.signer_index(&addr("0x03")), Some(2));
        assert_eq!(payload.signer_index(&addr("0x04")), None);
    }

    #[test]
    fn single_account_has_single_signer() {
        let a = addr("0xf8d6e0586b0a20c7");
        let payload = TransactionPayload {
            script: String::new(),
            arguments: vec![],
            reference_block_id: Identifier::new([0; 32]),
            gas_limit: 100,
            proposal_key: ProposalKey {
                address: a,
                key_index: 0,
                sequence_number: 4,
            },
            payer: a,
            authorizers: vec![a],
        };
        assert_eq!(payload.signers(), vec![a]);
    }
}
