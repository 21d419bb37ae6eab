//! Signing and submission
//!
//! Everything that can fail locally (validation, encoding, signing) runs
//! before the first network call. A transport failure during broadcast is
//! never retried here: the transaction may or may not have been accepted.

use crate::access::FlowAccess;
use crate::transaction::authz::{Authorization, Role};
use crate::transaction::cadence::{check_arguments, encode_arguments, prepare_parameter_count};
use crate::transaction::clock::Clock;
use crate::transaction::codec::{MessageCodec, SignaturePayload};
use crate::transaction::envelope::{
    ProposalKey, SignedEnvelope, SignedTransaction, TransactionPayload, TransactionSignature,
    MAX_GAS_LIMIT,
};
use crate::transaction::state::TransactionHandle;
use crate::{Error, Result};
use std::sync::Arc;

pub struct TransactionSubmitter {
    access: Arc<dyn FlowAccess>,
    clock: Arc<dyn Clock>,
}

impl TransactionSubmitter {
    pub fn new(access: Arc<dyn FlowAccess>, clock: Arc<dyn Clock>) -> Self {
        Self { access, clock }
    }

    /// Validate and sign an envelope without touching the network.
    ///
    /// Accounts other than the payer sign the payload once per key; the
    /// payer's keys then sign the envelope.
    pub fn sign(envelope: &SignedEnvelope) -> Result<SignedTransaction> {
        let (proposer, payer) = validate(envelope)?;

        let payload = TransactionPayload {
            script: envelope.script.clone(),
            arguments: encode_arguments(&envelope.arguments)?,
            reference_block_id: envelope.reference_block_id,
            gas_limit: envelope.gas_limit,
            proposal_key: ProposalKey {
                address: proposer.address(),
                key_index: proposer.key_index(),
                sequence_number: envelope.proposal_sequence_number,
            },
            payer: payer.address(),
            authorizers: envelope.authorizers.iter().map(Authorization::address).collect(),
        };

        let mut payload_signers: Vec<&Authorization> = Vec::new();
        let mut envelope_signers: Vec<&Authorization> = vec![payer];
        for authz in std::iter::once(proposer).chain(envelope.authorizers.iter()) {
            let signers = if authz.address() == payer.address() {
                &mut envelope_signers
            } else {
                &mut payload_signers
            };
            let already = signers
                .iter()
                .any(|s| s.address() == authz.address() && s.key_index() == authz.key_index());
            if !already {
                signers.push(authz);
            }
        }

        let payload_message = MessageCodec::canonicalize_payload(&payload);
        let payload_signatures = payload_signers
            .iter()
            .map(|authz| collect_signature(authz, &payload_message))
            .collect::<Result<Vec<_>>>()?;

        let envelope_message = MessageCodec::canonicalize_envelope(&payload, &payload_signatures)?;
        let envelope_signatures = envelope_signers
            .iter()
            .map(|authz| collect_signature(authz, &envelope_message))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            payload_signatures = payload_signatures.len(),
            envelope_signatures = envelope_signatures.len(),
            "Signed transaction"
        );

        Ok(SignedTransaction {
            payload,
            payload_signatures,
            envelope_signatures,
        })
    }

    /// Sign and broadcast. The returned handle starts in `PENDING`.
    pub async fn submit(&self, envelope: SignedEnvelope) -> Result<TransactionHandle> {
        let transaction = Self::sign(&envelope)?;

        let id = self.access.send_transaction(&transaction).await.map_err(|e| {
            tracing::warn!(error = %e, "Transaction submission failed");
            e
        })?;

        tracing::info!(
            tx_id = %id,
            proposer = %transaction.payload.proposal_key.address,
            sequence_number = transaction.payload.proposal_key.sequence_number,
            "Transaction submitted"
        );

        Ok(TransactionHandle::new(id, self.clock.now()))
    }
}

fn validate(envelope: &SignedEnvelope) -> Result<(&Authorization, &Authorization)> {
    let proposer = envelope
        .proposer
        .as_ref()
        .ok_or_else(|| Error::Validation("Transaction has no proposer".to_string()))?;
    let payer = envelope
        .payer
        .as_ref()
        .ok_or_else(|| Error::Validation("Transaction has no payer".to_string()))?;

    expect_role(proposer, Role::Proposer)?;
    expect_role(payer, Role::Payer)?;
    for authz in &envelope.authorizers {
        expect_role(authz, Role::Authorizer)?;
    }

    if envelope.gas_limit == 0 || envelope.gas_limit > MAX_GAS_LIMIT {
        return Err(Error::Validation(format!(
            "Gas limit {} outside 1..={}",
            envelope.gas_limit, MAX_GAS_LIMIT
        )));
    }

    check_arguments(&envelope.script, &envelope.arguments)?;

    let expected = prepare_parameter_count(&envelope.script).unwrap_or(0);
    if expected != envelope.authorizers.len() {
        return Err(Error::Validation(format!(
            "Script prepares {} account(s) but {} authorizer(s) were bound",
            expected,
            envelope.authorizers.len()
        )));
    }

    Ok((proposer, payer))
}

fn expect_role(authz: &Authorization, role: Role) -> Result<()> {
    if authz.role() != role {
        return Err(Error::Validation(format!(
            "Authorization for {} key {} is bound as {}, expected {}",
            authz.address(),
            authz.key_index(),
            authz.role(),
            role
        )));
    }
    Ok(())
}

fn collect_signature(
    authz: &Authorization,
    message: &SignaturePayload,
) -> Result<TransactionSignature> {
    let composite = authz.sign(message)?;
    if composite.address != authz.address() || composite.key_index != authz.key_index() {
        return Err(Error::Validation(format!(
            "{} signer bound to {} key {} returned a signature for {} key {}",
            authz.role(),
            authz.address(),
            authz.key_index(),
            composite.address,
            composite.key_index
        )));
    }
    Ok(TransactionSignature {
        address: composite.address,
        key_index: composite.key_index,
        signature: composite.parse_signature()?,
    })
}
