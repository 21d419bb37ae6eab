//! User message signing tool.
//!
//! SECURITY NOTE:
//! - Signs only under the user domain tag, so a signature produced here can
//!   never authorize a transaction.
//! - Returns signatures and hashes, never raw key material.

use super::{FlowTool, TOOL_SIGN_USER_MESSAGE};
use crate::context::ClientContext;
use crate::transaction::MessageCodec;
use crate::types::Address;
use crate::Result;
use alloy::hex;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the message text is to be interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageEncoding {
    #[default]
    Utf8,
    Hex,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SignUserMessageInput {
    pub message: String,
    #[serde(default)]
    pub encoding: MessageEncoding,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSignature {
    pub address: Option<Address>,
    pub key_index: u32,
    pub domain_tag: &'static str,
    /// SHA3-256 of domain tag and message, hex
    pub message_hash: String,
    /// `r‖s`, hex
    pub signature: String,
    pub public_key: String,
}

pub struct SignUserMessageTool {
    ctx: Arc<ClientContext>,
}

impl SignUserMessageTool {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FlowTool for SignUserMessageTool {
    type Input = SignUserMessageInput;
    type Output = UserSignature;

    fn name(&self) -> &'static str {
        TOOL_SIGN_USER_MESSAGE
    }

    fn description(&self) -> &'static str {
        "Sign an arbitrary message with the agent's account key under the Flow user domain tag."
    }

    async fn execute(&self, input: SignUserMessageInput) -> Result<UserSignature> {
        let payload = match input.encoding {
            MessageEncoding::Utf8 => MessageCodec::canonicalize_user_message(input.message.as_bytes()),
            MessageEncoding::Hex => MessageCodec::canonicalize_user_message_hex(&input.message)?,
        };

        let keys = self.ctx.keys();
        let signature = keys.sign(&payload.preimage())?;

        Ok(UserSignature {
            address: self.ctx.config().account.address,
            key_index: self.ctx.config().account.key_index,
            domain_tag: payload.domain_tag().label(),
            message_hash: hex::encode(payload.digest()),
            signature: signature.to_hex(),
            public_key: keys.public_key_hex()?.to_string(),
        })
    }
}
