//! Profile contract tools
//!
//! The Profile contract is imported through the `0xProfile` alias, so its
//! address must be configured (`contracts` or
//! `FLOW_PROFILE_SMART_CONTRACT_ADDRESS`).

use super::{
    EmptyArgs, FlowTool, TOOL_GET_PROFILE, TOOL_SET_PROFILE_AVATAR,
    TOOL_SET_PROFILE_INFO, TOOL_SET_PROFILE_NAME,
};
use crate::context::{ClientContext, MutationRequest};
use crate::transaction::{CadenceValue, TransactionResult};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const CHECK_PROFILE_SCRIPT: &str = r#"
import Profile from 0xProfile

pub fun main(address: Address): Bool {
  return Profile.check(address)
}
"#;

pub const READ_PROFILE_SCRIPT: &str = r#"
import Profile from 0xProfile

pub fun main(address: Address): Profile.ReadOnly? {
  return Profile.read(address)
}
"#;

const NO_PROFILE: &str = "No profile was found. Please initialise a profile first.";

pub struct GetProfileTool {
    ctx: Arc<ClientContext>,
}

impl GetProfileTool {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FlowTool for GetProfileTool {
    type Input = EmptyArgs;
    type Output = Value;

    fn name(&self) -> &'static str {
        TOOL_GET_PROFILE
    }

    fn description(&self) -> &'static str {
        "Get the profile info of the agent's Flow account."
    }

    async fn execute(&self, _input: EmptyArgs) -> Result<Value> {
        let address = CadenceValue::Address(self.ctx.config().account_address()?);

        let exists = self
            .ctx
            .query(CHECK_PROFILE_SCRIPT, std::slice::from_ref(&address))
            .await?;
        if exists != Value::Bool(true) {
            tracing::info!("Account has no profile");
            return Err(Error::Validation(NO_PROFILE.to_string()));
        }

        let profile = self.ctx.query(READ_PROFILE_SCRIPT, &[address]).await?;
        if profile.is_null() {
            return Err(Error::Validation(NO_PROFILE.to_string()));
        }
        Ok(serde_json::json!({ "profile": profile }))
    }
}

/// A settable profile field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Info,
    Name,
    Avatar,
}

impl ProfileField {
    fn tool_name(&self) -> &'static str {
        match self {
            ProfileField::Info => TOOL_SET_PROFILE_INFO,
            ProfileField::Name => TOOL_SET_PROFILE_NAME,
            ProfileField::Avatar => TOOL_SET_PROFILE_AVATAR,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ProfileField::Info => "Set the profile info of the agent's Flow profile. Waits until sealed.",
            ProfileField::Name => "Set the profile name of the agent's Flow profile. Waits until sealed.",
            ProfileField::Avatar => "Set the avatar URL of the agent's Flow profile. Waits until sealed.",
        }
    }

    /// Transaction calling the field's setter on the owner capability
    pub fn transaction(&self) -> String {
        let setter = match self {
            ProfileField::Info => "setInfo",
            ProfileField::Name => "setName",
            ProfileField::Avatar => "setAvatar",
        };
        format!(
            r#"
import Profile from 0xProfile

transaction(value: String) {{
  prepare(account: AuthAccount) {{
    account
      .borrow<&Profile.Base{{Profile.Owner}}>(from: Profile.privatePath)!
      .{}(value)
  }}
}}
"#,
            setter
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProfileFieldInput {
    /// The new value for the field
    #[serde(alias = "info", alias = "name", alias = "avatar")]
    pub value: String,
}

pub struct SetProfileFieldTool {
    ctx: Arc<ClientContext>,
    field: ProfileField,
}

impl SetProfileFieldTool {
    pub fn new(ctx: Arc<ClientContext>, field: ProfileField) -> Self {
        Self { ctx, field }
    }
}

#[async_trait]
impl FlowTool for SetProfileFieldTool {
    type Input = ProfileFieldInput;
    type Output = TransactionResult;

    fn name(&self) -> &'static str {
        self.field.tool_name()
    }

    fn description(&self) -> &'static str {
        self.field.description()
    }

    async fn execute(&self, input: ProfileFieldInput) -> Result<TransactionResult> {
        tracing::info!(field = ?self.field, "Updating profile");
        let request =
            MutationRequest::new(self.field.transaction()).argument(CadenceValue::string(input.value));
        self.ctx.mutate(request, &CancellationToken::new()).await
    }
}
