//! Account lookup tool (read-only)

use super::{FlowTool, TOOL_GET_ACCOUNT};
use crate::access::AccountInfo;
use crate::context::ClientContext;
use crate::types::Address;
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AccountInput {
    /// Account address (0x-prefixed hex). Defaults to the agent's account.
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountKeyOutput {
    pub index: u32,
    pub public_key: String,
    pub signing_algorithm: String,
    pub hashing_algorithm: String,
    pub sequence_number: u64,
    pub weight: u32,
    pub revoked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountOutput {
    pub address: Address,
    /// FLOW balance with 8 decimals
    pub balance: String,
    pub keys: Vec<AccountKeyOutput>,
}

impl From<AccountInfo> for AccountOutput {
    fn from(info: AccountInfo) -> Self {
        Self {
            balance: info.balance_flow(),
            address: info.address,
            keys: info
                .keys
                .into_iter()
                .map(|k| AccountKeyOutput {
                    index: k.index,
                    public_key: k.public_key,
                    signing_algorithm: k.signing_algorithm,
                    hashing_algorithm: k.hashing_algorithm,
                    sequence_number: k.sequence_number,
                    weight: k.weight,
                    revoked: k.revoked,
                })
                .collect(),
        }
    }
}

pub struct GetAccountTool {
    ctx: Arc<ClientContext>,
}

impl GetAccountTool {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FlowTool for GetAccountTool {
    type Input = AccountInput;
    type Output = AccountOutput;

    fn name(&self) -> &'static str {
        TOOL_GET_ACCOUNT
    }

    fn description(&self) -> &'static str {
        "Get a Flow account's balance and keys (read-only)."
    }

    async fn execute(&self, input: AccountInput) -> Result<AccountOutput> {
        let address = input
            .address
            .as_deref()
            .map(|a| {
                a.parse::<Address>()
                    .map_err(|e| Error::InvalidArgument(e.to_string()))
            })
            .transpose()?;
        Ok(self.ctx.account(address).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::mock::MockAccess;
    use crate::config::Config;
    use crate::testing::{account, keys, TEST_PUBLIC_KEY};

    fn tool() -> GetAccountTool {
        let mut config = Config::default();
        config.account.address = Some(account());
        let ctx = ClientContext::new(config, keys(), Arc::new(MockAccess::new()));
        GetAccountTool::new(Arc::new(ctx))
    }

    #[tokio::test]
    async fn defaults_to_configured_account() {
        let out = tool().execute(AccountInput::default()).await.unwrap();
        assert_eq!(out.address, account());
        assert_eq!(out.balance, "1000.00000000");
        assert_eq!(out.keys[0].public_key, TEST_PUBLIC_KEY);
    }

    #[tokio::test]
    async fn invalid_address_is_an_argument_error() {
        let err = tool()
            .execute(AccountInput {
                address: Some("0xnothex".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
