//! Explicit process context
//!
//! Bundles config, key store, access client and clock so every operation
//! receives its collaborators as arguments.

use crate::access::{AccountInfo, AccountKey, FlowAccess, RestAccessClient};
use crate::config::Config;
use crate::transaction::cadence::{self, check_arguments, encode_arguments, resolve_imports};
use crate::transaction::{
    AuthorizationBinder, CadenceValue, Clock, SealTracker, SignedEnvelope, TokioClock,
    TransactionHandle, TransactionResult, TransactionSubmitter,
};
use crate::types::Address;
use crate::wallet::{KeyStore, HASH_ALGORITHM, PRIVATE_KEY_ENV_VAR, SIGNATURE_ALGORITHM};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A transaction to run as the configured account
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub script: String,
    pub arguments: Vec<CadenceValue>,
    /// Overrides the configured gas limit
    pub gas_limit: Option<u64>,
}

impl MutationRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            arguments: Vec::new(),
            gas_limit: None,
        }
    }

    pub fn argument(mut self, value: CadenceValue) -> Self {
        self.arguments.push(value);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

pub struct ClientContext {
    config: Config,
    keys: Arc<KeyStore>,
    access: Arc<dyn FlowAccess>,
    clock: Arc<dyn Clock>,
}

impl ClientContext {
    pub fn new(config: Config, keys: Arc<KeyStore>, access: Arc<dyn FlowAccess>) -> Self {
        Self {
            config,
            keys,
            access,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build from config: REST client for the resolved access node and the
    /// key from `FLOW_PRIVATE_KEY` if present.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let access_node = config.access_node();
        tracing::info!(
            network = config.network.name(),
            url = %access_node.url,
            source = ?access_node.source,
            "Using access node"
        );
        let access = RestAccessClient::new(&access_node.url)?;

        let keys = match KeyStore::from_env(PRIVATE_KEY_ENV_VAR) {
            Ok(keys) => keys,
            Err(Error::KeyUnavailable(reason)) => {
                tracing::warn!(%reason, "Running without a signing key, transactions will fail");
                KeyStore::empty()
            }
            Err(e) => return Err(e),
        };

        Ok(Self::new(config, Arc::new(keys), Arc::new(access)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    pub fn access(&self) -> &Arc<dyn FlowAccess> {
        &self.access
    }

    /// Run a read-only script and decode its result to plain JSON
    pub async fn query(&self, script: &str, arguments: &[CadenceValue]) -> Result<Value> {
        let script = resolve_imports(script, &self.config.contracts)?;
        check_arguments(&script, arguments)?;
        let encoded = encode_arguments(arguments)?;
        let raw = self.access.execute_script(&script, &encoded).await?;
        cadence::decode(&raw)
    }

    /// Look up an account; defaults to the configured one
    pub async fn account(&self, address: Option<Address>) -> Result<AccountInfo> {
        let address = match address {
            Some(address) => address,
            None => self.config.account_address()?,
        };
        self.access.get_account(&address).await
    }

    /// Sign and broadcast as the configured account in every role
    pub async fn submit(&self, request: MutationRequest) -> Result<TransactionHandle> {
        let address = self.config.account_address()?;
        let key_index = self.config.account.key_index;

        let account = self.access.get_account(&address).await?;
        let key = account.key(key_index).ok_or_else(|| {
            Error::Validation(format!("Account {} has no key {}", address, key_index))
        })?;
        self.check_account_key(key)?;

        let block = self.access.latest_sealed_block().await?;
        let script = resolve_imports(&request.script, &self.config.contracts)?;
        let needs_authorizer = cadence::prepare_parameter_count(&script).unwrap_or(0) > 0;

        let [proposer, payer, authorizer] =
            AuthorizationBinder::new(Arc::clone(&self.keys)).bind_all(address, key_index);
        let mut builder = SignedEnvelope::builder(script)
            .arguments(request.arguments)
            .reference_block(block.id)
            .gas_limit(request.gas_limit.unwrap_or(self.config.gas_limit))
            .proposer(proposer, key.sequence_number)
            .payer(payer);
        if needs_authorizer {
            builder = builder.authorizer(authorizer);
        }

        TransactionSubmitter::new(Arc::clone(&self.access), Arc::clone(&self.clock))
            .submit(builder.build())
            .await
    }

    /// Submit and wait for the transaction to seal
    pub async fn mutate(
        &self,
        request: MutationRequest,
        cancel: &CancellationToken,
    ) -> Result<TransactionResult> {
        let mut handle = self.submit(request).await?;
        self.tracker().track(&mut handle, cancel).await
    }

    pub fn tracker(&self) -> SealTracker {
        SealTracker::new(
            Arc::clone(&self.access),
            Arc::clone(&self.clock),
            self.config.polling,
        )
    }

    fn check_account_key(&self, key: &AccountKey) -> Result<()> {
        if key.revoked {
            return Err(Error::Validation(format!("Account key {} is revoked", key.index)));
        }
        if key.signing_algorithm != SIGNATURE_ALGORITHM || key.hashing_algorithm != HASH_ALGORITHM {
            return Err(Error::Validation(format!(
                "Account key {} uses {}/{}, only {}/{} is supported",
                key.index,
                key.signing_algorithm,
                key.hashing_algorithm,
                SIGNATURE_ALGORITHM,
                HASH_ALGORITHM
            )));
        }
        if self.keys.is_loaded() && self.keys.public_key_hex()? != key.public_key {
            return Err(Error::Validation(format!(
                "Loaded private key does not match account key {}",
                key.index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::mock::{status, MockAccess};
    use crate::access::NetworkStatus;
    use crate::config::PROFILE_ALIAS;
    use crate::testing::{account, keys, TEST_ACCOUNT};
    use crate::transaction::{ManualClock, TransactionState};
    use serde_json::json;

    const SET_NAME: &str = r#"
      import Profile from 0xProfile

      transaction(name: String) {
        prepare(account: AuthAccount) {
          account
            .borrow<&Profile.Base{Profile.Owner}>(from: Profile.privatePath)!
            .setName(name)
        }
      }
    "#;

    fn config() -> Config {
        let mut config = Config::default();
        config.account.address = Some(account());
        config
            .contracts
            .insert(PROFILE_ALIAS.to_string(), "0xba1132bc08f82fe2".parse().unwrap());
        config
    }

    fn context(access: Arc<MockAccess>) -> ClientContext {
        ClientContext::new(config(), keys(), access).with_clock(Arc::new(ManualClock::new()))
    }

    #[tokio::test]
    async fn query_resolves_aliases_and_decodes() {
        let access = Arc::new(MockAccess::new());
        access.push_script_result(Ok(json!({"type": "Bool", "value": true})));
        let ctx = context(access.clone());

        let script = "import Profile from 0xProfile\npub fun main(address: Address): Bool { return Profile.check(address) }";
        let result = ctx
            .query(script, &[CadenceValue::Address(account())])
            .await
            .unwrap();
        assert_eq!(result, json!(true));

        let (executed, arguments) = access.executed_scripts().remove(0);
        assert!(executed.contains("from 0xba1132bc08f82fe2"));
        assert_eq!(
            String::from_utf8(arguments[0].clone()).unwrap(),
            format!(r#"{{"type":"Address","value":"{}"}}"#, TEST_ACCOUNT)
        );
    }

    #[tokio::test]
    async fn query_with_wrong_arguments_is_not_sent() {
        let access = Arc::new(MockAccess::new());
        let ctx = context(access.clone());
        let err = ctx
            .query("pub fun main(a: Address): Bool { return true }", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(access.executed_scripts().is_empty());
    }

    #[tokio::test]
    async fn mutate_uses_account_sequence_number() {
        let access = Arc::new(MockAccess::new());
        access.script_statuses([
            Ok(status(NetworkStatus::Executed)),
            Ok(status(NetworkStatus::Sealed)),
        ]);
        let ctx = context(access.clone());

        let request = MutationRequest::new(SET_NAME).argument(CadenceValue::string("agent"));
        ctx.mutate(request.clone(), &CancellationToken::new())
            .await
            .unwrap();
        let handle = ctx.submit(request).await.unwrap();
        assert_eq!(handle.state(), TransactionState::Pending);

        let sent = access.sent();
        assert_eq!(sent[0].payload.proposal_key.sequence_number, 0);
        assert_eq!(sent[1].payload.proposal_key.sequence_number, 1);
        assert_eq!(sent[0].payload.reference_block_id, access.latest_sealed_block().await.unwrap().id);
        assert_eq!(sent[0].payload.gas_limit, ctx.config().gas_limit);
    }

    #[tokio::test]
    async fn unresolved_alias_fails_before_signing() {
        let access = Arc::new(MockAccess::new());
        let mut cfg = config();
        cfg.contracts.clear();
        let ctx = ClientContext::new(cfg, keys(), access.clone());

        let err = ctx
            .submit(MutationRequest::new(SET_NAME).argument(CadenceValue::string("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(access.sent_count(), 0);
    }

    #[tokio::test]
    async fn mismatched_key_is_rejected_locally() {
        let access = Arc::new(MockAccess::new());
        let other = Arc::new(KeyStore::from_hex(&"11".repeat(32)).unwrap());
        let ctx = ClientContext::new(config(), other, access.clone());

        let err = ctx
            .submit(MutationRequest::new(SET_NAME).argument(CadenceValue::string("x")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
        assert_eq!(access.sent_count(), 0);
    }

    #[tokio::test]
    async fn missing_account_is_a_config_error() {
        let access = Arc::new(MockAccess::new());
        let ctx = ClientContext::new(Config::default(), keys(), access);
        assert!(matches!(ctx.account(None).await, Err(Error::Config(_))));
    }
}
