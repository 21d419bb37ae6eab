//! Agent-facing tools
//!
//! Each tool parses a JSON input, runs one operation against the
//! `ClientContext` and serializes the output. The registry runs the
//! interceptors around every call and turns failures into an
//! `{"error": ...}` object instead of propagating them.
//!
//! SECURITY NOTE:
//! - Tools never receive key material, only the ability to sign through
//!   the context's key store.

mod account;
mod profile;
mod wallet_signing;

pub use account::{AccountInput, AccountOutput, GetAccountTool};
pub use profile::{
    GetProfileTool, ProfileField, ProfileFieldInput, SetProfileFieldTool, CHECK_PROFILE_SCRIPT,
    READ_PROFILE_SCRIPT,
};
pub use wallet_signing::{MessageEncoding, SignUserMessageInput, SignUserMessageTool, UserSignature};

use crate::context::ClientContext;
use crate::interceptors::{ToolCallContext, ToolInterceptor};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

pub const TOOL_GET_ACCOUNT: &str = "flow/get_account";
pub const TOOL_GET_PROFILE: &str = "flow/get_profile";
pub const TOOL_SET_PROFILE_INFO: &str = "flow/set_profile_info";
pub const TOOL_SET_PROFILE_NAME: &str = "flow/set_profile_name";
pub const TOOL_SET_PROFILE_AVATAR: &str = "flow/set_profile_avatar";
pub const TOOL_SIGN_USER_MESSAGE: &str = "flow/sign_user_message";

/// A typed tool
#[async_trait]
pub trait FlowTool: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Input for tools that take no arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmptyArgs {}

/// Name, description and input schema of a registered tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[async_trait]
trait DynTool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn call(&self, input: Value) -> Result<Value>;
}

#[async_trait]
impl<T: FlowTool> DynTool for T {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name(),
            description: self.description(),
            input_schema: schemars::schema_for!(T::Input).into(),
        }
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let input: T::Input = serde_json::from_value(input).map_err(|e| {
            Error::InvalidArgument(format!("Invalid input for {}: {}", self.name(), e))
        })?;
        let output = self.execute(input).await?;
        Ok(serde_json::to_value(output)?)
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn DynTool>>,
    interceptors: Vec<Arc<dyn ToolInterceptor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every Flow tool bound to `ctx`
    pub fn with_flow_tools(ctx: Arc<ClientContext>) -> Self {
        let mut registry = Self::new();
        registry.register(GetAccountTool::new(Arc::clone(&ctx)));
        registry.register(GetProfileTool::new(Arc::clone(&ctx)));
        for field in [ProfileField::Info, ProfileField::Name, ProfileField::Avatar] {
            registry.register(SetProfileFieldTool::new(Arc::clone(&ctx), field));
        }
        registry.register(SignUserMessageTool::new(ctx));
        registry
    }

    pub fn register<T: FlowTool>(&mut self, tool: T) {
        let name = tool.name();
        if self.tools.insert(name, Arc::new(tool)).is_some() {
            tracing::warn!(tool = name, "Replaced previously registered tool");
        }
    }

    pub fn add_interceptor(&mut self, interceptor: Arc<dyn ToolInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    /// Run a tool on parsed input, with interceptors
    pub async fn invoke_value(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown tool: {}", name)))?;

        let context = ToolCallContext::new(name, input.clone());
        for interceptor in &self.interceptors {
            interceptor.on_tool_call_start(&context).await;
        }

        tracing::info!(tool = name, call_id = %context.call_id, "Tool call");
        let started = Instant::now();
        let result = tool.call(input).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(tool = name, duration_ms, "Tool call succeeded"),
            Err(e) => tracing::warn!(tool = name, duration_ms, error = %e, "Tool call failed"),
        }

        for interceptor in &self.interceptors {
            interceptor
                .on_tool_call_complete(&context, &result, duration_ms)
                .await;
        }
        result
    }

    /// Run a tool on raw JSON text and return JSON text.
    ///
    /// Never fails: errors come back as
    /// `{"error", "kind", "retryable", "indeterminate"}`. Empty input is
    /// treated as `{}`.
    pub async fn invoke(&self, name: &str, raw_input: &str) -> String {
        let parsed = if raw_input.trim().is_empty() {
            Ok(json!({}))
        } else {
            serde_json::from_str::<Value>(raw_input)
                .map_err(|e| Error::InvalidArgument(format!("Input is not valid JSON: {}", e)))
        };

        let output = match parsed {
            Ok(input) => self.invoke_value(name, input).await,
            Err(e) => Err(e),
        };

        match output {
            Ok(value) => value.to_string(),
            Err(e) => error_envelope(&e).to_string(),
        }
    }
}

pub fn error_envelope(error: &Error) -> Value {
    json!({
        "error": error.to_string(),
        "kind": error.kind(),
        "retryable": error.is_retryable(),
        "indeterminate": error.is_indeterminate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::AuditLogInterceptor;
    use tempfile::NamedTempFile;

    #[derive(Deserialize, JsonSchema)]
    struct EchoInput {
        text: String,
    }

    struct EchoTool;

    #[async_trait]
    impl FlowTool for EchoTool {
        type Input = EchoInput;
        type Output = Value;

        fn name(&self) -> &'static str {
            "test/echo"
        }

        fn description(&self) -> &'static str {
            "Echo the text back"
        }

        async fn execute(&self, input: EchoInput) -> Result<Value> {
            if input.text == "fail" {
                return Err(Error::network("echo", "unreachable"));
            }
            Ok(json!({ "echo": input.text }))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry
    }

    #[tokio::test]
    async fn invoke_returns_tool_output() {
        let out = registry().invoke("test/echo", r#"{"text":"hi"}"#).await;
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn failures_become_error_objects() {
        let registry = registry();

        let out: Value =
            serde_json::from_str(&registry.invoke("test/echo", r#"{"text":"fail"}"#).await).unwrap();
        assert_eq!(out["kind"], "network");
        assert_eq!(out["retryable"], true);
        assert!(out["error"].as_str().unwrap().contains("unreachable"));

        let out: Value = serde_json::from_str(&registry.invoke("test/echo", "{").await).unwrap();
        assert_eq!(out["kind"], "invalid_argument");

        let out: Value = serde_json::from_str(&registry.invoke("test/echo", "").await).unwrap();
        assert_eq!(out["kind"], "invalid_argument");

        let out: Value = serde_json::from_str(&registry.invoke("nope", "{}").await).unwrap();
        assert!(out["error"].as_str().unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn interceptors_see_every_call() {
        let log = NamedTempFile::new().unwrap();
        let mut registry = registry();
        registry.add_interceptor(Arc::new(AuditLogInterceptor::new(log.path())));

        registry.invoke("test/echo", r#"{"text":"hi"}"#).await;
        registry.invoke("test/echo", r#"{"text":"fail"}"#).await;

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains("\"status\":\"error\""));
    }

    #[test]
    fn descriptors_carry_input_schema() {
        let described = registry().describe();
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].name, "test/echo");
        assert!(described[0].input_schema["properties"]["text"].is_object());
    }
}
