//! Tool call interceptors
//!
//! Every tool invocation passes through the registered interceptors before
//! and after execution. Interceptors observe; they cannot alter arguments
//! or results.

mod audit_log;

pub use audit_log::AuditLogInterceptor;

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// What an interceptor sees about one tool call
#[derive(Debug, Clone)]
pub struct ToolCallContext {
    pub tool_name: String,
    /// Unique per invocation, ties start and completion together
    pub call_id: Uuid,
    pub args: Value,
}

impl ToolCallContext {
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            call_id: Uuid::new_v4(),
            args,
        }
    }
}

#[async_trait]
pub trait ToolInterceptor: Send + Sync {
    async fn on_tool_call_start(&self, context: &ToolCallContext);

    async fn on_tool_call_complete(
        &self,
        context: &ToolCallContext,
        result: &Result<Value>,
        duration_ms: u64,
    );
}
