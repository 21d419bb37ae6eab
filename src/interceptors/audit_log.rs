//! Audit log interceptor
//!
//! Appends one JSON line per tool call start and completion.

use super::{ToolCallContext, ToolInterceptor};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Longest serialized result kept in the log
const MAX_RESULT_CHARS: usize = 1000;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    call_id: Uuid,
    tool_name: String,
    args: Value,
    result: Option<Value>,
    error: Option<String>,
    error_kind: Option<&'static str>,
    duration_ms: u64,
    status: &'static str,
}

/// Interceptor that appends every tool call to a JSONL file
pub struct AuditLogInterceptor {
    path: PathBuf,
    /// Serializes appends so concurrent calls never interleave lines
    file_lock: Mutex<()>,
}

impl AuditLogInterceptor {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            path: log_path.into(),
            file_lock: Mutex::new(()),
        }
    }

    async fn append(&self, entry: AuditEntry) {
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize audit log entry");
                return;
            }
        };
        let _guard = self.file_lock.lock().await;
        if let Err(e) = append_line(&self.path, &line) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write audit log entry");
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

#[async_trait]
impl ToolInterceptor for AuditLogInterceptor {
    async fn on_tool_call_start(&self, context: &ToolCallContext) {
        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "tool_call_start",
            call_id: context.call_id,
            tool_name: context.tool_name.clone(),
            args: context.args.clone(),
            result: None,
            error: None,
            error_kind: None,
            duration_ms: 0,
            status: "pending",
        })
        .await;
    }

    async fn on_tool_call_complete(
        &self,
        context: &ToolCallContext,
        result: &Result<Value>,
        duration_ms: u64,
    ) {
        let (result_value, error, error_kind, status) = match result {
            Ok(v) => (Some(truncate_result(v)), None, None, "success"),
            Err(e) => (None, Some(e.to_string()), Some(e.kind()), "error"),
        };

        self.append(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "tool_call_complete",
            call_id: context.call_id,
            tool_name: context.tool_name.clone(),
            args: context.args.clone(),
            result: result_value,
            error,
            error_kind,
            duration_ms,
            status,
        })
        .await;
    }
}

/// Truncate result for logging
fn truncate_result(result: &Value) -> Value {
    let s = serde_json::to_string(result).unwrap_or_default();
    if s.chars().count() > MAX_RESULT_CHARS {
        let head: String = s.chars().take(MAX_RESULT_CHARS).collect();
        serde_json::json!(format!("{}... [truncated]", head))
    } else {
        result.clone()
    }
}
