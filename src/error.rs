//! Error types for the Flow agent signer

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No signing key loaded ({0})")]
    KeyUnavailable(String),

    #[error("Signing failed for {context}: {reason}")]
    SigningFailure { context: String, reason: String },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error during {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    #[error("Transaction rejected by the network: {0}")]
    Rejected(String),

    #[error("Polling transaction {tx_id} failed after {attempts} attempts: {message}")]
    Poll {
        tx_id: String,
        attempts: u32,
        message: String,
    },

    #[error("Transaction {tx_id} not sealed after {waited:?} (last state {last_state}, indeterminate: {indeterminate})")]
    Timeout {
        tx_id: String,
        waited: Duration,
        last_state: String,
        indeterminate: bool,
    },

    #[error("Transaction {tx_id} failed on-chain (status code {status_code}): {message}")]
    Execution {
        tx_id: String,
        status_code: u32,
        message: String,
    },

    #[error("Tracking of transaction {0} was cancelled")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a transport failure in `operation`.
    pub fn network(operation: &'static str, message: impl ToString) -> Self {
        Error::Network {
            operation,
            message: message.to_string(),
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    ///
    /// Submission is not idempotent: a retryable `Network` error from
    /// `submit` means the caller decides whether to resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Poll { .. })
    }

    /// Whether the on-chain fate of the transaction is unknown.
    pub fn is_indeterminate(&self) -> bool {
        match self {
            Error::Timeout { indeterminate, .. } => *indeterminate,
            Error::Poll { .. } | Error::Cancelled(_) => true,
            _ => false,
        }
    }

    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Error::KeyUnavailable(_) => "key_unavailable",
            Error::SigningFailure { .. } => "signing_failure",
            Error::Encoding(_) => "encoding",
            Error::Validation(_) => "validation",
            Error::Network { .. } => "network",
            Error::Rejected(_) => "rejected",
            Error::Poll { .. } => "poll",
            Error::Timeout { .. } => "timeout",
            Error::Execution { .. } => "execution",
            Error::Cancelled(_) => "cancelled",
            Error::Config(_) => "config",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reports_indeterminate_outcome() {
        let err = Error::Timeout {
            tx_id: "abc".to_string(),
            waited: Duration::from_secs(30),
            last_state: "PENDING".to_string(),
            indeterminate: true,
        };
        assert!(err.is_indeterminate());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("indeterminate: true"));
    }

    #[test]
    fn rejection_is_final() {
        let err = Error::Rejected("invalid signature".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_indeterminate());
        assert_eq!(err.kind(), "rejected");
    }

    #[test]
    fn network_errors_are_retryable() {
        let err = Error::network("send_transaction", "connection refused");
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Network error during send_transaction: connection refused"
        );
    }
}
