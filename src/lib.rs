//! Flow Agent Signer
//!
//! Signs, submits and tracks Flow blockchain transactions on behalf of an
//! automated agent:
//! - Canonical payload/envelope encoding and SHA3-256 hashing
//! - Per-role (proposer/payer/authorizer) authorizations backed by one key
//! - Submission through the Access Node REST API
//! - Cancellable polling to a sealed, expired or errored state
//!
//! # Security Model
//!
//! - The private key lives only in `wallet::KeyStore`
//! - Tools reach the key only through signing calls
//! - All tool calls pass through the interceptor pipeline
//! - Full audit trail of tool invocations

pub mod access;
pub mod config;
pub mod context;
pub mod interceptors;
pub mod tools;
pub mod transaction;
pub mod types;
pub mod wallet;

mod error;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use context::{ClientContext, MutationRequest};
pub use error::{Error, Result};
pub use types::{Address, Identifier, TransactionId};
