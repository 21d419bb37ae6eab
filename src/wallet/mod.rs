//! Secure key management
//!
//! This module holds the account's private signing key and produces
//! signatures over canonical preimages.
//! The private key NEVER leaves this module and is NEVER handed to tools.

mod signature;
mod signer;

pub use signature::{Signature, SIGNATURE_COMPONENT_LENGTH};
pub use signer::{
    verify_signature, KeyStore, HASH_ALGORITHM, PRIVATE_KEY_ENV_VAR, SIGNATURE_ALGORITHM,
};
