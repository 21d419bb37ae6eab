//! Key store implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - Keys are held in p256's SigningKey and never serialized
//! - Keys are never passed to tools
//! - Keys are never logged
//!
//! Signing uses RFC 6979 deterministic nonces, so the nonce is a function of
//! the key and the digest. Two different preimages never share a nonce and
//! concurrent callers share no mutable state.

use crate::transaction::MessageCodec;
use crate::wallet::Signature;
use crate::{Error, Result};
use alloy::hex;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding the account's hex-encoded private key
pub const PRIVATE_KEY_ENV_VAR: &str = "FLOW_PRIVATE_KEY";

/// Signature algorithm name as reported by Flow accounts
pub const SIGNATURE_ALGORITHM: &str = "ECDSA_P256";

/// Hash algorithm name as reported by Flow accounts
pub const HASH_ALGORITHM: &str = "SHA3_256";

struct LoadedKey {
    signing_key: SigningKey,
    /// Uncompressed public point without the `04` prefix (safe to expose)
    public_key_hex: String,
}

/// Holds at most one signing key and signs preimages with it
///
/// The private key is:
/// - Stored in p256's SigningKey
/// - Never serialized (no Serialize impl)
/// - Only accessible via signing operations
pub struct KeyStore {
    key: Option<LoadedKey>,
}

impl KeyStore {
    /// A key store with no key loaded; every signing call fails with
    /// `KeyUnavailable`.
    pub fn empty() -> Self {
        Self { key: None }
    }

    /// Create a key store from an environment variable
    ///
    /// # Arguments
    /// * `var_name` - Name of the environment variable containing the private key
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            Error::KeyUnavailable(format!(
                "environment variable {} not set, required for signing",
                var_name
            ))
        })?;

        Self::from_secret(&SecretString::from(key_hex))
    }

    /// Create a key store from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        Self::from_secret(&SecretString::from(key_hex.to_string()))
    }

    /// Create a key store from a hex-encoded private key held as a secret
    pub fn from_secret(key: &SecretString) -> Result<Self> {
        let raw = key.expose_secret().trim();
        let raw = raw.strip_prefix("0x").unwrap_or(raw);

        let bytes = hex::decode(raw)
            .map_err(|e| Error::Config(format!("Invalid private key encoding: {}", e)))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("Invalid P-256 private key: {}", e)))?;

        let point = signing_key.verifying_key().to_encoded_point(false);
        let public_key_hex = hex::encode(&point.as_bytes()[1..]);

        tracing::debug!(public_key = %public_key_hex, "Loaded signing key");

        Ok(Self {
            key: Some(LoadedKey {
                signing_key,
                public_key_hex,
            }),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.key.is_some()
    }

    /// Public key as 128 hex characters, the form stored on Flow accounts
    pub fn public_key_hex(&self) -> Result<&str> {
        Ok(&self.loaded()?.public_key_hex)
    }

    /// Hash `preimage` with SHA3-256 and sign the digest.
    ///
    /// This is the ONLY way to use the private key.
    pub fn sign(&self, preimage: &[u8]) -> Result<Signature> {
        let digest = MessageCodec::hash(preimage);
        self.sign_digest(&digest)
    }

    /// Sign an already computed 32-byte digest
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        let key = self.loaded()?;

        let signature: EcdsaSignature =
            key.signing_key
                .sign_prehash(digest)
                .map_err(|e| Error::SigningFailure {
                    context: "key store".to_string(),
                    reason: e.to_string(),
                })?;

        let (r, s) = signature.split_bytes();
        Signature::from_components(r.as_slice(), s.as_slice())
    }

    /// Verify a signature over `preimage` against this key's public key
    pub fn verify(&self, preimage: &[u8], signature: &Signature) -> Result<bool> {
        let key = self.loaded()?;
        Ok(verify_with(
            key.signing_key.verifying_key(),
            preimage,
            signature,
        ))
    }

    fn loaded(&self) -> Result<&LoadedKey> {
        self.key
            .as_ref()
            .ok_or_else(|| Error::KeyUnavailable("key store is empty".to_string()))
    }
}

/// Verify a signature against a Flow-encoded public key (128 hex chars).
pub fn verify_signature(public_key_hex: &str, preimage: &[u8], signature: &Signature) -> Result<bool> {
    let trimmed = public_key_hex.strip_prefix("0x").unwrap_or(public_key_hex);
    let mut sec1 = vec![0x04];
    sec1.extend(
        hex::decode(trimmed)
            .map_err(|e| Error::Encoding(format!("Invalid public key hex: {}", e)))?,
    );
    let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| Error::Encoding(format!("Invalid P-256 public key: {}", e)))?;
    Ok(verify_with(&verifying_key, preimage, signature))
}

fn verify_with(verifying_key: &VerifyingKey, preimage: &[u8], signature: &Signature) -> bool {
    let Ok(parsed) = EcdsaSignature::from_slice(&signature.to_bytes()) else {
        return false;
    };
    let digest = MessageCodec::hash(preimage);
    verifying_key.verify_prehash(&digest, &parsed).is_ok()
}

// Implement Debug manually to avoid exposing the key
impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field(
                "public_key",
                &self.key.as_ref().map(|k| k.public_key_hex.as_str()),
            )
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TEST_KEY, TEST_PUBLIC_KEY};
    use proptest::prelude::*;

    #[test]
    fn test_key_store_from_hex() {
        let keys = KeyStore::from_hex(TEST_KEY).unwrap();
        assert_eq!(keys.public_key_hex().unwrap(), TEST_PUBLIC_KEY);

        let prefixed = KeyStore::from_hex(&format!("0x{}", TEST_KEY)).unwrap();
        assert_eq!(prefixed.public_key_hex().unwrap(), TEST_PUBLIC_KEY);
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(KeyStore::from_hex("not-hex").is_err());
        // Zero is not a valid scalar
        assert!(KeyStore::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_empty_store_is_unavailable() {
        let keys = KeyStore::empty();
        assert!(!keys.is_loaded());
        assert!(matches!(keys.sign(b"msg"), Err(Error::KeyUnavailable(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let keys = KeyStore::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", keys);

        assert!(!debug_str.contains(TEST_KEY));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keys = KeyStore::from_hex(TEST_KEY).unwrap();
        let a = keys.sign(b"same message").unwrap();
        let b = keys.sign(b"same message").unwrap();
        let c = keys.sign(b"other message").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_verify_with_flow_public_key() {
        let keys = KeyStore::from_hex(TEST_KEY).unwrap();
        let sig = keys.sign(b"hello flow").unwrap();
        assert!(verify_signature(TEST_PUBLIC_KEY, b"hello flow", &sig).unwrap());
        assert!(!verify_signature(TEST_PUBLIC_KEY, b"hello flaw", &sig).unwrap());
    }

    #[test]
    fn test_from_env_missing_var() {
        let err = KeyStore::from_env("FLOW_AGENT_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, Error::KeyUnavailable(_)));
    }

    proptest! {
        #[test]
        fn signature_is_always_64_bytes(message in proptest::collection::vec(any::<u8>(), 0..512)) {
            let keys = KeyStore::from_hex(TEST_KEY).unwrap();
            let sig = keys.sign(&message).unwrap();
            prop_assert_eq!(sig.r().len(), 32);
            prop_assert_eq!(sig.s().len(), 32);
            prop_assert_eq!(sig.to_bytes().len(), 64);
            prop_assert_eq!(sig.to_hex().len(), 128);
        }

        #[test]
        fn altering_one_byte_breaks_verification(
            message in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
        ) {
            let keys = KeyStore::from_hex(TEST_KEY).unwrap();
            let sig = keys.sign(&message).unwrap();
            prop_assert!(keys.verify(&message, &sig).unwrap());

            let mut altered = message.clone();
            let i = index.index(altered.len());
            altered[i] ^= 0x01;
            prop_assert!(!keys.verify(&altered, &sig).unwrap());
        }
    }
}
