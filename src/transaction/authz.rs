//! Per-role authorizations
//!
//! An `Authorization` pairs an account/key/role binding with a `RoleSigner`
//! that produces signatures for it. The binder never touches the network and
//! one signer instance may serve every role of the same account key.

use crate::transaction::codec::SignaturePayload;
use crate::types::Address;
use crate::wallet::{KeyStore, Signature};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The part an account plays in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Proposer,
    Payer,
    Authorizer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Proposer => "proposer",
            Role::Payer => "payer",
            Role::Authorizer => "authorizer",
        })
    }
}

/// Which account key signs for which role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountRoleBinding {
    pub address: Address,
    pub key_index: u32,
    pub role: Role,
}

impl AccountRoleBinding {
    pub fn new(address: Address, key_index: u32, role: Role) -> Self {
        Self {
            address,
            key_index,
            role,
        }
    }
}

/// What a signing callback hands back: the signing identity and `r‖s` as hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeSignature {
    pub address: Address,
    pub key_index: u32,
    pub signature: String,
}

impl CompositeSignature {
    pub fn parse_signature(&self) -> Result<Signature> {
        Signature::from_hex(&self.signature)
    }
}

/// Produces a signature for a payload on behalf of one account key
pub trait RoleSigner: Send + Sync {
    fn produce_signature(&self, payload: &SignaturePayload) -> Result<CompositeSignature>;
}

/// Signs with the key held in a shared `KeyStore`
pub struct KeySigner {
    address: Address,
    key_index: u32,
    keys: Arc<KeyStore>,
}

impl KeySigner {
    pub fn new(address: Address, key_index: u32, keys: Arc<KeyStore>) -> Self {
        Self {
            address,
            key_index,
            keys,
        }
    }
}

impl RoleSigner for KeySigner {
    fn produce_signature(&self, payload: &SignaturePayload) -> Result<CompositeSignature> {
        let signature = self.keys.sign(&payload.preimage())?;
        Ok(CompositeSignature {
            address: self.address,
            key_index: self.key_index,
            signature: signature.to_hex(),
        })
    }
}

/// A binding plus the signer that fulfils it
#[derive(Clone)]
pub struct Authorization {
    binding: AccountRoleBinding,
    signer: Arc<dyn RoleSigner>,
}

impl Authorization {
    pub fn new(binding: AccountRoleBinding, signer: Arc<dyn RoleSigner>) -> Self {
        Self { binding, signer }
    }

    pub fn binding(&self) -> &AccountRoleBinding {
        &self.binding
    }

    pub fn address(&self) -> Address {
        self.binding.address
    }

    pub fn key_index(&self) -> u32 {
        self.binding.key_index
    }

    pub fn role(&self) -> Role {
        self.binding.role
    }

    /// Invoke the signer, attaching role and account to any failure
    pub fn sign(&self, payload: &SignaturePayload) -> Result<CompositeSignature> {
        self.signer
            .produce_signature(payload)
            .map_err(|e| match e {
                Error::KeyUnavailable(reason) => {
                    Error::KeyUnavailable(format!("{}: {}", self.context(), reason))
                }
                Error::SigningFailure { reason, .. } => Error::SigningFailure {
                    context: self.context(),
                    reason,
                },
                other => other,
            })
    }

    fn context(&self) -> String {
        format!(
            "{} {} key {}",
            self.binding.role, self.binding.address, self.binding.key_index
        )
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// Builds authorizations backed by one key store
pub struct AuthorizationBinder {
    keys: Arc<KeyStore>,
}

impl AuthorizationBinder {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    pub fn bind(&self, binding: AccountRoleBinding) -> Authorization {
        tracing::debug!(
            address = %binding.address,
            key_index = binding.key_index,
            role = %binding.role,
            "Bound authorization"
        );
        let signer: Arc<dyn RoleSigner> = Arc::new(KeySigner::new(
            binding.address,
            binding.key_index,
            Arc::clone(&self.keys),
        ));
        Authorization::new(binding, signer)
    }

    /// Proposer, payer and authorizer for one account key, sharing a signer
    pub fn bind_all(&self, address: Address, key_index: u32) -> [Authorization; 3] {
        let signer: Arc<dyn RoleSigner> =
            Arc::new(KeySigner::new(address, key_index, Arc::clone(&self.keys)));
        [Role::Proposer, Role::Payer, Role::Authorizer].map(|role| {
            Authorization::new(
                AccountRoleBinding::new(address, key_index, role),
                Arc::clone(&signer),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TEST_KEY, TEST_PUBLIC_KEY};
    use crate::transaction::MessageCodec;
    use crate::wallet::verify_signature;

    fn account() -> Address {
        "0xf8d6e0586b0a20c7".parse().unwrap()
    }

    #[test]
    fn bound_callback_signs_for_its_account() {
        let keys = Arc::new(KeyStore::from_hex(TEST_KEY).unwrap());
        let binder = AuthorizationBinder::new(keys);
        let authz = binder.bind(AccountRoleBinding::new(account(), 3, Role::Authorizer));

        let payload = MessageCodec::canonicalize_user_message(b"payload bytes");
        let composite = authz.sign(&payload).unwrap();

        assert_eq!(composite.address, account());
        assert_eq!(composite.key_index, 3);
        assert_eq!(composite.signature.len(), 128);

        let signature = composite.parse_signature().unwrap();
        assert!(verify_signature(TEST_PUBLIC_KEY, &payload.preimage(), &signature).unwrap());
    }

    #[test]
    fn bind_all_covers_every_role() {
        let keys = Arc::new(KeyStore::from_hex(TEST_KEY).unwrap());
        let [proposer, payer, authorizer] = AuthorizationBinder::new(keys).bind_all(account(), 0);
        assert_eq!(proposer.role(), Role::Proposer);
        assert_eq!(payer.role(), Role::Payer);
        assert_eq!(authorizer.role(), Role::Authorizer);

        let payload = MessageCodec::canonicalize_user_message(b"x");
        assert_eq!(
            proposer.sign(&payload).unwrap(),
            payer.sign(&payload).unwrap()
        );
    }

    #[test]
    fn missing_key_reports_role_and_account() {
        let binder = AuthorizationBinder::new(Arc::new(KeyStore::empty()));
        let authz = binder.bind(AccountRoleBinding::new(account(), 0, Role::Payer));
        let err = authz
            .sign(&MessageCodec::canonicalize_user_message(b"x"))
            .unwrap_err();
        match err {
            Error::KeyUnavailable(message) => {
                assert!(message.contains("payer"));
                assert!(message.contains("0xf8d6e0586b0a20c7"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
