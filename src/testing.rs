//! Shared test fixtures

use crate::transaction::AuthorizationBinder;
use crate::types::Address;
use crate::wallet::KeyStore;
use std::sync::Arc;

// Test private key (DO NOT use in production!)
pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

/// Public key of `TEST_KEY` in Flow account form
pub const TEST_PUBLIC_KEY: &str = "d8cd12ea5c67f2f8a00c1124893edcfa6754c4d6cede6be13bdf2295c810a97fa5a89d2d2a360c0ca9a4d6c7c9ed4b28d3e199d6627f2e696d689c310a5b0f48";

pub const TEST_ACCOUNT: &str = "0xf8d6e0586b0a20c7";

pub const PROFILE_SET_INFO: &str = r#"
import Profile from 0xba1132bc08f82fe2

transaction(info: String) {
  prepare(account: AuthAccount) {
    account
      .borrow<&Profile.Base{Profile.Owner}>(from: Profile.privatePath)!
      .setInfo(info)
  }
}
"#;

pub fn account() -> Address {
    TEST_ACCOUNT.parse().unwrap()
}

pub fn keys() -> Arc<KeyStore> {
    Arc::new(KeyStore::from_hex(TEST_KEY).unwrap())
}

pub fn binder() -> AuthorizationBinder {
    AuthorizationBinder::new(keys())
}
