//! Flow primitive identifiers
//!
//! Addresses are 8 bytes and rendered as `0x`-prefixed hex. Transaction and
//! block ids are 32-byte SHA3 digests rendered as bare hex, matching the
//! Access API.

use crate::{Error, Result};
use alloy::hex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a Flow account address in bytes
pub const ADDRESS_LENGTH: usize = 8;

/// A Flow account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Hex without the `0x` prefix, the form the REST API accepts
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses `0x`-prefixed or bare hex. Short addresses (e.g. `0x1`) are
    /// left-padded with zeros.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(Error::Encoding(format!("Invalid Flow address: {}", s)));
        }
        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let bytes = hex::decode(&padded)
            .map_err(|e| Error::Encoding(format!("Invalid Flow address {}: {}", s, e)))?;
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte identifier used for transactions and blocks
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier([u8; 32]);

/// Network-assigned transaction id
pub type TransactionId = Identifier;

impl Identifier {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = hex::decode(digits)
            .map_err(|e| Error::Encoding(format!("Invalid identifier {}: {}", s, e)))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Encoding(format!("Identifier must be 32 bytes: {}", s)))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let addr: Address = "0xf8d6e0586b0a20c7".parse().unwrap();
        assert_eq!(addr.to_string(), "0xf8d6e0586b0a20c7");
        assert_eq!(addr.to_hex(), "f8d6e0586b0a20c7");

        let bare: Address = "f8d6e0586b0a20c7".parse().unwrap();
        assert_eq!(addr, bare);
    }

    #[test]
    fn test_short_address_is_left_padded() {
        let addr: Address = "0x1".parse().unwrap();
        assert_eq!(addr.to_string(), "0x0000000000000001");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!("0x".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());
        assert!("0x0102030405060708090a".parse::<Address>().is_err());
    }

    #[test]
    fn test_identifier_requires_32_bytes() {
        let id: Identifier = "11".repeat(32).parse().unwrap();
        assert_eq!(id.to_hex(), "11".repeat(32));
        assert!("1122".parse::<Identifier>().is_err());
    }

    #[test]
    fn test_address_serde_roundtrip_uses_hex_string() {
        let addr: Address = "0x01cf0e2f2f715450".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x01cf0e2f2f715450\"");
    }
}
