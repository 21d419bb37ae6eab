//! Fixed-width ECDSA signature encoding

use crate::{Error, Result};
use alloy::hex;
use std::fmt;

/// Width of each of `r` and `s`
pub const SIGNATURE_COMPONENT_LENGTH: usize = 32;

/// An ECDSA signature as Flow expects it on the wire: `r‖s`, 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    r: [u8; SIGNATURE_COMPONENT_LENGTH],
    s: [u8; SIGNATURE_COMPONENT_LENGTH],
}

impl Signature {
    /// Build from big-endian components of natural length.
    ///
    /// Components shorter than 32 bytes are left-padded with zeros; leading
    /// zero bytes beyond 32 are stripped.
    pub fn from_components(r: &[u8], s: &[u8]) -> Result<Self> {
        Ok(Self {
            r: left_pad(r, "r")?,
            s: left_pad(s, "s")?,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_COMPONENT_LENGTH * 2 {
            return Err(Error::Encoding(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_COMPONENT_LENGTH * 2,
                bytes.len()
            )));
        }
        let (r, s) = bytes.split_at(SIGNATURE_COMPONENT_LENGTH);
        Self::from_components(r, s)
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(trimmed)
            .map_err(|e| Error::Encoding(format!("Invalid signature hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn r(&self) -> &[u8; SIGNATURE_COMPONENT_LENGTH] {
        &self.r
    }

    pub fn s(&self) -> &[u8; SIGNATURE_COMPONENT_LENGTH] {
        &self.s
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_COMPONENT_LENGTH * 2] {
        let mut out = [0u8; SIGNATURE_COMPONENT_LENGTH * 2];
        out[..SIGNATURE_COMPONENT_LENGTH].copy_from_slice(&self.r);
        out[SIGNATURE_COMPONENT_LENGTH..].copy_from_slice(&self.s);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

fn left_pad(component: &[u8], name: &str) -> Result<[u8; SIGNATURE_COMPONENT_LENGTH]> {
    let first_nonzero = component
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(component.len());
    let significant = &component[first_nonzero..];
    if significant.len() > SIGNATURE_COMPONENT_LENGTH {
        return Err(Error::Encoding(format!(
            "Signature component {} exceeds {} bytes",
            name, SIGNATURE_COMPONENT_LENGTH
        )));
    }
    let mut out = [0u8; SIGNATURE_COMPONENT_LENGTH];
    out[SIGNATURE_COMPONENT_LENGTH - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_components_are_left_padded() {
        let sig = Signature::from_components(&[0x01, 0x02], &[0xff]).unwrap();
        let bytes = sig.to_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[30..32], &[0x01, 0x02]);
        assert_eq!(bytes[63], 0xff);
        assert!(bytes[..30].iter().all(|b| *b == 0));
        assert!(bytes[32..63].iter().all(|b| *b == 0));
    }

    #[test]
    fn leading_zeros_beyond_width_are_stripped() {
        let mut r = vec![0u8; 33];
        r[32] = 7;
        let sig = Signature::from_components(&r, &[1]).unwrap();
        assert_eq!(sig.r()[31], 7);
    }

    #[test]
    fn oversized_component_is_rejected() {
        let r = vec![1u8; 33];
        assert!(Signature::from_components(&r, &[1]).is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let sig = Signature::from_components(&[9; 32], &[3; 32]).unwrap();
        let parsed = Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, parsed);
        assert!(Signature::from_hex("abcd").is_err());
    }
}
