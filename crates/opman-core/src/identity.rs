//! Caller identities.
//!
//! An [`Address`] is the 20-byte identity of an administrator, a relayer or
//! any other caller. Its text form is `0x` followed by 40 hex digits.
//!
//! The all-zero address is reserved as [`Address::OPEN`]: a gate that
//! resolves to it lets every caller through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A caller identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The open sentinel. A gate resolving to this value admits everyone.
    pub const OPEN: Self = Self([0u8; ADDRESS_LEN]);

    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Returns `true` if this is the open sentinel.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self == Self::OPEN
    }

    /// Builds a deterministic address whose last byte is `n`.
    ///
    /// Handy for fixtures: `Address::from_low_u64(1)` is
    /// `0x0000000000000000000000000000000000000001`.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

/// Errors produced when parsing an [`Address`] from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// The `0x` prefix is missing.
    #[error("address must start with 0x: {input}")]
    MissingPrefix {
        /// The rejected input.
        input: String,
    },

    /// Wrong number of hex digits.
    #[error("address must have {expected} hex digits, got {actual}")]
    InvalidLength {
        /// Expected digit count.
        expected: usize,
        /// Actual digit count.
        actual: usize,
    },

    /// Non-hex characters.
    #[error("address contains invalid hex: {reason}")]
    InvalidHex {
        /// Decoder message.
        reason: String,
    },
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix {
                input: s.chars().take(64).collect(),
            })?;

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressParseError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| AddressParseError::InvalidHex {
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let text = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
        let addr: Address = text.parse().unwrap();
        assert_eq!(addr.to_string(), text);
    }

    #[test]
    fn parse_accepts_mixed_case() {
        let addr: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        assert_eq!(
            addr.to_string(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        let err = "70997970c51812dc3a010c7d01b50e0d17dc79c8"
            .parse::<Address>()
            .unwrap_err();
        assert!(matches!(err, AddressParseError::MissingPrefix { .. }));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            AddressParseError::InvalidLength {
                expected: 40,
                actual: 4
            }
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let err = "0xzz997970c51812dc3a010c7d01b50e0d17dc79c8"
            .parse::<Address>()
            .unwrap_err();
        assert!(matches!(err, AddressParseError::InvalidHex { .. }));
    }

    #[test]
    fn zero_address_is_open() {
        let zero: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_open());
        assert_eq!(zero, Address::OPEN);
        assert!(!Address::from_low_u64(1).is_open());
    }

    #[test]
    fn serde_uses_text_form() {
        let addr = Address::from_low_u64(0xab);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000ab\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
