//! Hex-encoded JSON-RPC quantities (`"0x1b4"`).
//!
//! The ledger returns every integer as a `0x`-prefixed hex string. These helpers
//! are used with `#[serde(with = ...)]` so records keep the ledger's wire shape
//! both in RPC responses and in the cache files.

use serde::{Deserialize, Deserializer, Serializer};

use crate::{TypesError, WeiAmount};

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u128, TypesError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| TypesError::InvalidQuantity(s.to_string()))?;
    if digits.is_empty() {
        return Err(TypesError::InvalidQuantity(s.to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|_| TypesError::InvalidQuantity(s.to_string()))
}

/// Encode an integer as a `0x`-prefixed hex quantity without leading zeros.
pub fn format_quantity(value: u128) -> String {
    format!("{value:#x}")
}

/// `u64` fields (block numbers, timestamps, gas).
pub mod as_u64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_quantity(*value as u128))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = parse_quantity(&s).map_err(serde::de::Error::custom)?;
        u64::try_from(value).map_err(|_| serde::de::Error::custom(format!("{s} exceeds u64")))
    }
}

/// [`WeiAmount`] fields (fees, rewards).
pub mod as_wei {
    use super::*;

    pub fn serialize<S: Serializer>(value: &WeiAmount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_quantity(value.raw()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WeiAmount, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_quantity(&s)
            .map(WeiAmount::new)
            .map_err(serde::de::Error::custom)
    }
}

/// Optional [`WeiAmount`] fields; absent or `null` maps to `None`.
pub mod opt_wei {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<WeiAmount>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&format_quantity(v.raw())),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<WeiAmount>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| {
            parse_quantity(&s)
                .map(WeiAmount::new)
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
