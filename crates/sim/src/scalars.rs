//! Serde helpers for on-chain integers.
//!
//! Snapshots carry 256-bit amounts as strings (decimal, or `0x`-prefixed hex) since
//! JSON numbers cannot hold them. Small values are also accepted as plain numbers.
//! Amounts are always written back as decimal strings.

use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serializer};

/// Parse a BigInt string (decimal or `0x` hex) into a U256.
pub fn parse_bigint(s: &str) -> Option<U256> {
    U256::from_str(s.trim()).ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBigInt {
    Text(String),
    Number(u64),
}

/// `#[serde(with = "...")]` adapter for a `U256` stored as a decimal string.
pub mod decimal_u256 {
    use super::*;

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawBigInt::deserialize(deserializer)? {
            RawBigInt::Number(n) => Ok(U256::from(n)),
            RawBigInt::Text(s) => parse_bigint(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid BigInt: {s}"))),
        }
    }
}

/// Same as [`decimal_u256`] for optional values; `null` maps to `None`.
pub mod option_decimal_u256 {
    use super::*;

    pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.collect_str(value),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawBigInt>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawBigInt::Number(n)) => Ok(Some(U256::from(n))),
            Some(RawBigInt::Text(s)) => parse_bigint(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid BigInt: {s}"))),
        }
    }
}
