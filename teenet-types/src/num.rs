//! Full width integer serialization.
//!
//! Rewards, timestamps and balances are `uint256` on chain. They are written as
//! decimal strings so no JSON reader ever narrows them to a double.

use std::fmt;

use ethers::types::U256;
use serde::de;
use serde::Deserializer;
use serde::Serializer;

/// Parses a decimal or `0x` hex string into a `U256`.
pub fn parse_u256(s: &str) -> Option<U256> {
    let s = s.trim();
    match s.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None if !s.is_empty() => U256::from_dec_str(s).ok(),
        None => None,
    }
}

/// `#[serde(with = "teenet_types::num::decimal")]`
pub mod decimal {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &U256,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(U256Visitor)
    }
}

/// Map key under which serde_json hands over the digits of a number when
/// `arbitrary_precision` is enabled.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

struct U256Visitor;

impl<'de> de::Visitor<'de> for U256Visitor {
    type Value = U256;

    fn expecting(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.write_str("an unsigned integer, a decimal string or a 0x hex string")
    }

    fn visit_u64<E: de::Error>(
        self,
        v: u64,
    ) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(
        self,
        v: i64,
    ) -> Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_u128<E: de::Error>(
        self,
        v: u128,
    ) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_str<E: de::Error>(
        self,
        v: &str,
    ) -> Result<U256, E> {
        parse_u256(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    // JSON numbers of any width arrive here as their literal digits. Fractions
    // and exponents are rejected by `parse_u256`.
    fn visit_map<A: de::MapAccess<'de>>(
        self,
        mut map: A,
    ) -> Result<U256, A::Error> {
        let key: Option<String> = map.next_key()?;
        if key.as_deref() != Some(NUMBER_TOKEN) {
            return Err(de::Error::invalid_type(de::Unexpected::Map, &self));
        }
        let digits: String = map.next_value()?;
        parse_u256(&digits)
            .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(&digits), &self))
    }
}

#[cfg(test)]
mod tests {
    use serde_derive::Deserialize;
    use serde_derive::Serialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "decimal")]
        value: U256,
    }

    #[test]
    fn test_parse_u256() {
        assert_eq!(parse_u256("100"), Some(U256::from(100)));
        assert_eq!(parse_u256("0x64"), Some(U256::from(100)));
        assert_eq!(parse_u256("0x"), None);
        assert_eq!(parse_u256(""), None);
        assert_eq!(parse_u256("-1"), None);
        assert_eq!(parse_u256("1.5"), None);
    }

    #[test]
    fn test_decimal_is_written_as_string() {
        let big = U256::from(1u64) << 200;
        let json = serde_json::to_string(&Wrapper { value: big }).unwrap();
        assert_eq!(json, format!("{{\"value\":\"{big}\"}}"));

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, big);
    }

    #[test]
    fn test_decimal_accepts_numbers_and_hex() {
        let w: Wrapper = serde_json::from_str(r#"{"value": 42}"#).unwrap();
        assert_eq!(w.value, U256::from(42));

        let w: Wrapper = serde_json::from_str(r#"{"value": "0x2a"}"#).unwrap();
        assert_eq!(w.value, U256::from(42));

        assert!(serde_json::from_str::<Wrapper>(r#"{"value": -1}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": "abc"}"#).is_err());
    }

    #[test]
    fn test_decimal_accepts_numbers_above_u64() {
        let w: Wrapper = serde_json::from_str(r#"{"value": 100000000000000000000}"#).unwrap();
        assert_eq!(w.value, U256::from_dec_str("100000000000000000000").unwrap());

        let max = U256::MAX.to_string();
        let w: Wrapper = serde_json::from_str(&format!(r#"{{"value": {max}}}"#)).unwrap();
        assert_eq!(w.value, U256::MAX);

        // never narrowed through a float
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": 1e20}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": 1.5}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": {"other": "1"}}"#).is_err());
    }
}
