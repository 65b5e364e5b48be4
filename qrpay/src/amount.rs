//! Exact decimal amounts for stablecoin balances and payment locks.
//!
//! The payment API reports amounts as decimal strings (`"12.50"`), but some
//! responses carry plain JSON numbers. [`Amount`] accepts both and compares
//! numerically, so `"12.50"` and `12.5` are the same amount.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A decimal amount of a currency or stablecoin.
///
/// # Serialization
///
/// Serialized as a decimal string to avoid floating-point rounding in JSON:
///
/// ```json
/// "12.50"
/// ```
///
/// Deserialization accepts either a string or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wraps a [`Decimal`].
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying [`Decimal`].
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

/// Error returned when a string is not a valid decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal amount {input:?}")]
pub struct ParseAmountError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Self)
            .map_err(|_| ParseAmountError {
                input: s.to_owned(),
            })
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_ignores_trailing_zeros() {
        assert_eq!(amount("12.50"), amount("12.5"));
        assert_eq!(amount("5.00"), Amount::from(5));
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let from_str: Amount = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Amount = serde_json::from_str("12.5").unwrap();
        let from_int: Amount = serde_json::from_str("12").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_int, Amount::from(12));
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<Amount>("\"twelve\"").is_err());
        assert!(serde_json::from_str::<Amount>("true").is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(amount("2") < amount("5.0"));
        assert!(amount("5.000") >= amount("5"));
        assert!(amount("10") > amount("9.99"));
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(amount("5.00").to_string(), "5");
        assert_eq!(amount("12.50").to_string(), "12.5");
    }

    #[test]
    fn test_negative_detection() {
        assert!(amount("-0.01").is_negative());
        assert!(!amount("0").is_negative());
        assert!(!amount("-0").is_negative());
    }
}
