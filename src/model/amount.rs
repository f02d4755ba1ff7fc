//! Amount type for yen values.
//!
//! Amounts are whole yen. There is no fractional unit, so parsing rejects anything with a decimal
//! point instead of rounding it away.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Represents a yen amount.
///
/// # Examples
///
/// ```
/// # use kakeibo::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("¥1,200").unwrap();
/// assert_eq!(amount.value(), 1200);
/// assert_eq!(amount.to_string(), "¥1,200");
/// assert!(Amount::from_str("12.5").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// The largest amount a single expense may have, one yen short of a trillion.
    pub const MAX: Amount = Amount(999_999_999_999);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountError(String);

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a whole number of yen", self.0)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_sign = trimmed
            .strip_prefix('¥')
            .or_else(|| trimmed.strip_prefix('￥'))
            .unwrap_or(trimmed);
        let digits = without_sign.replace(',', "");
        digits
            .parse::<i64>()
            .map(Amount)
            .map_err(|_| AmountError(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let formatted = format_num::format_num!(",.0", self.0.unsigned_abs() as f64);
        write!(f, "{sign}¥{formatted}")
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Sums saturate at the bounds of `i64`.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(Amount::from_str("1000").unwrap().value(), 1000);
        assert_eq!(Amount::from_str(" 42 ").unwrap().value(), 42);
    }

    #[test]
    fn test_parse_with_yen_sign_and_commas() {
        assert_eq!(Amount::from_str("¥12,345").unwrap().value(), 12345);
        assert_eq!(Amount::from_str("￥500").unwrap().value(), 500);
    }

    #[test]
    fn test_parse_rejects_fractions_and_text() {
        assert!(Amount::from_str("12.5").is_err());
        assert!(Amount::from_str("1e3").is_err());
        assert!(Amount::from_str("").is_err());
        assert!(Amount::from_str("abc").is_err());
    }

    #[test]
    fn test_parse_accepts_non_positive_but_flags_them() {
        let zero = Amount::from_str("0").unwrap();
        assert!(!zero.is_positive());
        let negative = Amount::from_str("-10").unwrap();
        assert!(!negative.is_positive());
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::new(0).to_string(), "¥0");
        assert_eq!(Amount::new(999).to_string(), "¥999");
        assert_eq!(Amount::new(1_234_567).to_string(), "¥1,234,567");
        assert_eq!(Amount::new(-3500).to_string(), "-¥3,500");
    }

    #[test]
    fn test_sum() {
        let total: Amount = [Amount::new(1000), Amount::new(2000), Amount::new(500)]
            .iter()
            .sum();
        assert_eq!(total, Amount::new(3500));
    }

    #[test]
    fn test_sum_saturates() {
        let big = Amount::new(i64::MAX / 2 + 1);
        assert_eq!(big + big, Amount::new(i64::MAX));
        let mut total = big;
        total += big;
        assert_eq!(total, Amount::new(i64::MAX));
    }

    #[test]
    fn test_serde_is_a_plain_integer() {
        let json = serde_json::to_string(&Amount::new(1500)).unwrap();
        assert_eq!(json, "1500");
        let back: Amount = serde_json::from_str("1500").unwrap();
        assert_eq!(back, Amount::new(1500));
    }
}
