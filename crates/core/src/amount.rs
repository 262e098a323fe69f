//! Amount - strictly positive number of points moved by one operation
//!
//! Every transfer, deposit and withdraw carries an `Amount`. Zero, negative,
//! non-numeric and over-precise inputs are rejected at construction, so the
//! engine never sees them.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places a point amount may carry.
///
/// Balances stay exact under addition at this scale; finer amounts would be
/// rounded away when applied to a balance.
pub const MAX_SCALE: u32 = 4;

/// A positive decimal amount of points.
///
/// # Invariant
/// The inner value is always > 0 with at most [`MAX_SCALE`] decimal places.
///
/// # Example
/// ```
/// use points_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(10, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(10, 0));
///
/// assert!(Amount::new(Decimal::ZERO).is_err());
/// assert!("abc".parse::<Amount>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new Amount, rejecting zero, negative and over-precise values.
    pub fn new(value: Decimal) -> CoreResult<Self> {
        if value <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "amount must be positive: {}",
                value
            )));
        }
        let value = value.normalize();
        if value.scale() > MAX_SCALE {
            return Err(CoreError::InvalidAmount(format!(
                "at most {} decimal places allowed: {}",
                MAX_SCALE, value
            )));
        }
        Ok(Self(value))
    }

    /// Create an Amount from a whole number of points.
    pub fn from_points(points: i64) -> CoreResult<Self> {
        Self::new(Decimal::from(points))
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Negated value, used when the amount leaves an account
    #[inline]
    pub fn debit(&self) -> Decimal {
        -self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| CoreError::InvalidAmount(format!("not a number: {:?}", s)))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = CoreError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_amount() {
        let amount = Amount::new(dec!(2)).unwrap();
        assert_eq!(amount.value(), dec!(2));
        assert_eq!(amount.debit(), dec!(-2));
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(Amount::new(Decimal::ZERO).unwrap_err().is_invalid_amount());
        assert!(Amount::new(dec!(-1)).unwrap_err().is_invalid_amount());
        assert!(Amount::from_points(0).is_err());
    }

    #[test]
    fn test_precision_capped() {
        assert_eq!(Amount::new(dec!(0.0001)).unwrap().value(), dec!(0.0001));
        assert_eq!(Amount::new(dec!(1.50000)).unwrap().value(), dec!(1.5));
        assert!(Amount::new(dec!(0.00001)).unwrap_err().is_invalid_amount());
        assert!(Amount::new(dec!(0.0000000000000000000000000001))
            .unwrap_err()
            .is_invalid_amount());
        assert!("1.23456".parse::<Amount>().is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!("1".parse::<Amount>().unwrap().value(), dec!(1));
        assert_eq!(" 2.50 ".parse::<Amount>().unwrap().value(), dec!(2.5));
        assert!("".parse::<Amount>().is_err());
        assert!("ten".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
    }

    #[test]
    fn test_serde_rejects_non_positive() {
        let ok: Amount = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(ok.value(), dec!(5));
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }
}
