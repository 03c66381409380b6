// src/models/money.rs
//! Денежные суммы в целых центах.
//!
//! Stored as INTEGER cents in SQLite and exposed in JSON as decimal major
//! units (`2500` cents <-> `25.0`), so ledger arithmetic never accumulates
//! floating point drift.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount accepted on any request field or booking: 1 000 000 000.00.
    pub const MAX_AMOUNT: Money = Money(100_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Rounds to the nearest cent, halves away from zero. Saturates at the
    /// i64 bounds; request input goes through `Deserialize`, which rejects
    /// amounts that would not fit.
    pub fn from_major(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(de::Error::custom("monetary amount must be a finite number"));
        }
        if amount.abs() * 100.0 >= i64::MAX as f64 {
            return Err(de::Error::custom("monetary amount is out of range"));
        }
        Ok(Money::from_major(amount))
    }
}

/// Validator hook for request fields that must not be negative.
pub fn validate_non_negative(value: &Money) -> Result<(), validator::ValidationError> {
    if value.is_negative() {
        let mut error = validator::ValidationError::new("negative_amount");
        error.message = Some("Amount cannot be negative".into());
        return Err(error);
    }
    Ok(())
}

/// Validator hook for request amounts: not negative and at most `Money::MAX_AMOUNT`.
pub fn validate_amount_range(value: &Money) -> Result<(), validator::ValidationError> {
    validate_non_negative(value)?;
    if *value > Money::MAX_AMOUNT {
        let mut error = validator::ValidationError::new("amount_too_large");
        error.message = Some(format!("Amount cannot exceed {}", Money::MAX_AMOUNT).into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major_rounds_to_cents() {
        assert_eq!(Money::from_major(25.0).cents(), 2500);
        assert_eq!(Money::from_major(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_major(10.125).cents(), 1013);
        assert_eq!(Money::from_major(-3.5).cents(), -350);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(5000).to_string(), "50.00");
        assert_eq!(Money::from_cents(-1205).to_string(), "-12.05");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&Money::from_cents(5000)).unwrap();
        assert_eq!(json, "50.0");

        let parsed: Money = serde_json::from_str("75000.25").unwrap();
        assert_eq!(parsed.cents(), 7_500_025);

        assert!(serde_json::from_str::<Money>("1e17").is_err());
        assert!(serde_json::from_str::<Money>("-1e300").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let allocated = Money::from_major(100.0);
        let used = Money::from_major(37.5);
        assert_eq!((allocated - used).cents(), 6250);

        let total: Money = vec![Money::from_cents(1), Money::from_cents(2)].into_iter().sum();
        assert_eq!(total.cents(), 3);
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(&Money::ZERO).is_ok());
        assert!(validate_non_negative(&Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_amount_range() {
        assert!(validate_amount_range(&Money::ZERO).is_ok());
        assert!(validate_amount_range(&Money::MAX_AMOUNT).is_ok());
        assert!(validate_amount_range(&Money::from_cents(-1)).is_err());
        assert!(validate_amount_range(&(Money::MAX_AMOUNT + Money::from_cents(1))).is_err());
        assert!(validate_amount_range(&Money::from_major(5.0e16)).is_err());
    }
}
