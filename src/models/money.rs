//! Money type for billing amounts
//!
//! Amounts are kept in integer cents so that sums of payments and
//! period multiplications stay exact. Values read from the store arrive as
//! decimal numbers and are rounded to the nearest cent on the way in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A monetary amount in cents (hundredths of the currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Largest amount, in whole units, accepted from imported data
    pub const MAX_UNITS: f64 = 1_000_000_000_000.0;

    /// Create a Money amount from cents
    ///
    /// # Examples
    /// ```
    /// use academy_cli::models::Money;
    /// let amount = Money::from_cents(1050); // 10.50
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a Money amount from whole units
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(100))
    }

    /// Create a Money amount from a decimal value, rounding to the cent
    ///
    /// Non-finite input yields zero.
    ///
    /// # Examples
    /// ```
    /// use academy_cli::models::Money;
    /// assert_eq!(Money::from_decimal(299.999).cents(), 30000);
    /// ```
    pub fn from_decimal(value: f64) -> Self {
        if value.is_finite() {
            Self((value * 100.0).round() as i64)
        } else {
            Self::zero()
        }
    }

    /// Whether a decimal amount is finite and within `MAX_UNITS`
    pub fn is_representable(value: f64) -> bool {
        value.is_finite() && value.abs() <= Self::MAX_UNITS
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole units (truncated toward zero)
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// The cents portion (0-99)
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Decimal representation, used when writing amounts back out
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The larger of `self` and zero
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Self::zero()
        } else {
            self
        }
    }

    /// Format with a currency symbol placed after the amount (`300.00 €`)
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        format!("{} {}", self, symbol)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, periods: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(periods)))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Serialize a Money field as a decimal number instead of cents
///
/// Used by report types whose JSON/YAML output is read by people.
pub mod as_decimal {
    use super::Money;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.as_decimal())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        f64::deserialize(deserializer).map(Money::from_decimal)
    }
}
