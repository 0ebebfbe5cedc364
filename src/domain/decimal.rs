//! Lossless decimal money type backed by rust_decimal.
//!
//! Arithmetic stays exact; fixed two-digit formatting is applied only when a
//! value leaves the service (see [`fixed2`]).

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for stakes, odds and derived amounts.
///
/// Serializes to a JSON number by default so stored bet fields round-trip
/// the way clients submitted them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Largest representable value; saturating operations clamp here.
    pub const MAX: Decimal = Decimal(RustDecimal::MAX);
    /// Smallest representable value.
    pub const MIN: Decimal = Decimal(RustDecimal::MIN);

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format as a canonical string (no exponent, no trailing zeros).
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// Format with exactly two fraction digits, rounding half away from zero.
    ///
    /// Negative zero is printed as `0.00`.
    pub fn to_fixed_2(&self) -> String {
        let mut rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        rounded.rescale(2);
        rounded.to_string()
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// None on division by zero or when the quotient is out of range.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    pub fn saturating_add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0.saturating_sub(rhs.0))
    }

    pub fn saturating_mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0.saturating_mul(rhs.0))
    }

    /// Quotient clamped to [`Decimal::MIN`, `Decimal::MAX`]. Division by zero yields zero.
    pub fn saturating_div(self, rhs: Decimal) -> Decimal {
        match self.checked_div(rhs) {
            Some(quotient) => quotient,
            None if rhs.is_zero() || self.is_zero() => Decimal::zero(),
            None if self.is_negative() != rhs.is_negative() => Decimal::MIN,
            None => Decimal::MAX,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), Decimal::saturating_add)
    }
}

/// Serde helper emitting a Decimal as a fixed two-digit string (`"12.50"`).
///
/// Use with `#[serde(serialize_with = "fixed2::serialize")]`.
pub mod fixed2 {
    use super::Decimal;
    use serde::Serializer;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_fixed_2())
    }
}
