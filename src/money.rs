//! Fixed-point money amounts with a single rounding rule
//!
//! Every monetary quantity in the ledger (cash, invested capital, fees,
//! P&L) is a `Money`: a decimal rounded to 2 places, half away from zero.
//! Prices and weighted-average cost stay full-precision `Decimal`; they are
//! converted exactly once, at the point a monetary amount is produced.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A currency amount held at 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Round an arbitrary-precision decimal into a money amount.
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl From<u64> for Money {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
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
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(dec!(0.005)).as_decimal(), dec!(0.01));
        assert_eq!(Money::from_decimal(dec!(0.004)).as_decimal(), dec!(0.00));
        assert_eq!(Money::from_decimal(dec!(-0.005)).as_decimal(), dec!(-0.01));
        assert_eq!(Money::from_decimal(dec!(100.125)).as_decimal(), dec!(100.13));
    }

    #[test]
    fn arithmetic_stays_exact() {
        let a = Money::from_decimal(dec!(10.01));
        let b = Money::from_decimal(dec!(0.02));
        assert_eq!((a + b).as_decimal(), dec!(10.03));
        assert_eq!((a - b).as_decimal(), dec!(9.99));

        let mut c = Money::ZERO;
        c += a;
        c -= b;
        assert_eq!(c.as_decimal(), dec!(9.99));
    }

    #[test]
    fn sums_over_iterators() {
        let total: Money = [dec!(1.10), dec!(2.20), dec!(3.30)]
            .into_iter()
            .map(Money::from_decimal)
            .sum();
        assert_eq!(total.as_decimal(), dec!(6.60));
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Money::from_decimal(dec!(5)).to_string(), "5.00");
        assert_eq!(Money::from_decimal(dec!(-0.5)).to_string(), "-0.50");
    }

    #[test]
    fn negative_detection() {
        assert!(Money::from_decimal(dec!(-0.01)).is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(!Money::from_decimal(dec!(0.01)).is_negative());
    }
}
