use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// A monetary amount in minor units (santim / cents).
///
/// All amounts in the gateway are stored and compared in minor units so that no floating point
/// arithmetic ever touches a ledger value. Conversion to the display / processor format happens at
/// the edges.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Construct an amount from major units, e.g. `Money::from_major(500)` is 500.00.
    pub fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_in_major_units() {
        assert_eq!(Money::from(50_000).to_string(), "500.00");
        assert_eq!(Money::from(99).to_string(), "0.99");
        assert_eq!(Money::from(-1250).to_string(), "-12.50");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_major(500);
        let b = Money::from(2_500);
        assert_eq!(a + b, Money::from(52_500));
        assert_eq!(a - b, Money::from(47_500));
        assert_eq!(-b, Money::from(-2_500));
        assert_eq!(b * 4, Money::from(10_000));
        assert_eq!(vec![a, b].into_iter().sum::<Money>(), Money::from(52_500));
    }
}
