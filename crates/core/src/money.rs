//! Money in the smallest currency unit (e.g. cents, piastres).

use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// An amount of money in minor units.
///
/// Signed because running balances can go negative (a customer who overpays
/// is in credit). The operators saturate; code that computes a total to be
/// stored uses the `checked_*` methods or [`Money::try_total`] instead.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Unit price × quantity.
    pub fn times(self, quantity: i64) -> Money {
        Money(self.0.saturating_mul(quantity))
    }

    pub fn checked_times(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sum that fails with an invariant violation instead of saturating.
    pub fn try_total<I>(amounts: I) -> DomainResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
            .ok_or_else(overflow)
    }

    /// `self × quantity`, failing with an invariant violation on overflow.
    pub fn try_times(self, quantity: i64) -> DomainResult<Money> {
        self.checked_times(quantity).ok_or_else(overflow)
    }
}

/// Error for a money computation that does not fit in `i64` minor units.
pub fn overflow() -> DomainError {
    DomainError::invariant("amount overflow")
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Money::from_minor(1234).to_string(), "12.34");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn times_multiplies_by_quantity() {
        assert_eq!(Money::from_minor(150).times(3), Money::from_minor(450));
    }

    #[test]
    fn sums_iterators() {
        let total: Money = [100, 250, -50].into_iter().map(Money::from_minor).sum();
        assert_eq!(total, Money::from_minor(300));
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(Money::from_minor(i64::MAX) + Money::from_minor(1), Money::from_minor(i64::MAX));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(1_000_000_000).checked_times(10_000_000_000), None);
        assert_eq!(Money::from_minor(150).checked_times(3), Some(Money::from_minor(450)));

        assert_eq!(
            Money::from_minor(1_000_000_000).try_times(10_000_000_000),
            Err(DomainError::invariant("amount overflow"))
        );
        assert_eq!(
            Money::try_total([Money::from_minor(i64::MAX), Money::from_minor(1)]),
            Err(DomainError::invariant("amount overflow"))
        );
        assert_eq!(
            Money::try_total([100, 250, -50].into_iter().map(Money::from_minor)),
            Ok(Money::from_minor(300))
        );
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let (a, b) = (Money::from_minor(a), Money::from_minor(b));
            prop_assert_eq!(a + b - b, a);
        }
    }
}
