use crate::error::{Result, SpendError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of decimal places in a major-unit amount.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// An amount in the smallest currency unit (e.g. kobo).
///
/// Every stored monetary field uses this representation. Conversions to and from
/// major units happen at the ledger boundary only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    pub const ZERO: Self = Self(0);

    /// Converts a major-unit amount, rounding to two decimal places first.
    pub fn from_major(amount: Decimal) -> Result<Self> {
        let rounded =
            amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        let scaled = rounded * Decimal::ONE_HUNDRED;
        scaled.to_i64().map(Self).ok_or_else(|| {
            SpendError::ValidationError(format!("amount {amount} is out of range"))
        })
    }

    /// Like [`MinorUnits::from_major`] but rejects zero and negative amounts.
    pub fn positive_from_major(amount: Decimal) -> Result<Self> {
        let minor = Self::from_major(amount)?;
        if minor.is_positive() {
            Ok(minor)
        } else {
            Err(SpendError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major())
    }
}

impl Add for MinorUnits {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for MinorUnits {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for MinorUnits {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for MinorUnits {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for MinorUnits {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
