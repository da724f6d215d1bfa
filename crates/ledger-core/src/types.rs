// ledger-core/src/types.rs

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Timestamp in Unix epoch seconds
pub type Timestamp = u64;

/// Token amount (using BigUint for arbitrary precision)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(BigUint);

impl Amount {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Value as `u64` when it fits
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Some(Amount(&self.0 + &other.0))
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    pub fn checked_mul(&self, other: &Amount) -> Option<Amount> {
        Some(Amount(&self.0 * &other.0))
    }

    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or_else(Amount::zero)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which registry variant a contract is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryKind {
    /// Sign up, then check in during the event to earn a reward
    Event,
    /// Pay a cost at sign-up, then redeem before the deadline
    Welfare,
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryKind::Event => f.write_str("event"),
            RegistryKind::Welfare => f.write_str("welfare"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::from_u64(100);
        let b = Amount::from_u64(50);

        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum, Amount::from_u64(150));

        let diff = sum.checked_sub(&b).unwrap();
        assert_eq!(diff, Amount::from_u64(100));

        assert_eq!(a.checked_mul(&b).unwrap(), Amount::from_u64(5000));
    }

    #[test]
    fn test_amount_underflow() {
        let a = Amount::from_u64(50);
        let b = Amount::from_u64(100);

        assert!(a.checked_sub(&b).is_none());
        assert!(a.saturating_sub(&b).is_zero());
    }

    #[test]
    fn test_amount_to_u64() {
        assert_eq!(Amount::from_u64(42).to_u64(), Some(42));
        let huge = Amount::from_u64(u64::MAX).checked_mul(&Amount::from_u64(2)).unwrap();
        assert_eq!(huge.to_u64(), None);
    }

    proptest! {
        #[test]
        fn prop_add_then_sub_restores(a in any::<u64>(), b in any::<u64>()) {
            let a = Amount::from_u64(a);
            let b = Amount::from_u64(b);
            let sum = a.checked_add(&b).unwrap();
            prop_assert_eq!(sum.checked_sub(&b).unwrap(), a);
        }
    }
}
