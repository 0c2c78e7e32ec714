use crate::shared::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Money amount in smallest currency unit (cents). Costs are tracked for
/// COGS reporting only — this is not a general-ledger accounting type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    pub fn from_cents(cents: i64) -> AppResult<Self> {
        if cents < 0 {
            return Err(AppError::validation("Money amount cannot be negative"));
        }
        Ok(Self(cents))
    }

    pub fn from_major(amount: f64) -> AppResult<Self> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(AppError::validation("Money amount must be finite and non-negative"));
        }
        Ok(Self((amount * 100.0).round() as i64))
    }

    pub fn as_cents(&self) -> i64 {
        self.0
    }

    pub fn as_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn add(&self, other: Money) -> AppResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| AppError::validation("Money overflow"))
    }

    pub fn multiply(&self, factor: f64) -> AppResult<Money> {
        if factor < 0.0 || !factor.is_finite() {
            return Err(AppError::validation("Multiplier must be finite and non-negative"));
        }
        Ok(Money((self.0 as f64 * factor).round() as i64))
    }
}

/// A non-negative quantity expressed in an item's base UOM (stock levels,
/// counted quantities, par targets). Ledger deltas, which may be negative,
/// use `SignedQuantity` instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity(f64);

impl Quantity {
    pub fn new(value: f64) -> AppResult<Self> {
        if value < 0.0 {
            return Err(AppError::validation("Quantity cannot be negative"));
        }
        if !value.is_finite() {
            return Err(AppError::validation("Quantity must be finite"));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

/// A signed quantity in base UOM — used for ledger deltas and variances,
/// which are explicitly allowed to be negative (depletion) or positive
/// (addition / reconciling adjustment).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignedQuantity(f64);

impl SignedQuantity {
    pub fn new(value: f64) -> AppResult<Self> {
        if !value.is_finite() {
            return Err(AppError::validation("Quantity delta must be finite"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn negate(&self) -> Self {
        Self(-self.0)
    }
}

impl std::ops::Add for SignedQuantity {
    type Output = SignedQuantity;
    fn add(self, rhs: SignedQuantity) -> SignedQuantity {
        SignedQuantity(self.0 + rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_from_cents() {
        let money = Money::from_cents(1500).unwrap();
        assert_eq!(money.as_cents(), 1500);
        assert_eq!(money.as_major(), 15.0);
    }

    #[test]
    fn money_negative_rejected() {
        assert!(Money::from_cents(-100).is_err());
        assert!(Money::from_major(-10.0).is_err());
    }

    #[test]
    fn quantity_validation() {
        assert!(Quantity::new(10.5).is_ok());
        assert!(Quantity::new(0.0).is_ok());
        assert!(Quantity::new(-1.0).is_err());
        assert!(Quantity::new(f64::INFINITY).is_err());
    }

    #[test]
    fn signed_quantity_allows_negative() {
        let d = SignedQuantity::new(-88.72).unwrap();
        assert_eq!(d.value(), -88.72);
        assert_eq!(d.negate().value(), 88.72);
    }
}
