use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stellar stroops: 1 XLM = 10^7 minor units.
pub const DEFAULT_UNIT_SCALE: u32 = 7;
pub const MAX_UNIT_SCALE: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is negative")]
    Negative,

    #[error("amount is not a finite number")]
    NonFinite,

    #[error("amount has more than {decimals} decimal places")]
    TooPrecise { decimals: u32 },

    #[error("amount is out of range")]
    Overflow,
}

/// Number of decimal places of the smallest currency unit.
///
/// All settlement arithmetic happens on integer minor units at this scale,
/// so an amount that cannot be expressed in whole minor units is rejected
/// rather than silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitScale(u32);

impl Default for UnitScale {
    fn default() -> Self {
        Self(DEFAULT_UNIT_SCALE)
    }
}

impl UnitScale {
    pub fn new(decimals: u32) -> Option<Self> {
        (decimals <= MAX_UNIT_SCALE).then_some(Self(decimals))
    }

    pub fn decimals(self) -> u32 {
        self.0
    }

    fn multiplier(self) -> Decimal {
        Decimal::from(10u64.pow(self.0))
    }

    /// Exact conversion of a non-negative decimal into minor units.
    pub fn to_minor_units(self, amount: Decimal) -> Result<u128, AmountError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AmountError::Negative);
        }
        let scaled = amount
            .checked_mul(self.multiplier())
            .ok_or(AmountError::Overflow)?;
        if !scaled.fract().is_zero() {
            return Err(AmountError::TooPrecise { decimals: self.0 });
        }
        scaled.trunc().to_u128().ok_or(AmountError::Overflow)
    }

    pub fn from_minor_units(self, units: u128) -> Result<Decimal, AmountError> {
        let units = i128::try_from(units).map_err(|_| AmountError::Overflow)?;
        Decimal::try_from_i128_with_scale(units, self.0)
            .map(|d| d.normalize())
            .map_err(|_| AmountError::Overflow)
    }

    /// Float input (legacy browser data): rejects NaN, infinities and
    /// negatives, then rounds half-to-even onto the unit grid.
    pub fn from_f64(self, value: f64) -> Result<Decimal, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NonFinite);
        }
        if value < 0.0 {
            return Err(AmountError::Negative);
        }
        let amount = Decimal::from_f64(value).ok_or(AmountError::Overflow)?;
        Ok(amount
            .round_dp_with_strategy(self.0, RoundingStrategy::MidpointNearestEven)
            .normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_exact() {
        let scale = UnitScale::default();
        assert_eq!(scale.to_minor_units(Decimal::from(100)).unwrap(), 1_000_000_000);
        assert_eq!(scale.to_minor_units(Decimal::new(1, 7)).unwrap(), 1);
        assert_eq!(scale.to_minor_units(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_minor_units_rejects_bad_amounts() {
        let scale = UnitScale::default();
        assert_eq!(
            scale.to_minor_units(Decimal::from(-5)),
            Err(AmountError::Negative)
        );
        assert_eq!(
            scale.to_minor_units(Decimal::new(1, 8)), // 0.00000001
            Err(AmountError::TooPrecise { decimals: 7 })
        );
    }

    #[test]
    fn test_from_minor_units_normalizes() {
        let scale = UnitScale::default();
        let amount = scale.from_minor_units(1_500_000_000).unwrap();
        assert_eq!(amount, Decimal::from(150));
        assert_eq!(amount.to_string(), "150");
    }

    #[test]
    fn test_from_f64() {
        let scale = UnitScale::default();
        assert_eq!(scale.from_f64(250.5).unwrap(), Decimal::new(2505, 1));
        assert_eq!(
            scale.from_f64(133.33333333333334).unwrap(),
            Decimal::new(1_333_333_333, 7)
        );
        assert_eq!(scale.from_f64(f64::NAN), Err(AmountError::NonFinite));
        assert_eq!(scale.from_f64(f64::INFINITY), Err(AmountError::NonFinite));
        assert_eq!(scale.from_f64(-1.0), Err(AmountError::Negative));
    }

    #[test]
    fn test_scale_bounds() {
        assert!(UnitScale::new(MAX_UNIT_SCALE).is_some());
        assert!(UnitScale::new(MAX_UNIT_SCALE + 1).is_none());
    }
}
