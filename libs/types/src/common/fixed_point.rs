//! Fixed-point scaling for relay prices
//!
//! The pricing relay carries prices and confidence intervals as unsigned
//! integers with an implied decimal exponent. FIX carries them as decimal
//! strings. This module is the single conversion point between the two.
//!
//! ## Design Principles
//!
//! - **No Precision Loss**: parsing goes through `rust_decimal`, never `f64`
//! - **Overflow Protection**: checked multiplication, explicit range errors
//! - **Deterministic Rounding**: sub-unit remainders use banker's rounding

use crate::common::errors::FixedPointError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decimal exponent applied to relay prices
///
/// With exponent 5, `1699.2` is carried as `169_920_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceScale {
    exponent: u32,
}

impl PriceScale {
    /// Largest exponent that keeps realistic prices inside `Decimal`'s range
    pub const MAX_EXPONENT: u32 = 18;

    /// Create a scale; see [`PriceScale::try_new`] for validated construction
    pub const fn new(exponent: u32) -> Self {
        Self { exponent }
    }

    /// Create a scale, rejecting exponents outside the supported range
    pub fn try_new(exponent: u32) -> Result<Self, FixedPointError> {
        if exponent > Self::MAX_EXPONENT {
            return Err(FixedPointError::UnsupportedExponent {
                exponent,
                max: Self::MAX_EXPONENT,
            });
        }
        Ok(Self { exponent })
    }

    pub fn exponent(self) -> u32 {
        self.exponent
    }

    /// `10^exponent`
    pub fn multiplier(self) -> Decimal {
        Decimal::from(10u64.pow(self.exponent))
    }

    fn scaled(self, value: Decimal) -> Result<Decimal, FixedPointError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(FixedPointError::Negative {
                value: value.to_string(),
            });
        }
        value
            .checked_mul(self.multiplier())
            .map(|scaled| scaled.round())
            .ok_or_else(|| FixedPointError::Overflow {
                value: value.to_string(),
            })
    }

    /// Scale a price to the relay's `u64` representation
    pub fn scale(self, value: Decimal) -> Result<u64, FixedPointError> {
        self.scaled(value)?
            .to_u64()
            .ok_or_else(|| FixedPointError::Overflow {
                value: value.to_string(),
            })
    }

    /// Scale a confidence interval to the relay's `u32` representation
    pub fn scale_u32(self, value: Decimal) -> Result<u32, FixedPointError> {
        self.scaled(value)?
            .to_u32()
            .ok_or_else(|| FixedPointError::Overflow {
                value: value.to_string(),
            })
    }

    /// Parse and scale a decimal string such as a FIX price field
    pub fn scale_str(self, input: &str) -> Result<u64, FixedPointError> {
        let value = Decimal::from_str(input).map_err(|_| FixedPointError::InvalidDecimal {
            input: input.to_string(),
        })?;
        self.scale(value)
    }

    /// Inverse of [`PriceScale::scale`], for display and logging
    pub fn unscale(self, raw: u64) -> Decimal {
        Decimal::from(raw) / self.multiplier()
    }
}

impl Default for PriceScale {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_exact_decimal() {
        let scale = PriceScale::new(5);
        assert_eq!(scale.scale_str("1699.2").unwrap(), 169_920_000);
        assert_eq!(scale.scale_str("7.3").unwrap(), 730_000);
        assert_eq!(scale.scale_str("0").unwrap(), 0);
    }

    #[test]
    fn test_sub_unit_remainder_rounds_half_even() {
        let scale = PriceScale::new(2);
        assert_eq!(scale.scale_str("1.005").unwrap(), 100);
        assert_eq!(scale.scale_str("1.015").unwrap(), 102);
        assert_eq!(scale.scale_str("1.0151").unwrap(), 102);
    }

    #[test]
    fn test_negative_rejected() {
        let scale = PriceScale::new(5);
        assert!(matches!(
            scale.scale_str("-1.5"),
            Err(FixedPointError::Negative { .. })
        ));
    }

    #[test]
    fn test_invalid_decimal_rejected() {
        let scale = PriceScale::new(5);
        assert!(matches!(
            scale.scale_str("1.2.3"),
            Err(FixedPointError::InvalidDecimal { .. })
        ));
    }

    #[test]
    fn test_u32_overflow() {
        let scale = PriceScale::new(5);
        let too_wide = Decimal::from(50_000u32);
        assert!(matches!(
            scale.scale_u32(too_wide),
            Err(FixedPointError::Overflow { .. })
        ));
        assert_eq!(scale.scale_u32(Decimal::new(73, 1)).unwrap(), 730_000);
    }

    #[test]
    fn test_exponent_bounds() {
        assert!(PriceScale::try_new(PriceScale::MAX_EXPONENT).is_ok());
        assert!(PriceScale::try_new(PriceScale::MAX_EXPONENT + 1).is_err());
    }

    #[test]
    fn test_unscale_inverts_scale() {
        let scale = PriceScale::new(5);
        assert_eq!(scale.unscale(169_920_000), Decimal::new(16992, 1));
    }
}
