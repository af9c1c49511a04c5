//! Checked unsigned integer helpers
//!
//! Raw pool quantities are on-chain `uint256` values; subtraction below zero and
//! division by zero are reverts, never wrapped or saturated results.

use crate::error::{AmmError, Result};
use bn::{DecFixedPointNumber, IntNumber};

/// Fractional digits of on-chain fixed-point values
pub const PRECISION: u8 = 18;

pub fn sub(a: &IntNumber, b: &IntNumber) -> Result<IntNumber> {
    if b > a {
        return Err(AmmError::SubOverflow {
            a: a.to_string(),
            b: b.to_string(),
        });
    }
    Ok(a - b)
}

pub fn div_down(a: &IntNumber, b: &IntNumber) -> Result<IntNumber> {
    Ok(a.checked_div(b)?)
}

pub fn div_up(a: &IntNumber, b: &IntNumber) -> Result<IntNumber> {
    if b.is_zero() {
        return Err(AmmError::ZeroDivision);
    }
    if a.is_zero() {
        return Ok(IntNumber::zero());
    }
    Ok((a - IntNumber::one()).checked_div(b)? + IntNumber::one())
}

/// Raw integer viewed as an 18-decimal fixed-point value
pub fn fixed(raw: &IntNumber) -> DecFixedPointNumber {
    DecFixedPointNumber::from_mantissa(raw.as_big().clone(), PRECISION)
}

/// 18-decimal mantissa of a fixed-point value
pub fn raw(value: &DecFixedPointNumber) -> IntNumber {
    if value.precision() == PRECISION {
        value.mantissa()
    } else {
        value.set_precision(PRECISION).mantissa()
    }
}
