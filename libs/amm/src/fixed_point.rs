//! 18-decimal fixed-point operations with explicit rounding direction
//!
//! Every pool formula picks `*_down` or `*_up` so that rounding always favours the
//! pool. Quotes computed off-chain must make the same choices to match on-chain
//! results exactly.

use crate::error::Result;
use crate::log_exp_math;
use crate::math::{raw, PRECISION};
use bn::{DecFixedPointNumber, IntNumber};
use num_bigint::BigInt;

/// Relative error bound of [`log_exp_math::pow`], `10^-14` in 18-decimal units
pub const MAX_POW_RELATIVE_ERROR: u64 = 10_000;

pub fn one() -> DecFixedPointNumber {
    DecFixedPointNumber::one(PRECISION)
}

pub fn zero() -> DecFixedPointNumber {
    DecFixedPointNumber::zero(PRECISION)
}

fn at_precision(x: &DecFixedPointNumber) -> DecFixedPointNumber {
    if x.precision() == PRECISION {
        x.clone()
    } else {
        x.set_precision(PRECISION)
    }
}

pub fn mul_down(a: &DecFixedPointNumber, b: &DecFixedPointNumber) -> DecFixedPointNumber {
    at_precision(a).mul_down(&at_precision(b))
}

pub fn mul_up(a: &DecFixedPointNumber, b: &DecFixedPointNumber) -> DecFixedPointNumber {
    at_precision(a).mul_up(&at_precision(b))
}

pub fn div_down(a: &DecFixedPointNumber, b: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    Ok(at_precision(a).div_down(&at_precision(b))?)
}

pub fn div_up(a: &DecFixedPointNumber, b: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    Ok(at_precision(a).div_up(&at_precision(b))?)
}

/// `1 - x` clamped at zero
pub fn complement(x: &DecFixedPointNumber) -> DecFixedPointNumber {
    let one = one();
    if x < &one {
        &one - x
    } else {
        zero()
    }
}

fn max_pow_error(result: &DecFixedPointNumber) -> DecFixedPointNumber {
    let relative = DecFixedPointNumber::from_mantissa(BigInt::from(MAX_POW_RELATIVE_ERROR), PRECISION);
    &mul_up(result, &relative) + &DecFixedPointNumber::from_mantissa(BigInt::from(1u8), PRECISION)
}

/// `x^y` rounded down; exact shortcuts for `y` in {1, 2, 4}
pub fn pow_down(x: &DecFixedPointNumber, y: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    let y_raw = raw(y);
    if y_raw == IntNumber::pow10(18) {
        return Ok(at_precision(x));
    }
    if y_raw == IntNumber::from(2u8) * IntNumber::pow10(18) {
        return Ok(mul_down(x, x));
    }
    if y_raw == IntNumber::from(4u8) * IntNumber::pow10(18) {
        let square = mul_down(x, x);
        return Ok(mul_down(&square, &square));
    }

    let result = log_exp_math::pow(x, y)?;
    let max_error = max_pow_error(&result);
    if result < max_error {
        Ok(zero())
    } else {
        Ok(&result - &max_error)
    }
}

/// `x^y` rounded up; exact shortcuts for `y` in {1, 2, 4}
pub fn pow_up(x: &DecFixedPointNumber, y: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    let y_raw = raw(y);
    if y_raw == IntNumber::pow10(18) {
        return Ok(at_precision(x));
    }
    if y_raw == IntNumber::from(2u8) * IntNumber::pow10(18) {
        return Ok(mul_up(x, x));
    }
    if y_raw == IntNumber::from(4u8) * IntNumber::pow10(18) {
        let square = mul_up(x, x);
        return Ok(mul_up(&square, &square));
    }

    let result = log_exp_math::pow(x, y)?;
    let max_error = max_pow_error(&result);
    Ok(&result + &max_error)
}
