//! Exponentiation and logarithm with 18-decimal fixed-point inputs
//!
//! Reproduces the on-chain LogExpMath library digit for digit. Exponents are decomposed
//! into a sum of powers of two whose exponentials are tabulated (`x_n`/`a_n` below),
//! the remainder is handled by a Taylor series at 20 decimals, and values close to one
//! use a dedicated 36-decimal series for `ln`. All divisions truncate toward zero.
//!
//! Inputs and outputs are [`DecFixedPointNumber`]s at 18 decimals; other precisions are
//! rescaled (truncating) first.

use crate::error::{AmmError, Result};
use crate::math::{fixed, raw};
use bn::{DecFixedPointNumber, IntNumber};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use once_cell::sync::Lazy;

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}

/// `mantissa * 10^zeros`
fn scaled(mantissa: u128, zeros: u32) -> BigInt {
    BigInt::from(mantissa) * pow10(zeros)
}

static ONE_18: Lazy<BigInt> = Lazy::new(|| pow10(18));
static ONE_20: Lazy<BigInt> = Lazy::new(|| pow10(20));
static ONE_36: Lazy<BigInt> = Lazy::new(|| pow10(36));

static MAX_NATURAL_EXPONENT: Lazy<BigInt> = Lazy::new(|| scaled(130, 18));
static MIN_NATURAL_EXPONENT: Lazy<BigInt> = Lazy::new(|| -scaled(41, 18));

static LN_36_LOWER_BOUND: Lazy<BigInt> = Lazy::new(|| scaled(9, 17));
static LN_36_UPPER_BOUND: Lazy<BigInt> = Lazy::new(|| scaled(11, 17));

static MILD_EXPONENT_BOUND: Lazy<BigInt> = Lazy::new(|| (BigInt::from(1u8) << 254usize) / &*ONE_20);

// 18 decimals, e^x0 and e^x1 without decimals
static X0: Lazy<BigInt> = Lazy::new(|| scaled(128, 18));
static A0: Lazy<BigInt> = Lazy::new(|| scaled(388_770_840_599_459_509_222, 35));
static X1: Lazy<BigInt> = Lazy::new(|| scaled(64, 18));
static A1: Lazy<BigInt> = Lazy::new(|| scaled(623_514_908_081_161_688_291, 7));

/// `(x_n, a_n)` for n in 2..=11, 20 decimals each, `a_n = e^x_n`
static TABLE: Lazy<Vec<(BigInt, BigInt)>> = Lazy::new(|| {
    vec![
        (scaled(32, 20), scaled(78_962_960_182_680_695_161, 14)),
        (scaled(16, 20), BigInt::from(888_611_052_050_787_263_676_000_000u128)),
        (scaled(8, 20), BigInt::from(298_095_798_704_172_827_474_000u128)),
        (scaled(4, 20), BigInt::from(5_459_815_003_314_423_907_810u128)),
        (scaled(2, 20), BigInt::from(738_905_609_893_065_022_723u128)),
        (scaled(1, 20), BigInt::from(271_828_182_845_904_523_536u128)),
        (scaled(5, 19), BigInt::from(164_872_127_070_012_814_685u128)),
        (scaled(25, 18), BigInt::from(128_402_541_668_774_148_407u128)),
        (scaled(125, 17), BigInt::from(113_314_845_306_682_631_683u128)),
        (scaled(625, 16), BigInt::from(106_449_445_891_785_942_956u128)),
    ]
});

/// `x^y` for 18-decimal `x >= 0`, `y >= 0`
pub fn pow(x: &DecFixedPointNumber, y: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    let x = raw(x).into_big();
    let y = raw(y).into_big();
    Ok(fixed(&IntNumber::from_big(pow_raw(&x, &y)?)))
}

/// `e^x` for 18-decimal `x` in `[-41, 130]`
pub fn exp(x: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    let x = raw(x).into_big();
    Ok(fixed(&IntNumber::from_big(exp_raw(&x)?)))
}

/// Natural logarithm of an 18-decimal `a > 0`
pub fn ln(a: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    let a = raw(a).into_big();
    if !a.is_positive() {
        return Err(AmmError::OutOfBounds);
    }
    let result = if in_ln_36_range(&a) {
        ln_36(&a) / &*ONE_18
    } else {
        ln_raw(&a)
    };
    Ok(fixed(&IntNumber::from_big(result)))
}

/// Logarithm of `arg` in base `base`, both 18-decimal and positive
pub fn log(arg: &DecFixedPointNumber, base: &DecFixedPointNumber) -> Result<DecFixedPointNumber> {
    let arg = raw(arg).into_big();
    let base = raw(base).into_big();
    if !arg.is_positive() || !base.is_positive() {
        return Err(AmmError::OutOfBounds);
    }
    let log_base = ln_36_scaled(&base);
    if log_base.is_zero() {
        return Err(AmmError::ZeroDivision);
    }
    let log_arg = ln_36_scaled(&arg);
    Ok(fixed(&IntNumber::from_big((log_arg * &*ONE_18) / log_base)))
}

fn in_ln_36_range(x: &BigInt) -> bool {
    &*LN_36_LOWER_BOUND < x && x < &*LN_36_UPPER_BOUND
}

/// `ln(x)` at 36 decimals, via the precise series near one
fn ln_36_scaled(x: &BigInt) -> BigInt {
    if in_ln_36_range(x) {
        ln_36(x)
    } else {
        ln_raw(x) * &*ONE_18
    }
}

pub(crate) fn pow_raw(x: &BigInt, y: &BigInt) -> Result<BigInt> {
    if y.is_zero() {
        return Ok(ONE_18.clone());
    }
    if x.is_zero() {
        return Ok(BigInt::zero());
    }
    if x.is_negative() || x.bits() > 255 {
        return Err(AmmError::XOutOfBounds);
    }
    if y.is_negative() || y >= &*MILD_EXPONENT_BOUND {
        return Err(AmmError::YOutOfBounds);
    }

    let mut logx_times_y = if in_ln_36_range(x) {
        let ln_36_x = ln_36(x);
        // split to keep 36-digit precision without overflowing the product
        (&ln_36_x / &*ONE_18) * y + ((&ln_36_x % &*ONE_18) * y) / &*ONE_18
    } else {
        ln_raw(x) * y
    };
    logx_times_y /= &*ONE_18;

    if logx_times_y < *MIN_NATURAL_EXPONENT || logx_times_y > *MAX_NATURAL_EXPONENT {
        return Err(AmmError::ProductOutOfBounds);
    }
    exp_raw(&logx_times_y)
}

pub(crate) fn exp_raw(x: &BigInt) -> Result<BigInt> {
    if x < &*MIN_NATURAL_EXPONENT || x > &*MAX_NATURAL_EXPONENT {
        return Err(AmmError::InvalidExponent);
    }
    if x.is_negative() {
        // e^(-x) = 1 / e^x; the argument is in range, so the result is never zero
        return Ok((&*ONE_18 * &*ONE_18) / exp_raw(&-x)?);
    }

    let mut x = x.clone();
    let first_an = if x >= *X0 {
        x -= &*X0;
        A0.clone()
    } else if x >= *X1 {
        x -= &*X1;
        A1.clone()
    } else {
        BigInt::from(1u8)
    };

    x *= 100u32;

    let mut product = ONE_20.clone();
    // only x2..x9; smaller terms are absorbed by the series
    for (x_n, a_n) in TABLE.iter().take(8) {
        if x >= *x_n {
            x -= x_n;
            product = (product * a_n) / &*ONE_20;
        }
    }

    let mut series_sum = ONE_20.clone();
    let mut term = x.clone();
    series_sum += &term;
    for k in 2u32..=12 {
        term = ((term * &x) / &*ONE_20) / k;
        series_sum += &term;
    }

    Ok((((product * series_sum) / &*ONE_20) * first_an) / 100u32)
}

/// `ln(a)` at 18 decimals for any positive `a`
fn ln_raw(a: &BigInt) -> BigInt {
    if a < &*ONE_18 {
        return -ln_raw(&((&*ONE_18 * &*ONE_18) / a));
    }

    let mut a = a.clone();
    let mut sum = BigInt::zero();
    if a >= &*A0 * &*ONE_18 {
        a /= &*A0;
        sum += &*X0;
    }
    if a >= &*A1 * &*ONE_18 {
        a /= &*A1;
        sum += &*X1;
    }

    sum *= 100u32;
    a *= 100u32;

    for (x_n, a_n) in TABLE.iter() {
        if a >= *a_n {
            a = (a * &*ONE_20) / a_n;
            sum += x_n;
        }
    }

    let z = ((&a - &*ONE_20) * &*ONE_20) / (&a + &*ONE_20);
    let z_squared = (&z * &z) / &*ONE_20;

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for k in [3u32, 5, 7, 9, 11] {
        num = (num * &z_squared) / &*ONE_20;
        series_sum += &num / k;
    }
    series_sum *= 2u32;

    (sum + series_sum) / 100u32
}

/// `ln(x)` at 36 decimals for 18-decimal `x` close to one
fn ln_36(x: &BigInt) -> BigInt {
    let x = x * &*ONE_18;

    let z = ((&x - &*ONE_36) * &*ONE_36) / (&x + &*ONE_36);
    let z_squared = (&z * &z) / &*ONE_36;

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for k in [3u32, 5, 7, 9, 11, 13, 15] {
        num = (num * &z_squared) / &*ONE_36;
        series_sum += &num / k;
    }
    series_sum * 2u32
}
