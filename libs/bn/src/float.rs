//! Arbitrary-precision binary floating value
//!
//! Values are stored as `mantissa * 2^exp` with an odd (or zero) mantissa. Addition,
//! subtraction and multiplication are exact. Division keeps [`FLOAT_PRECISION`] bits of
//! mantissa and truncates the rest.

use crate::error::{NumberError, Result};
use crate::precision::pow10;
use crate::{DecFixedPointNumber, DecFloatPointNumber, IntNumber, MAX_PRECISION};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

/// Mantissa bits kept by division
pub const FLOAT_PRECISION: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FloatNumber {
    mant: BigInt,
    exp: i64,
}

impl FloatNumber {
    pub fn zero() -> Self {
        Self::default()
    }

    fn normalized(mant: BigInt, exp: i64) -> Self {
        if mant.is_zero() {
            return Self::zero();
        }
        let tz = mant.trailing_zeros().unwrap_or(0);
        if tz == 0 {
            return Self { mant, exp };
        }
        Self {
            mant: mant >> tz as usize,
            exp: exp + tz as i64,
        }
    }

    pub fn from_int(value: &IntNumber) -> Self {
        Self::normalized(value.0.clone(), 0)
    }

    /// Exact binary value of a finite `f64`; `None` for NaN or infinities
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::zero());
        }
        let bits = value.to_bits();
        let negative = bits >> 63 != 0;
        let exp_bits = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << 52) - 1);
        let (mant, exp) = if exp_bits == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), exp_bits - 1075)
        };
        let mant = BigInt::from(mant);
        Some(Self::normalized(if negative { -mant } else { mant }, exp))
    }

    /// Parses a decimal string, exact when the value has a finite binary expansion
    pub fn parse(s: &str) -> Option<Self> {
        DecFloatPointNumber::parse(s).map(|d| d.to_float())
    }

    pub fn is_zero(&self) -> bool {
        self.mant.is_zero()
    }

    /// -1, 0 or 1
    pub fn sign(&self) -> i8 {
        match self.mant.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            mant: self.mant.abs(),
            exp: self.exp,
        }
    }

    fn plus(&self, rhs: &Self) -> Self {
        if self.is_zero() {
            return rhs.clone();
        }
        if rhs.is_zero() {
            return self.clone();
        }
        let exp = self.exp.min(rhs.exp);
        let a = &self.mant << (self.exp - exp) as usize;
        let b = &rhs.mant << (rhs.exp - exp) as usize;
        Self::normalized(a + b, exp)
    }

    fn minus(&self, rhs: &Self) -> Self {
        self.plus(&rhs.negated())
    }

    fn times(&self, rhs: &Self) -> Self {
        Self::normalized(&self.mant * &rhs.mant, self.exp + rhs.exp)
    }

    fn negated(&self) -> Self {
        Self {
            mant: -&self.mant,
            exp: self.exp,
        }
    }

    /// Quotient truncated to [`FLOAT_PRECISION`] bits of mantissa
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let negative = self.mant.is_negative() != rhs.mant.is_negative();
        let a = self.mant.magnitude();
        let b = rhs.mant.magnitude();

        let shift = (FLOAT_PRECISION as i64 + 2 + b.bits() as i64 - a.bits() as i64).max(0);
        let mut q: BigUint = (a << shift as usize) / b;
        let mut exp = self.exp - rhs.exp - shift;
        let excess = q.bits() as i64 - FLOAT_PRECISION as i64;
        if excess > 0 {
            q >>= excess as usize;
            exp += excess;
        }
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(Self::normalized(BigInt::from_biguint(sign, q), exp))
    }

    pub fn inv(&self) -> Result<Self> {
        Self::from_int(&IntNumber::one()).checked_div(self)
    }

    /// Truncates toward zero
    pub fn to_int(&self) -> IntNumber {
        if self.exp >= 0 {
            return IntNumber(&self.mant << self.exp as usize);
        }
        let magnitude = self.mant.magnitude() >> (-self.exp) as usize;
        IntNumber(BigInt::from_biguint(self.mant.sign(), magnitude))
    }

    /// Decimal value with `prec` fractional digits, rounded half away from zero
    pub fn to_dec_fixed(&self, prec: u8) -> DecFixedPointNumber {
        let scaled = &self.mant * pow10(u32::from(prec));
        if self.exp >= 0 {
            return DecFixedPointNumber::from_mantissa(scaled << self.exp as usize, prec);
        }
        let k = (-self.exp) as usize;
        let magnitude = scaled.magnitude();
        let mut q = magnitude >> k;
        if (magnitude >> (k - 1)).is_odd() {
            q += 1u8;
        }
        DecFixedPointNumber::from_mantissa(BigInt::from_biguint(scaled.sign(), q), prec)
    }

    /// Shortest exact decimal, or rounded to the maximum precision when the binary
    /// fraction has more digits than that
    pub fn to_dec_float(&self) -> DecFloatPointNumber {
        let prec = if self.exp >= 0 {
            0
        } else {
            (-self.exp).min(i64::from(MAX_PRECISION)) as u8
        };
        DecFloatPointNumber::from(self.to_dec_fixed(prec))
    }

    pub fn to_f64(&self) -> f64 {
        let bits = self.mant.bits() as i64;
        let (mant, exp) = if bits > 64 {
            let shift = bits - 64;
            (&self.mant >> shift as usize, self.exp + shift)
        } else {
            (self.mant.clone(), self.exp)
        };
        let m = mant.to_f64().unwrap_or(f64::NAN);
        // split the scaling so subnormal results do not flush to zero early
        let half = exp / 2;
        m * 2f64.powi(half.clamp(-1100, 1100) as i32) * 2f64.powi((exp - half).clamp(-1100, 1100) as i32)
    }
}

impl_arith_ops!(FloatNumber, plus, minus, times, negated);

impl PartialOrd for FloatNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.minus(other).sign().cmp(&0)
    }
}

impl fmt::Display for FloatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dec_float())
    }
}
