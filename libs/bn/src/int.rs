//! Arbitrary-precision signed integer

use crate::error::{NumberError, Result};
use crate::float::FloatNumber;
use crate::precision::pow10;
use crate::{DecFixedPointNumber, DecFloatPointNumber};
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use std::fmt;
use std::str::FromStr;

/// Signed integer of unbounded size
///
/// Integer division truncates toward zero and the remainder takes the sign of the
/// dividend, which is how on-chain `int256`/`uint256` arithmetic behaves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IntNumber(pub(crate) BigInt);

impl IntNumber {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn one() -> Self {
        Self(BigInt::from(1u8))
    }

    /// Wraps an existing big integer
    pub fn from_big(value: BigInt) -> Self {
        Self(value)
    }

    /// Truncates a finite float toward zero; `None` for NaN or infinities
    pub fn from_f64(value: f64) -> Option<Self> {
        FloatNumber::from_f64(value).map(|f| f.to_int())
    }

    /// Big-endian unsigned magnitude, as returned by ABI `uint` words
    pub fn from_unsigned_bytes_be(bytes: &[u8]) -> Self {
        Self(BigInt::from_bytes_be(Sign::Plus, bytes))
    }

    /// Big-endian two's-complement bytes, as returned by ABI `int` words
    pub fn from_signed_bytes_be(bytes: &[u8]) -> Self {
        Self(BigInt::from_signed_bytes_be(bytes))
    }

    /// `10^exp`
    pub fn pow10(exp: u32) -> Self {
        Self(pow10(exp))
    }

    pub fn as_big(&self) -> &BigInt {
        &self.0
    }

    pub fn into_big(self) -> BigInt {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// -1, 0 or 1
    pub fn sign(&self) -> i8 {
        match self.0.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Number of bits in the magnitude
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    pub(crate) fn plus(&self, rhs: &Self) -> Self {
        Self(&self.0 + &rhs.0)
    }

    pub(crate) fn minus(&self, rhs: &Self) -> Self {
        Self(&self.0 - &rhs.0)
    }

    pub(crate) fn times(&self, rhs: &Self) -> Self {
        Self(&self.0 * &rhs.0)
    }

    pub(crate) fn negated(&self) -> Self {
        Self(-&self.0)
    }

    /// Quotient truncated toward zero
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.0.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        Ok(Self(&self.0 / &rhs.0))
    }

    /// Remainder with the sign of the dividend
    pub fn checked_rem(&self, rhs: &Self) -> Result<Self> {
        if rhs.0.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        Ok(Self(&self.0 % &rhs.0))
    }

    pub fn pow(&self, exp: u32) -> Self {
        Self(self.0.pow(exp))
    }

    /// Floor of the square root
    pub fn sqrt(&self) -> Result<Self> {
        if self.0.is_negative() {
            return Err(NumberError::NegativeSqrt {
                value: self.to_string(),
            });
        }
        Ok(Self(self.0.sqrt()))
    }

    pub fn shl(&self, bits: usize) -> Self {
        Self(&self.0 << bits)
    }

    /// Arithmetic right shift (rounds toward negative infinity)
    pub fn shr(&self, bits: usize) -> Self {
        Self(&self.0 >> bits)
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    pub fn to_u32(&self) -> Option<u32> {
        self.0.to_u32()
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    pub fn to_float(&self) -> FloatNumber {
        FloatNumber::from_int(self)
    }

    /// Exact conversion to a decimal with `prec` fractional digits
    pub fn to_dec_fixed(&self, prec: u8) -> DecFixedPointNumber {
        DecFixedPointNumber::from_mantissa(&self.0 * pow10(u32::from(prec)), prec)
    }

    pub fn to_dec_float(&self) -> DecFloatPointNumber {
        DecFloatPointNumber::from(self.to_dec_fixed(0))
    }
}

impl_arith_ops!(IntNumber, plus, minus, times, negated);
impl_string_serde!(IntNumber, "an integer as string or number");

impl fmt::Display for IntNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IntNumber {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self> {
        crate::parse::parse_integer(s)
            .map(Self)
            .ok_or_else(|| NumberError::InvalidString { input: s.to_string() })
    }
}

impl From<BigInt> for IntNumber {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

macro_rules! int_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for IntNumber {
                fn from(value: $t) -> Self {
                    Self(BigInt::from(value))
                }
            }
        )*
    };
}

int_from_primitive!(i32, i64, i128, u8, u32, u64, u128, usize);
