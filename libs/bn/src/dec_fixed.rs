//! Decimal number with caller-chosen precision
//!
//! A [`DecFixedPointNumber`] is an integer mantissa `m` and a precision `p` representing
//! `m / 10^p`. Binary operations always produce a result at the receiver's precision:
//!
//! - `add/sub`: the right operand is rescaled to the receiver's precision (truncating)
//! - `mul`: `(x.m * y.m) / 10^y.p`, truncating
//! - `div`: `(x.m * 10^y.p) / y.m`, truncating
//!
//! At precision 18 these are exactly the `mulDown`/`divDown` operations of on-chain
//! fixed-point libraries. [`mul_up`](DecFixedPointNumber::mul_up) and
//! [`div_up`](DecFixedPointNumber::div_up) provide the rounding-up counterparts.

use crate::error::{NumberError, Result};
use crate::float::FloatNumber;
use crate::parse::parse_decimal;
use crate::precision::pow10;
use crate::{DecFloatPointNumber, IntNumber};
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub struct DecFixedPointNumber {
    pub(crate) n: BigInt,
    pub(crate) prec: u8,
}

/// Rescales a mantissa from precision `from` to precision `to`, truncating toward zero
pub(crate) fn rescale(n: &BigInt, from: u8, to: u8) -> BigInt {
    match from.cmp(&to) {
        Ordering::Equal => n.clone(),
        Ordering::Less => n * pow10(u32::from(to - from)),
        Ordering::Greater => n / pow10(u32::from(from - to)),
    }
}

impl DecFixedPointNumber {
    /// Value `mantissa / 10^prec`
    pub fn from_mantissa(mantissa: BigInt, prec: u8) -> Self {
        Self { n: mantissa, prec }
    }

    pub fn zero(prec: u8) -> Self {
        Self::from_mantissa(BigInt::zero(), prec)
    }

    pub fn one(prec: u8) -> Self {
        Self::from_mantissa(pow10(u32::from(prec)), prec)
    }

    pub fn from_int(value: &IntNumber, prec: u8) -> Self {
        value.to_dec_fixed(prec)
    }

    pub fn from_i64(value: i64, prec: u8) -> Self {
        Self::from_mantissa(BigInt::from(value) * pow10(u32::from(prec)), prec)
    }

    pub fn from_u64(value: u64, prec: u8) -> Self {
        Self::from_mantissa(BigInt::from(value) * pow10(u32::from(prec)), prec)
    }

    /// Nearest value at `prec` (half away from zero); `None` for NaN or infinities
    pub fn from_f64(value: f64, prec: u8) -> Option<Self> {
        FloatNumber::from_f64(value).map(|f| f.to_dec_fixed(prec))
    }

    /// Parses a decimal string and truncates it to `prec` digits
    ///
    /// ```rust
    /// use bn::DecFixedPointNumber;
    ///
    /// let x = DecFixedPointNumber::parse("1.239", 2).unwrap();
    /// assert_eq!(x.to_string(), "1.23");
    /// assert!(DecFixedPointNumber::parse("abc", 2).is_none());
    /// ```
    pub fn parse(s: &str, prec: u8) -> Option<Self> {
        let decimal = parse_decimal(s)?;
        let mantissa = if decimal.scale <= i64::from(prec) {
            decimal.mantissa * pow10((i64::from(prec) - decimal.scale) as u32)
        } else {
            decimal.mantissa / pow10((decimal.scale - i64::from(prec)) as u32)
        };
        Some(Self::from_mantissa(mantissa, prec))
    }

    pub fn precision(&self) -> u8 {
        self.prec
    }

    /// Same value at a different precision, truncated when `prec` is smaller
    pub fn set_precision(&self, prec: u8) -> Self {
        Self::from_mantissa(rescale(&self.n, self.prec, prec), prec)
    }

    /// Raw scaled integer
    pub fn mantissa(&self) -> IntNumber {
        IntNumber(self.n.clone())
    }

    pub fn mantissa_ref(&self) -> &BigInt {
        &self.n
    }

    pub fn is_zero(&self) -> bool {
        self.n.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.n.is_negative()
    }

    /// -1, 0 or 1
    pub fn sign(&self) -> i8 {
        match self.n.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn abs(&self) -> Self {
        Self::from_mantissa(self.n.abs(), self.prec)
    }

    pub(crate) fn plus(&self, rhs: &Self) -> Self {
        Self::from_mantissa(&self.n + rescale(&rhs.n, rhs.prec, self.prec), self.prec)
    }

    pub(crate) fn minus(&self, rhs: &Self) -> Self {
        Self::from_mantissa(&self.n - rescale(&rhs.n, rhs.prec, self.prec), self.prec)
    }

    pub(crate) fn times(&self, rhs: &Self) -> Self {
        Self::from_mantissa((&self.n * &rhs.n) / pow10(u32::from(rhs.prec)), self.prec)
    }

    pub(crate) fn negated(&self) -> Self {
        Self::from_mantissa(-&self.n, self.prec)
    }

    /// Quotient at the receiver's precision, truncated toward zero
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.n.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        Ok(Self::from_mantissa(
            (&self.n * pow10(u32::from(rhs.prec))) / &rhs.n,
            self.prec,
        ))
    }

    /// `1 / self` at the receiver's precision
    pub fn inv(&self) -> Result<Self> {
        Self::one(self.prec).checked_div(self)
    }

    /// Product rounded toward zero (same as `*`)
    pub fn mul_down(&self, rhs: &Self) -> Self {
        self.times(rhs)
    }

    /// Product rounded away from zero
    pub fn mul_up(&self, rhs: &Self) -> Self {
        let product = &self.n * &rhs.n;
        if product.is_zero() {
            return Self::zero(self.prec);
        }
        let q = (product.abs() - BigInt::one()) / pow10(u32::from(rhs.prec)) + BigInt::one();
        Self::from_mantissa(if product.is_negative() { -q } else { q }, self.prec)
    }

    /// Quotient rounded toward zero (same as [`checked_div`](Self::checked_div))
    pub fn div_down(&self, rhs: &Self) -> Result<Self> {
        self.checked_div(rhs)
    }

    /// Quotient rounded away from zero
    pub fn div_up(&self, rhs: &Self) -> Result<Self> {
        if rhs.n.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        if self.n.is_zero() {
            return Ok(Self::zero(self.prec));
        }
        let negative = self.n.is_negative() != rhs.n.is_negative();
        let inflated = self.n.abs() * pow10(u32::from(rhs.prec));
        let q = (inflated - BigInt::one()) / rhs.n.abs() + BigInt::one();
        Ok(Self::from_mantissa(if negative { -q } else { q }, self.prec))
    }

    /// Integer part, truncated toward zero
    pub fn to_int(&self) -> IntNumber {
        IntNumber(&self.n / pow10(u32::from(self.prec)))
    }

    pub fn to_float(&self) -> FloatNumber {
        let n = FloatNumber::from_int(&IntNumber(self.n.clone()));
        if self.prec == 0 {
            return n;
        }
        let scale = FloatNumber::from_int(&IntNumber(pow10(u32::from(self.prec))));
        n.checked_div(&scale).unwrap_or_default()
    }

    pub fn to_dec_float(&self) -> DecFloatPointNumber {
        DecFloatPointNumber::from(self.clone())
    }

    pub fn to_f64(&self) -> f64 {
        self.to_float().to_f64()
    }

    /// Mantissa of `self` at precision `prec` without truncation, for comparisons
    fn widened(&self, prec: u8) -> BigInt {
        rescale(&self.n, self.prec, prec)
    }
}

impl_arith_ops!(DecFixedPointNumber, plus, minus, times, negated);
impl_string_serde!(DecFixedPointNumber, "a decimal number as string or number");

impl PartialEq for DecFixedPointNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DecFixedPointNumber {}

impl PartialOrd for DecFixedPointNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numeric ordering; `1.0` at precision 1 equals `1.00` at precision 2
impl Ord for DecFixedPointNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let prec = self.prec.max(other.prec);
        self.widened(prec).cmp(&other.widened(prec))
    }
}

impl fmt::Display for DecFixedPointNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.n.magnitude().to_string();
        let prec = usize::from(self.prec);
        let (int_part, frac_part) = if digits.len() > prec {
            let split = digits.len() - prec;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            ("0".to_string(), format!("{}{}", "0".repeat(prec - digits.len()), digits))
        };
        let frac_part = frac_part.trim_end_matches('0');
        if self.n.is_negative() {
            f.write_str("-")?;
        }
        if frac_part.is_empty() {
            write!(f, "{}", int_part)
        } else {
            write!(f, "{}.{}", int_part, frac_part)
        }
    }
}

/// Parses at the precision the string itself carries (`"1.50"` has precision 2)
impl FromStr for DecFixedPointNumber {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NumberError::InvalidString { input: s.to_string() };
        let decimal = parse_decimal(s).ok_or_else(invalid)?;
        let prec = u8::try_from(decimal.scale).map_err(|_| invalid())?;
        Ok(Self::from_mantissa(decimal.mantissa, prec))
    }
}

impl From<DecFloatPointNumber> for DecFixedPointNumber {
    fn from(value: DecFloatPointNumber) -> Self {
        value.into_dec_fixed()
    }
}
