//! Decimal number with dynamic precision
//!
//! A [`DecFloatPointNumber`] is a [`DecFixedPointNumber`] whose precision is picked by
//! [`working_precision`] for every operation. Results never carry trailing zeros, so
//! `0.10 + 0.20` is stored as `3` at precision 1.

use crate::dec_fixed::rescale;
use crate::error::{NumberError, Result};
use crate::float::FloatNumber;
use crate::parse::parse_decimal;
use crate::precision::{pow10, working_precision, Operation};
use crate::{DecFixedPointNumber, IntNumber, MAX_PRECISION};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct DecFloatPointNumber {
    x: DecFixedPointNumber,
}

/// Removes trailing decimal zeros from the mantissa, lowering the precision accordingly
fn strip_trailing_zeros(x: DecFixedPointNumber) -> DecFixedPointNumber {
    if x.n.is_zero() {
        return DecFixedPointNumber::zero(0);
    }
    let ten = BigInt::from(10u8);
    let (mut n, mut prec) = (x.n, x.prec);
    while prec > 0 {
        let (q, r) = n.div_rem(&ten);
        if !r.is_zero() {
            break;
        }
        n = q;
        prec -= 1;
    }
    DecFixedPointNumber::from_mantissa(n, prec)
}

impl DecFloatPointNumber {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::from(1i64)
    }

    /// Nearest decimal to the binary value; `None` for NaN or infinities
    pub fn from_f64(value: f64) -> Option<Self> {
        FloatNumber::from_f64(value).map(|f| f.to_dec_float())
    }

    /// Parses a decimal string; digits beyond the maximum precision are truncated
    ///
    /// ```rust
    /// use bn::DecFloatPointNumber;
    ///
    /// let x = DecFloatPointNumber::parse("2.50").unwrap();
    /// assert_eq!(x.precision(), 1);
    /// assert!(DecFloatPointNumber::parse("two").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let decimal = parse_decimal(s)?;
        let max = i64::from(MAX_PRECISION);
        let x = if decimal.scale > max {
            DecFixedPointNumber::from_mantissa(
                decimal.mantissa / pow10((decimal.scale - max) as u32),
                MAX_PRECISION,
            )
        } else {
            DecFixedPointNumber::from_mantissa(decimal.mantissa, decimal.scale as u8)
        };
        Some(Self::from(x))
    }

    pub fn precision(&self) -> u8 {
        self.x.prec
    }

    /// Value truncated to at most `prec` fractional digits
    pub fn set_precision(&self, prec: u8) -> Self {
        if prec >= self.x.prec {
            return self.clone();
        }
        Self::from(self.x.set_precision(prec))
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.x.is_negative()
    }

    /// -1, 0 or 1
    pub fn sign(&self) -> i8 {
        self.x.sign()
    }

    pub fn abs(&self) -> Self {
        Self { x: self.x.abs() }
    }

    fn plus(&self, rhs: &Self) -> Self {
        let prec = working_precision(Operation::Add, self.x.prec, rhs.x.prec);
        let n = rescale(&self.x.n, self.x.prec, prec) + rescale(&rhs.x.n, rhs.x.prec, prec);
        Self::from(DecFixedPointNumber::from_mantissa(n, prec))
    }

    fn minus(&self, rhs: &Self) -> Self {
        let prec = working_precision(Operation::Sub, self.x.prec, rhs.x.prec);
        let n = rescale(&self.x.n, self.x.prec, prec) - rescale(&rhs.x.n, rhs.x.prec, prec);
        Self::from(DecFixedPointNumber::from_mantissa(n, prec))
    }

    fn times(&self, rhs: &Self) -> Self {
        let exact = self.x.prec.checked_add(rhs.x.prec);
        let prec = working_precision(Operation::Mul, self.x.prec, rhs.x.prec);
        let product = &self.x.n * &rhs.x.n;
        let n = match exact {
            Some(_) => product,
            None => {
                let full = u32::from(self.x.prec) + u32::from(rhs.x.prec);
                product / pow10(full - u32::from(prec))
            }
        };
        Self::from(DecFixedPointNumber::from_mantissa(n, prec))
    }

    fn negated(&self) -> Self {
        Self { x: self.x.negated() }
    }

    /// Quotient truncated at the division working precision
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.x.n.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        let prec = working_precision(Operation::Div, self.x.prec, rhs.x.prec);
        // x.n / 10^p1 / (y.n / 10^p2) * 10^prec
        let shift = u32::from(prec) + u32::from(rhs.x.prec) - u32::from(self.x.prec);
        let n = (&self.x.n * pow10(shift)) / &rhs.x.n;
        Ok(Self::from(DecFixedPointNumber::from_mantissa(n, prec)))
    }

    /// `1 / self`
    pub fn inv(&self) -> Result<Self> {
        Self::one().checked_div(self)
    }

    pub fn to_int(&self) -> IntNumber {
        self.x.to_int()
    }

    pub fn to_float(&self) -> FloatNumber {
        self.x.to_float()
    }

    /// Value at exactly `prec` digits, truncating
    pub fn to_dec_fixed(&self, prec: u8) -> DecFixedPointNumber {
        self.x.set_precision(prec)
    }

    pub fn as_dec_fixed(&self) -> &DecFixedPointNumber {
        &self.x
    }

    pub(crate) fn into_dec_fixed(self) -> DecFixedPointNumber {
        self.x
    }

    pub fn to_f64(&self) -> f64 {
        self.x.to_f64()
    }
}

impl_arith_ops!(DecFloatPointNumber, plus, minus, times, negated);
impl_string_serde!(DecFloatPointNumber, "a decimal number as string or number");

impl From<DecFixedPointNumber> for DecFloatPointNumber {
    fn from(value: DecFixedPointNumber) -> Self {
        Self {
            x: strip_trailing_zeros(value),
        }
    }
}

impl From<IntNumber> for DecFloatPointNumber {
    fn from(value: IntNumber) -> Self {
        value.to_dec_float()
    }
}

impl From<i64> for DecFloatPointNumber {
    fn from(value: i64) -> Self {
        Self::from(DecFixedPointNumber::from_i64(value, 0))
    }
}

impl From<u64> for DecFloatPointNumber {
    fn from(value: u64) -> Self {
        Self::from(DecFixedPointNumber::from_u64(value, 0))
    }
}

impl FromStr for DecFloatPointNumber {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| NumberError::InvalidString { input: s.to_string() })
    }
}

impl fmt::Display for DecFloatPointNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.x, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn df(s: &str) -> DecFloatPointNumber {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_is_exact_and_stripped() {
        let sum = df("0.10") + df("0.20");
        assert_eq!(sum.to_string(), "0.3");
        assert_eq!(sum.precision(), 1);
        assert_eq!((df("1.5") + df("1.5")).precision(), 0);
    }

    #[test]
    fn test_mul_is_exact() {
        let product = df("1.25") * df("0.004");
        assert_eq!(product.to_string(), "0.005");
        assert_eq!(product.precision(), 3);
    }

    #[test]
    fn test_mul_caps_at_max_precision() {
        // (1 + 3e-200) * (1 + 7e-100) needs 300 digits; the 3e-300 term is cut
        let a = DecFixedPointNumber::from_mantissa(pow10(200) + BigInt::from(3), 200);
        let b = DecFixedPointNumber::from_mantissa(pow10(100) + BigInt::from(7), 100);
        let product = DecFloatPointNumber::from(a) * DecFloatPointNumber::from(b);
        let expected = pow10(200) + BigInt::from(7) * pow10(100) + BigInt::from(3);
        assert_eq!(product.precision(), 200);
        assert_eq!(product.as_dec_fixed().mantissa_ref(), &expected);
    }

    #[test]
    fn test_div_uses_extra_digits() {
        let third = df("1").checked_div(&df("3")).unwrap();
        assert_eq!(third.to_string(), "0.333333333333333333");
        assert_eq!(df("10").checked_div(&df("4")).unwrap().to_string(), "2.5");
        assert_eq!(df("1").checked_div(&df("0")), Err(NumberError::DivisionByZero));
    }

    #[test]
    fn test_inv() {
        assert_eq!(df("0.5").inv().unwrap(), df("2"));
        assert_eq!(df("0").inv(), Err(NumberError::DivisionByZero));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(df("1e-3").to_string(), "0.001");
        assert_eq!(df("-2.50E2").to_string(), "-250");
        assert!(DecFloatPointNumber::parse("1..0").is_none());
        assert!("".parse::<DecFloatPointNumber>().is_err());
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(DecFloatPointNumber::from_f64(0.25).unwrap(), df("0.25"));
        assert!(DecFloatPointNumber::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn test_ordering_and_min_max() {
        let a = df("-1");
        let b = df("0.0001");
        assert!(a < b);
        assert_eq!(a.clone().min(b.clone()), a);
        assert_eq!(a.clone().max(b.clone()), b);
    }

    #[test]
    fn test_set_precision_truncates() {
        assert_eq!(df("2.71828").set_precision(2).to_string(), "2.71");
        assert_eq!(df("2.5").set_precision(10), df("2.5"));
    }
}
