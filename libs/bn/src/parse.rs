//! Decimal string scanner shared by the number constructors

use num_bigint::BigInt;
use num_traits::Num;

/// Largest exponent magnitude accepted in scientific notation
const MAX_EXPONENT: i64 = 4096;

/// Exact decimal value `mantissa * 10^-scale`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Decimal {
    pub mantissa: BigInt,
    pub scale: i64,
}

/// Parses `[+-]digits[.digits][(e|E)[+-]digits]`. Returns `None` for anything else.
pub(crate) fn parse_decimal(input: &str) -> Option<Decimal> {
    let s = input.trim();
    let (negative, s) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (number, exponent) = match s.find(['e', 'E']) {
        Some(idx) => {
            let exp_str = &s[idx + 1..];
            let digits = exp_str.strip_prefix(['+', '-']).unwrap_or(exp_str);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let exp: i64 = exp_str.parse().ok()?;
            if exp.abs() > MAX_EXPONENT {
                return None;
            }
            (&s[..idx], exp)
        }
        None => (s, 0),
    };

    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{}{}", int_part, frac_part);
    let mut mantissa = BigInt::from_str_radix(&digits, 10).ok()?;
    if negative {
        mantissa = -mantissa;
    }

    let mut scale = frac_part.len() as i64 - exponent;
    if scale < 0 {
        mantissa *= crate::precision::pow10((-scale) as u32);
        scale = 0;
    }
    Some(Decimal { mantissa, scale })
}

/// Parses a plain integer in decimal or `0x`-prefixed hexadecimal notation.
pub(crate) fn parse_integer(input: &str) -> Option<BigInt> {
    let s = input.trim();
    let (negative, s) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        BigInt::from_str_radix(hex, 16).ok()?
    } else {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        BigInt::from_str_radix(s, 10).ok()?
    };
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(m: i64, scale: i64) -> Option<Decimal> {
        Some(Decimal {
            mantissa: BigInt::from(m),
            scale,
        })
    }

    #[test]
    fn test_plain_and_fractional() {
        assert_eq!(parse_decimal("123"), dec(123, 0));
        assert_eq!(parse_decimal("-1.25"), dec(-125, 2));
        assert_eq!(parse_decimal(".5"), dec(5, 1));
        assert_eq!(parse_decimal("7."), dec(7, 0));
        assert_eq!(parse_decimal("+0.000"), dec(0, 3));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(parse_decimal("1.5e3"), dec(1500, 0));
        assert_eq!(parse_decimal("1.5E-3"), dec(15, 4));
        assert_eq!(parse_decimal("2e+2"), dec(200, 0));
    }

    #[test]
    fn test_rejects_garbage() {
        for input in ["", "-", ".", "abc", "1.2.3", "1e", "1e+", "--1", "1,5", "NaN", "inf", "1e99999"] {
            assert!(parse_decimal(input).is_none(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_integers() {
        assert_eq!(parse_integer("42"), Some(BigInt::from(42)));
        assert_eq!(parse_integer("-0x10"), Some(BigInt::from(-16)));
        assert!(parse_integer("1.0").is_none());
        assert!(parse_integer("0x").is_none());
    }
}
