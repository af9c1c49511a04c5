//! # Prism Number Library
//!
//! Arbitrary-precision numbers used by the price derivation core.
//!
//! ## Types
//!
//! - [`IntNumber`]: signed arbitrary-precision integer
//! - [`FloatNumber`]: binary floating value (`mantissa * 2^exp`)
//! - [`DecFixedPointNumber`]: integer mantissa scaled by `10^prec`, precision chosen by the caller
//! - [`DecFloatPointNumber`]: decimal number whose precision follows the result of each operation
//!
//! ## Conversion Rules
//!
//! Converting a decimal value to a narrower precision truncates toward zero. The only
//! rounding conversion is binary float to decimal, which rounds half away from zero at
//! the last kept digit. All types are immutable; every operation returns a new value.
//!
//! ```rust
//! use bn::{DecFixedPointNumber, DecFloatPointNumber};
//!
//! let a = DecFixedPointNumber::parse("1.5", 18).unwrap();
//! let b = DecFixedPointNumber::parse("2", 18).unwrap();
//! assert_eq!((&a * &b).to_string(), "3");
//!
//! let x: DecFloatPointNumber = "0.1".parse().unwrap();
//! let y: DecFloatPointNumber = "0.25".parse().unwrap();
//! assert_eq!((&x + &y).to_string(), "0.35");
//! ```

/// Implements `Add`, `Sub`, `Mul` for every owned/borrowed operand combination and `Neg`
/// for owned and borrowed values, forwarding to inherent `fn(&Self, &Self) -> Self` methods.
macro_rules! impl_arith_ops {
    ($t:ty, $add:ident, $sub:ident, $mul:ident, $neg:ident) => {
        impl_arith_ops!(@binop $t, Add, add, $add);
        impl_arith_ops!(@binop $t, Sub, sub, $sub);
        impl_arith_ops!(@binop $t, Mul, mul, $mul);

        impl std::ops::Neg for $t {
            type Output = $t;
            fn neg(self) -> $t {
                <$t>::$neg(&self)
            }
        }

        impl std::ops::Neg for &$t {
            type Output = $t;
            fn neg(self) -> $t {
                <$t>::$neg(self)
            }
        }
    };
    (@binop $t:ty, $trait:ident, $method:ident, $imp:ident) => {
        impl std::ops::$trait<&$t> for &$t {
            type Output = $t;
            fn $method(self, rhs: &$t) -> $t {
                <$t>::$imp(self, rhs)
            }
        }

        impl std::ops::$trait<$t> for $t {
            type Output = $t;
            fn $method(self, rhs: $t) -> $t {
                <$t>::$imp(&self, &rhs)
            }
        }

        impl std::ops::$trait<&$t> for $t {
            type Output = $t;
            fn $method(self, rhs: &$t) -> $t {
                <$t>::$imp(&self, rhs)
            }
        }

        impl std::ops::$trait<$t> for &$t {
            type Output = $t;
            fn $method(self, rhs: $t) -> $t {
                <$t>::$imp(self, &rhs)
            }
        }
    };
}

/// Implements `Serialize`/`Deserialize` through the canonical decimal string.
macro_rules! impl_string_serde {
    ($t:ty, $expecting:expr) => {
        impl serde::Serialize for $t {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $t {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                struct NumberVisitor;

                impl<'de> serde::de::Visitor<'de> for NumberVisitor {
                    type Value = $t;

                    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                        f.write_str($expecting)
                    }

                    fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<$t, E> {
                        v.parse::<$t>().map_err(E::custom)
                    }

                    fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<$t, E> {
                        v.to_string().parse::<$t>().map_err(E::custom)
                    }

                    fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<$t, E> {
                        v.to_string().parse::<$t>().map_err(E::custom)
                    }

                    fn visit_f64<E: serde::de::Error>(self, v: f64) -> std::result::Result<$t, E> {
                        if !v.is_finite() {
                            return Err(E::custom(crate::NumberError::NotFinite));
                        }
                        v.to_string().parse::<$t>().map_err(E::custom)
                    }
                }

                deserializer.deserialize_any(NumberVisitor)
            }
        }
    };
}

pub mod dec_fixed;
pub mod dec_float;
pub mod error;
pub mod float;
pub mod int;
pub mod marshal;
pub mod precision;

mod parse;

pub use dec_fixed::DecFixedPointNumber;
pub use dec_float::DecFloatPointNumber;
pub use error::{NumberError, Result};
pub use float::FloatNumber;
pub use int::IntNumber;
pub use precision::{working_precision, Operation, MAX_PRECISION};
