//! AMM math errors
//!
//! Variants mirror the revert reasons of the on-chain libraries so a failed quote can be
//! matched against what the pool contract itself would have reported.

use bn::NumberError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("X_OUT_OF_BOUNDS: base must be below 2^255")]
    XOutOfBounds,

    #[error("Y_OUT_OF_BOUNDS: exponent must be below 2^254 / 1e20")]
    YOutOfBounds,

    #[error("PRODUCT_OUT_OF_BOUNDS: ln(x) * y outside the natural exponent range")]
    ProductOutOfBounds,

    #[error("INVALID_EXPONENT: exponent outside [-41, 130]")]
    InvalidExponent,

    #[error("OUT_OF_BOUNDS: logarithm argument must be positive")]
    OutOfBounds,

    #[error("ZERO_DIVISION")]
    ZeroDivision,

    #[error("SUB_OVERFLOW: {a} - {b} underflows")]
    SubOverflow { a: String, b: String },

    #[error("MAX_IN_RATIO: amount in exceeds 30% of the pool balance")]
    MaxInRatio,

    #[error("MAX_OUT_RATIO: amount out exceeds 30% of the pool balance")]
    MaxOutRatio,

    #[error("STABLE_INVARIANT_DIDNT_CONVERGE")]
    StableInvariantDidntConverge,

    #[error("STABLE_GET_BALANCE_DIDNT_CONVERGE")]
    StableGetBalanceDidntConverge,

    #[error("Token index {index} out of range for pool with {len} tokens")]
    InvalidTokenIndex { index: usize, len: usize },

    #[error("Invalid sqrt price {value}: outside [MIN_SQRT_RATIO, MAX_SQRT_RATIO)")]
    InvalidSqrtPrice { value: String },

    #[error("Pool state mismatch: {0}")]
    InvalidPoolState(String),
}

impl AmmError {
    /// Revert-reason style code
    pub fn code(&self) -> &'static str {
        match self {
            Self::XOutOfBounds => "X_OUT_OF_BOUNDS",
            Self::YOutOfBounds => "Y_OUT_OF_BOUNDS",
            Self::ProductOutOfBounds => "PRODUCT_OUT_OF_BOUNDS",
            Self::InvalidExponent => "INVALID_EXPONENT",
            Self::OutOfBounds => "OUT_OF_BOUNDS",
            Self::ZeroDivision => "ZERO_DIVISION",
            Self::SubOverflow { .. } => "SUB_OVERFLOW",
            Self::MaxInRatio => "MAX_IN_RATIO",
            Self::MaxOutRatio => "MAX_OUT_RATIO",
            Self::StableInvariantDidntConverge => "STABLE_INVARIANT_DIDNT_CONVERGE",
            Self::StableGetBalanceDidntConverge => "STABLE_GET_BALANCE_DIDNT_CONVERGE",
            Self::InvalidTokenIndex { .. } => "INVALID_TOKEN",
            Self::InvalidSqrtPrice { .. } => "INVALID_SQRT_PRICE",
            Self::InvalidPoolState(_) => "INVALID_POOL_STATE",
        }
    }
}

impl From<NumberError> for AmmError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::DivisionByZero => Self::ZeroDivision,
            other => Self::InvalidPoolState(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AmmError>;
