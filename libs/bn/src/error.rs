//! Error types for number construction, arithmetic and binary decoding

use thiserror::Error;

/// Errors produced by the number types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NumberError {
    /// Divisor is zero
    #[error("Division by zero")]
    DivisionByZero,

    /// String is not a number in any accepted notation
    #[error("Invalid number string: '{input}'")]
    InvalidString { input: String },

    /// NaN or infinite floating-point input
    #[error("Value is not finite")]
    NotFinite,

    /// Square root of a negative value
    #[error("Square root of negative value {value}")]
    NegativeSqrt { value: String },

    /// Binary buffer shorter than the 2-byte header
    #[error("Binary buffer too short: {len} bytes, need at least 2")]
    BufferTooShort { len: usize },

    /// Binary buffer carries an unknown format version
    #[error("Unsupported binary format version {version}")]
    UnsupportedVersion { version: u8 },
}

pub type Result<T> = std::result::Result<T, NumberError>;
