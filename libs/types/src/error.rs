//! Error types for pair parsing and data-point validation
//!
//! [`PointError`] travels inside points, so it is cheap to clone and carries a
//! [`ErrorKind`] that lets consumers tell bad input apart from transient I/O failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing or validating an asset pair
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairError {
    /// Input is not `BASE/QUOTE` with exactly one separator
    #[error("Invalid pair '{input}': expected BASE/QUOTE")]
    InvalidFormat { input: String },

    /// One side of the pair is empty
    #[error("Invalid pair '{input}': base and quote must not be empty")]
    EmptySymbol { input: String },
}

/// Classification of a point failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing dependency, unresolvable pair or inconsistent graph definition
    Configuration,
    /// AMM math or numeric domain violation
    Domain,
    /// RPC failure, timeout or cancellation; a later attempt may succeed
    Transient,
    /// Combining child points failed
    Aggregation,
    /// A point or its value breaks its own contract
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Domain => "domain",
            Self::Transient => "transient",
            Self::Aggregation => "aggregation",
            Self::Validation => "validation",
        }
    }
}

/// Failure recorded on a data point
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PointError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PointError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Domain, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn aggregation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aggregation, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }

    /// Same kind, message prefixed with `context: `
    pub fn context(&self, context: impl std::fmt::Display) -> Self {
        Self::new(self.kind, format!("{context}: {}", self.message))
    }
}

impl From<bn::NumberError> for PointError {
    fn from(err: bn::NumberError) -> Self {
        Self::domain(err.to_string())
    }
}

impl From<PairError> for PointError {
    fn from(err: PairError) -> Self {
        Self::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_error_kinds() {
        let err = PointError::transient("rpc timed out");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "rpc timed out");
        assert_eq!(err.kind.as_str(), "transient");

        let wrapped = err.context("origin balancer");
        assert_eq!(wrapped.kind, ErrorKind::Transient);
        assert_eq!(wrapped.message, "origin balancer: rpc timed out");
    }

    #[test]
    fn test_number_errors_are_domain_errors() {
        let err: PointError = bn::NumberError::DivisionByZero.into();
        assert_eq!(err.kind, ErrorKind::Domain);
    }
}
