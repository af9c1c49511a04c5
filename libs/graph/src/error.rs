//! Graph construction and ingestion errors

use thiserror::Error;
use types::Pair;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("{node} node requires {expected} children, got {got}")]
    InvalidChildCount {
        node: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Median node needs min_values >= 1")]
    InvalidMinValues,

    #[error("Point for {got} cannot be recorded on the {expected} leaf")]
    PairMismatch { expected: Pair, got: Pair },

    #[error("Point for {pair} at {time} is older than the recorded one")]
    OlderPoint { pair: Pair, time: String },

    #[error("Error for {pair} not recorded over an unexpired point: {message}")]
    ErrorOverValidPoint { pair: Pair, message: String },
}

pub type Result<T> = std::result::Result<T, GraphError>;
