//! Error types for origin fetches

use amm::AmmError;
use bn::NumberError;
use thiserror::Error;
use types::PointError;

/// Result type alias for origin operations
pub type Result<T> = std::result::Result<T, OriginError>;

/// Main error type for origin operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    /// Transport or node failure; the request may succeed when repeated
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The fetch context was cancelled
    #[error("fetch cancelled")]
    Cancelled,

    /// The fetch context deadline passed
    #[error("fetch deadline exceeded")]
    DeadlineExceeded,

    /// Encoding a call or decoding its result failed
    #[error("ABI error: {0}")]
    Abi(String),

    /// Contract call reverted inside an aggregated batch
    #[error("call {function} on {target} reverted")]
    Reverted {
        /// Contract that reverted
        target: String,
        /// Function that was called
        function: String,
    },

    /// Call succeeded but returned something unusable
    #[error("invalid response from {target}: {reason}")]
    InvalidResponse {
        /// Contract that answered
        target: String,
        /// What was wrong with the answer
        reason: String,
    },

    /// Address string that does not parse as 20 hex bytes
    #[error("invalid address {0}")]
    InvalidAddress(String),

    /// On-chain origin built without a chain client
    #[error("origin {origin} reads chain state but has no chain client")]
    MissingChainClient {
        /// Origin name
        origin: String,
    },

    /// Origin options that cannot serve any request
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Pool math rejected the state read from chain
    #[error("pool math error: {0}")]
    Amm(#[from] AmmError),

    /// Numeric failure while converting a raw result
    #[error("number error: {0}")]
    Number(#[from] NumberError),
}

impl OriginError {
    /// Whether repeating the same idempotent read may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    pub fn to_point_error(&self) -> PointError {
        match self {
            Self::Rpc(_) | Self::Cancelled | Self::DeadlineExceeded => PointError::transient(self.to_string()),
            Self::Configuration(_) | Self::InvalidAddress(_) | Self::MissingChainClient { .. } => {
                PointError::configuration(self.to_string())
            }
            Self::Abi(_) | Self::Reverted { .. } | Self::InvalidResponse { .. } | Self::Amm(_) | Self::Number(_) => {
                PointError::domain(self.to_string())
            }
        }
    }
}

impl From<OriginError> for PointError {
    fn from(err: OriginError) -> Self {
        err.to_point_error()
    }
}

impl From<ethabi::Error> for OriginError {
    fn from(err: ethabi::Error) -> Self {
        Self::Abi(err.to_string())
    }
}

impl From<web3::Error> for OriginError {
    fn from(err: web3::Error) -> Self {
        Self::Rpc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ErrorKind;

    #[test]
    fn test_point_error_kinds() {
        assert_eq!(OriginError::Rpc("503".into()).to_point_error().kind, ErrorKind::Transient);
        assert_eq!(OriginError::Cancelled.to_point_error().kind, ErrorKind::Transient);
        assert_eq!(
            OriginError::InvalidAddress("0x12".into()).to_point_error().kind,
            ErrorKind::Configuration
        );
        assert_eq!(
            PointError::from(OriginError::Amm(AmmError::MaxInRatio)).kind,
            ErrorKind::Domain
        );
    }

    #[test]
    fn test_only_rpc_errors_retry() {
        assert!(OriginError::Rpc("timeout".into()).is_retryable());
        assert!(!OriginError::DeadlineExceeded.is_retryable());
        assert!(!OriginError::Reverted {
            target: "0x00".into(),
            function: "slot0".into()
        }
        .is_retryable());
    }
}
