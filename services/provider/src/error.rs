//! Error types for model building and lookup

use graph::GraphError;
use node_config::ValidationError;
use origins::OriginError;
use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No model with this name is registered
    #[error("model not found: {model}")]
    ModelNotFound {
        /// Requested model name
        model: String,
    },

    /// A reference node names a model that is not configured
    #[error("model {model} references unknown model {reference}")]
    UnknownReference {
        /// Model holding the reference
        model: String,
        /// Missing model name
        reference: String,
    },

    /// Models reference each other in a loop
    #[error("reference cycle through model {model}")]
    ReferenceCycle {
        /// Model reached a second time while it was still being built
        model: String,
    },

    /// An origin leaf names an origin that is not configured
    #[error("model {model} uses unknown origin {origin}")]
    UnknownOrigin {
        /// Model holding the leaf
        model: String,
        /// Missing origin name
        origin: String,
    },

    /// A graph node rejected its definition
    #[error("model {model}: {source}")]
    Graph {
        /// Model being built
        model: String,
        /// Node construction failure
        #[source]
        source: GraphError,
    },

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    /// An origin could not be built
    #[error("origin setup failed: {0}")]
    Origin(#[from] OriginError),
}
