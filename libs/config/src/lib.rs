//! # Prism Node Configuration
//!
//! Loads the node configuration from a TOML file, overlays `PRISM__`-prefixed
//! environment variables and validates the result before any origin or model is built.
//!
//! ## Layout
//!
//! ```toml
//! [node]
//! log_level = "info"
//!
//! [ethereum]
//! rpc_url = "${ETH_RPC_URL}"
//!
//! [origins.pegs]
//! type = "static"
//! prices = [{ pair = "USDC/USD", price = "1" }]
//!
//! [[models]]
//! name = "USDC/USD"
//! node = { type = "origin", origin = "pegs", pair = "USDC/USD" }
//! ```
//!
//! Nested keys can be overridden from the environment with a `__` separator, e.g.
//! `PRISM__UPDATER__MAX_CONCURRENCY=4`. Map keys such as origin names are read
//! lowercase.

pub mod models;
pub mod node_config;
pub mod origins;

pub use models::{ModelConfig, ModelNode};
pub use node_config::{
    EthereumConfig, LogFormat, NodeConfig, NodeSettings, RetryConfig, UpdaterConfig, ValidationError,
};
pub use origins::{
    BalancerPoolConfig, BalancerV2Config, ContractConfig, CurvePoolConfig, CurvePoolKind, CurveConfig,
    ContractOriginConfig, OriginConfig, StaticConfig, StaticPrice,
};
