//! # Prism Provider - Model Evaluation Service
//!
//! ## Purpose
//!
//! Serves named price models. A request for a model first refreshes the stale origin
//! leaves below it through the [`Updater`], then evaluates the model's graph into a
//! single [`types::Point`].
//!
//! ## Integration Points
//!
//! - **Input**: [`node_config::NodeConfig`] origins and models, built by [`build_provider`]
//! - **Sources**: [`origins::Origin`] implementations, fetched in bounded concurrent batches
//! - **Output**: points and description trees for feeds, relays and the `prism-node`
//!   binary
//!
//! ## Architecture Role
//!
//! ```text
//! Provider::data_point("STETH/USD")
//!     ├─ origin_leaves(model)          stale leaves only
//!     ├─ Updater::update               grouped by origin, batched, bounded
//!     │     └─ Origin::fetch_data_points
//!     └─ Node::data_point              synchronous graph evaluation
//! ```

pub mod build;
pub mod error;
pub mod logging;
pub mod provider;
pub mod updater;

pub use build::{build_models, build_provider};
pub use error::{ProviderError, Result};
pub use provider::Provider;
pub use updater::{UpdateSummary, Updater};
