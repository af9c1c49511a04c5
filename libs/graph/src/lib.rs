//! # Prism Price Graph
//!
//! ## Purpose
//!
//! Composes raw origin observations into derived prices. Leaves hold the last point an
//! origin reported for one pair; combinators derive cross rates, inversions, medians and
//! guarded values from their children on every evaluation.
//!
//! ## Error Propagation
//!
//! Evaluation never fails as a call: every node returns a [`types::Point`]. A child that
//! fails validation, or yields something other than a tick, turns into an error point
//! for its parent, with the child points kept as `sub_points` for tracing.
//!
//! ## Concurrency
//!
//! Graphs are built once at startup and shared behind `Arc`. The only mutable state is
//! the point stored on each [`OriginNode`], guarded by a `parking_lot::RwLock`, so many
//! readers can evaluate while the updater records new points.

pub mod breaker;
pub mod error;
pub mod indirect;
pub mod invert;
pub mod median;
pub mod node;
pub mod origin;

pub use breaker::DevCircuitBreakerNode;
pub use error::{GraphError, Result};
pub use indirect::{cross_rate, IndirectNode};
pub use invert::InvertNode;
pub use median::MedianNode;
pub use node::{describe, origin_leaves, Node, NodeDescription, ReferenceNode};
pub use origin::OriginNode;
