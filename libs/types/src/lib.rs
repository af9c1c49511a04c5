//! # Prism Data-Point Types
//!
//! Shared contract between origins, the price graph and the provider.
//!
//! ## Design Philosophy
//!
//! - **Errors Travel With Data**: a failed observation is still a [`Point`], carrying a
//!   [`PointError`] instead of a value, so one bad pair never aborts its siblings
//! - **Provenance**: derived points keep the points they were computed from in
//!   `sub_points`
//! - **Exact Prices**: prices are [`bn::DecFloatPointNumber`] values, never floats
//!
//! ```rust
//! use types::{Pair, Point, Tick};
//!
//! let pair: Pair = "eth/usd".parse().unwrap();
//! let point = Point::new(Tick::new(pair, "3000.5".parse().unwrap()), chrono::Utc::now());
//! assert_eq!(point.tick().unwrap().pair.to_string(), "ETH/USD");
//! ```

pub mod error;
pub mod pair;
pub mod point;

pub use error::{ErrorKind, PairError, PointError};
pub use pair::Pair;
pub use point::{Meta, Point, Tick, Value};
