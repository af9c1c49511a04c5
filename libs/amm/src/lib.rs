//! # Prism AMM Library - On-Chain Exact Pool Mathematics
//!
//! ## Purpose
//!
//! Off-chain replica of the pricing math deployed in liquidity-pool contracts. Every
//! function reproduces the on-chain integer arithmetic, including its rounding direction,
//! so a quote computed here matches what the contract returns for the same state to the
//! last unit.
//!
//! ## Integration Points
//!
//! - **Input Sources**: pool state read by the on-chain origins (balances, weights,
//!   scaling factors, amplification, rate caches, `sqrtPriceX96`)
//! - **Output Destinations**: origin adapters turning quotes into prices
//! - **Protocol Support**: weighted, stable, meta-stable and composable stable pools;
//!   concentrated liquidity spot prices
//! - **Precision**: 18-decimal fixed point on [`bn::DecFixedPointNumber`], raw `uint256`
//!   values on [`bn::IntNumber`]
//!
//! ## Error Model
//!
//! Domain violations are returned as [`AmmError`] values carrying the on-chain revert
//! code ([`AmmError::code`]). Nothing in this crate panics on bad pool state.
//!
//! ```rust
//! use amm::{Pool, WeightedPool};
//! use bn::{DecFixedPointNumber, IntNumber};
//!
//! let fp = |s: &str| DecFixedPointNumber::parse(s, 18).unwrap();
//! let pool = WeightedPool {
//!     balances: vec![IntNumber::pow10(21), IntNumber::pow10(21)],
//!     normalized_weights: vec![fp("0.5"), fp("0.5")],
//!     scaling_factors: vec![fp("1"), fp("1")],
//!     swap_fee_percentage: fp("0.003"),
//! };
//! let out = pool.calc_out_given_in(0, 1, &IntNumber::pow10(18)).unwrap();
//! assert!(out < IntNumber::pow10(18));
//! ```

pub mod composable_stable_pool;
pub mod concentrated;
pub mod error;
pub mod fixed_point;
pub mod log_exp_math;
pub mod math;
pub mod pool_traits;
pub mod stable_math;
pub mod stable_pool;
pub mod weighted_math;
pub mod weighted_pool;

pub use composable_stable_pool::{ComposableStablePool, LastJoinExit, TokenRateCache};
pub use error::{AmmError, Result};
pub use pool_traits::{scaling_factor_for_decimals, Pool, PoolKind};
pub use stable_pool::StablePool;
pub use weighted_pool::WeightedPool;
