//! # Prism Origins - Raw Price Sources
//!
//! ## Purpose
//!
//! Turns contract state into raw price points. Every origin answers a batch of pairs
//! with one [`types::Point`] per pair, tagged with the origin name and the block it was
//! read at, or carrying the error that prevented pricing that pair.
//!
//! ## Integration Points
//!
//! - **Input**: an Ethereum JSON-RPC node behind a [`ChainClient`], reads batched
//!   through Multicall3
//! - **Output**: points recorded into origin leaves of the price graph by the updater
//! - **Configuration**: [`node_config::OriginConfig`] entries, built by [`build_origins`]
//!
//! ## Origins
//!
//! - **Balancer V2**: weighted, meta-stable and composable stable pools, priced with the
//!   pool math from the `amm` crate
//! - **Curve**: `get_dy` quotes of stable swap and crypto swap pools
//! - **Uniswap V3**: spot price from `slot0`
//! - **Rocket Pool / wstETH**: liquid staking exchange rates
//! - **Static**: fixed prices from configuration
//!
//! On-chain origins average the prices read at each configured block offset below the
//! latest block. Chain reads are retried per [`RetryPolicy`] and bounded by a
//! [`FetchContext`].

pub mod addresses;
pub mod balancer_v2;
pub mod builder;
pub mod chain;
pub mod context;
pub mod contracts;
pub mod curve;
pub mod error;
pub mod exchange_rate;
pub mod origin;
pub mod retry;
pub mod samples;
pub mod static_origin;
pub mod tokens;
pub mod uniswap_v3;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use addresses::{ContractAddresses, Resolved};
pub use balancer_v2::BalancerV2Origin;
pub use builder::{build_origin, build_origins, connect};
pub use chain::{Call, CallResult, ChainClient, Web3ChainClient};
pub use context::{CancelHandle, FetchContext};
pub use curve::CurveOrigin;
pub use error::{OriginError, Result};
pub use exchange_rate::{ExchangeRateOrigin, RateContract, ROCKET_POOL, WSTETH};
pub use origin::Origin;
pub use retry::RetryPolicy;
pub use static_origin::StaticOrigin;
pub use uniswap_v3::UniswapV3Origin;
