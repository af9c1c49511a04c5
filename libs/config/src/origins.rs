//! Origin configuration

use amm::PoolKind;
use bn::DecFloatPointNumber;
use serde::{Deserialize, Serialize};
use types::Pair;

fn default_block_offsets() -> Vec<u64> {
    vec![0]
}

/// One configured data origin, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OriginConfig {
    BalancerV2(BalancerV2Config),
    Curve(CurveConfig),
    UniswapV3(ContractOriginConfig),
    RocketPool(ContractOriginConfig),
    Wsteth(ContractOriginConfig),
    Static(StaticConfig),
}

impl OriginConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BalancerV2(_) => "balancer_v2",
            Self::Curve(_) => "curve",
            Self::UniswapV3(_) => "uniswap_v3",
            Self::RocketPool(_) => "rocket_pool",
            Self::Wsteth(_) => "wsteth",
            Self::Static(_) => "static",
        }
    }

    /// Whether the origin reads contract state and needs an Ethereum client
    pub fn is_on_chain(&self) -> bool {
        !matches!(self, Self::Static(_))
    }

    /// Historical block offsets averaged per fetch; empty for off-chain origins
    pub fn block_offsets(&self) -> &[u64] {
        match self {
            Self::BalancerV2(config) => &config.block_offsets,
            Self::Curve(config) => &config.block_offsets,
            Self::UniswapV3(config) | Self::RocketPool(config) | Self::Wsteth(config) => &config.block_offsets,
            Self::Static(_) => &[],
        }
    }

    /// Pairs this origin is configured to serve
    pub fn pairs(&self) -> Vec<Pair> {
        match self {
            Self::BalancerV2(config) => config.pools.iter().map(|pool| pool.pair.clone()).collect(),
            Self::Curve(config) => config.pools.iter().map(|pool| pool.pair.clone()).collect(),
            Self::UniswapV3(config) | Self::RocketPool(config) | Self::Wsteth(config) => {
                config.contracts.iter().map(|contract| contract.pair.clone()).collect()
            }
            Self::Static(config) => config.prices.iter().map(|price| price.pair.clone()).collect(),
        }
    }
}

/// Pair served by a single contract
///
/// With `inverted` set the contract quotes the inverse of `pair`, so the origin also
/// answers requests for `pair.invert()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub pair: Pair,
    pub address: String,
    #[serde(default)]
    pub inverted: bool,
}

/// Origins that read one contract per pair: Uniswap V3 pools, rETH and wstETH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOriginConfig {
    #[serde(default = "default_block_offsets")]
    pub block_offsets: Vec<u64>,
    #[serde(default)]
    pub contracts: Vec<ContractConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancerPoolConfig {
    pub pair: Pair,
    pub address: String,
    pub kind: PoolKind,
    #[serde(default)]
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancerV2Config {
    /// Vault contract; defaults to the mainnet deployment when empty
    #[serde(default)]
    pub vault: Option<String>,
    #[serde(default = "default_block_offsets")]
    pub block_offsets: Vec<u64>,
    #[serde(default)]
    pub pools: Vec<BalancerPoolConfig>,
}

/// Curve pool family, which decides the index type of `get_dy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurvePoolKind {
    StableSwap,
    CryptoSwap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoolConfig {
    pub pair: Pair,
    pub address: String,
    pub kind: CurvePoolKind,
    #[serde(default)]
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    #[serde(default = "default_block_offsets")]
    pub block_offsets: Vec<u64>,
    #[serde(default)]
    pub pools: Vec<CurvePoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPrice {
    pub pair: Pair,
    pub price: DecFloatPointNumber,
}

/// Constant prices, typically pegs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub prices: Vec<StaticPrice>,
}
