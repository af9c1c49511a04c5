//! Origin construction from node configuration

use crate::balancer_v2::BalancerV2Origin;
use crate::chain::{ChainClient, Web3ChainClient};
use crate::curve::CurveOrigin;
use crate::error::Result;
use crate::exchange_rate::{ExchangeRateOrigin, ROCKET_POOL, WSTETH};
use crate::origin::Origin;
use crate::retry::RetryPolicy;
use crate::static_origin::StaticOrigin;
use crate::uniswap_v3::UniswapV3Origin;
use node_config::{NodeConfig, OriginConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Build one origin; on-chain origins fail without `client`
pub fn build_origin(
    name: &str,
    config: &OriginConfig,
    client: Option<Arc<dyn ChainClient>>,
    retry: RetryPolicy,
) -> Result<Arc<dyn Origin>> {
    let origin: Arc<dyn Origin> = match config {
        OriginConfig::BalancerV2(options) => Arc::new(BalancerV2Origin::new(name, options, client, retry)?),
        OriginConfig::Curve(options) => Arc::new(CurveOrigin::new(name, options, client, retry)?),
        OriginConfig::UniswapV3(options) => Arc::new(UniswapV3Origin::new(name, options, client, retry)?),
        OriginConfig::RocketPool(options) => {
            Arc::new(ExchangeRateOrigin::new(name, ROCKET_POOL, options, client, retry)?)
        }
        OriginConfig::Wsteth(options) => Arc::new(ExchangeRateOrigin::new(name, WSTETH, options, client, retry)?),
        OriginConfig::Static(options) => Arc::new(StaticOrigin::new(name, options)?),
    };
    info!(origin = name, kind = config.kind(), pairs = config.pairs().len(), "Origin ready");
    Ok(origin)
}

/// JSON-RPC client for the configured node, if any
pub fn connect(config: &NodeConfig) -> Result<Option<Arc<dyn ChainClient>>> {
    match &config.ethereum {
        Some(ethereum) => Ok(Some(Arc::new(Web3ChainClient::new(ethereum)?))),
        None => Ok(None),
    }
}

/// Every configured origin, keyed by name, sharing one chain client
pub fn build_origins(
    config: &NodeConfig,
    client: Option<Arc<dyn ChainClient>>,
) -> Result<HashMap<String, Arc<dyn Origin>>> {
    let retry = RetryPolicy::from_config(&config.retry);
    config
        .origins
        .iter()
        .map(|(name, origin)| Ok((name.clone(), build_origin(name, origin, client.clone(), retry)?)))
        .collect()
}
