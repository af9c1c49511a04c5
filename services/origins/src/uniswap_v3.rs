//! Uniswap V3 pools
//!
//! Prices are the pool's current spot price from `slot0().sqrtPriceX96`. Each pair is
//! read in its own batches so a slow or failing pool does not hold back the others.

use crate::addresses::ContractAddresses;
use crate::chain::{format_address, Call, CallResult, ChainClient};
use crate::context::FetchContext;
use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use crate::origin::Origin;
use crate::retry::RetryPolicy;
use crate::samples::{target_blocks, Samples};
use crate::tokens::{TokenCache, TokenInfo};
use async_trait::async_trait;
use bn::DecFloatPointNumber;
use dashmap::DashMap;
use ethabi::Address;
use futures::future::join_all;
use node_config::ContractOriginConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use types::{Pair, Point, PointError};

pub struct UniswapV3Origin {
    name: String,
    client: Arc<dyn ChainClient>,
    retry: RetryPolicy,
    block_offsets: Vec<u64>,
    pools: ContractAddresses,
    /// token0 and token1 per pool
    tokens: DashMap<Address, [TokenInfo; 2]>,
    token_cache: TokenCache,
}

impl UniswapV3Origin {
    pub fn new(
        name: impl Into<String>,
        config: &ContractOriginConfig,
        client: Option<Arc<dyn ChainClient>>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let name = name.into();
        let client = client.ok_or_else(|| OriginError::MissingChainClient { origin: name.clone() })?;
        if config.block_offsets.is_empty() {
            return Err(OriginError::Configuration(format!("{name}: block_offsets is empty")));
        }

        let mut pools = ContractAddresses::new();
        for contract in &config.contracts {
            pools.insert(contract.pair.clone(), &contract.address, contract.inverted, ())?;
        }

        Ok(Self {
            name,
            client,
            retry,
            block_offsets: config.block_offsets.clone(),
            pools,
            tokens: DashMap::new(),
            token_cache: TokenCache::new(),
        })
    }

    /// Read token0 and token1 of every pool not seen before
    ///
    /// Pools whose tokens cannot be read are returned with their error and retried on
    /// the next fetch.
    async fn load_tokens(&self, ctx: &FetchContext, pools: &[Address], block: u64) -> Result<HashMap<Address, OriginError>> {
        let mut failed = HashMap::new();
        let missing: Vec<Address> = pools
            .iter()
            .filter(|address| !self.tokens.contains_key(address))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(failed);
        }
        debug!(origin = %self.name, pools = missing.len(), "Loading Uniswap V3 pool tokens");

        let calls = missing
            .iter()
            .flat_map(|address| {
                [
                    Call::new(*address, ContractKind::UniswapV3Pool, "token0", &[]),
                    Call::new(*address, ContractKind::UniswapV3Pool, "token1", &[]),
                ]
            })
            .collect::<Result<Vec<_>>>()?;
        let results = self
            .retry
            .run(ctx, "uniswap_v3_tokens", || self.client.call_batch(&calls, block))
            .await?;

        for (address, chunk) in missing.iter().zip(results.chunks(2)) {
            match self.pool_tokens(ctx, address, chunk, block).await {
                Ok(tokens) => {
                    self.tokens.insert(*address, tokens);
                }
                Err(err) => {
                    warn!(origin = %self.name, pool = %format_address(address), error = %err, "Uniswap V3 pool tokens unreadable");
                    failed.insert(*address, err);
                }
            }
        }
        Ok(failed)
    }

    async fn pool_tokens(&self, ctx: &FetchContext, address: &Address, results: &[CallResult], block: u64) -> Result<[TokenInfo; 2]> {
        let [token0, token1] = results else {
            return Err(OriginError::Abi("pool token batch truncated".into()));
        };
        let token0 = token0.decode(address, ContractKind::UniswapV3Pool, "token0")?;
        let token1 = token1.decode(address, ContractKind::UniswapV3Pool, "token1")?;
        let addresses = [
            contracts::as_address(contracts::output(&token0, 0)?)?,
            contracts::as_address(contracts::output(&token1, 0)?)?,
        ];
        let infos = self
            .token_cache
            .resolve(self.client.as_ref(), &self.retry, ctx, &addresses, block)
            .await?;
        infos.try_into().map_err(|_| OriginError::InvalidResponse {
            target: format_address(address),
            reason: "expected two pool tokens".into(),
        })
    }

    /// Spot price of `pair` at every target block
    async fn fetch_pair(
        &self,
        ctx: &FetchContext,
        pair: &Pair,
        address: Address,
        blocks: &[u64],
    ) -> Vec<std::result::Result<DecFloatPointNumber, PointError>> {
        let Some(tokens) = self.tokens.get(&address).map(|entry| entry.clone()) else {
            return vec![Err(PointError::domain(format!("tokens of {} not loaded", format_address(&address))))];
        };
        let [token0, token1] = &tokens;
        let base_is_token0 = if token0.symbol == pair.base && token1.symbol == pair.quote {
            true
        } else if token1.symbol == pair.base && token0.symbol == pair.quote {
            false
        } else {
            return vec![Err(PointError::configuration(format!(
                "pool trades {}/{}, not {pair}",
                token0.symbol, token1.symbol
            )))];
        };

        let call = match Call::new(address, ContractKind::UniswapV3Pool, "slot0", &[]) {
            Ok(call) => call,
            Err(err) => return vec![Err(err.to_point_error())],
        };
        let calls = [call];

        let mut prices = Vec::with_capacity(blocks.len());
        for block in blocks {
            let sample = self
                .retry
                .run(ctx, "uniswap_v3_slot0", || self.client.call_batch(&calls, *block))
                .await
                .and_then(|results| {
                    let result = results
                        .first()
                        .ok_or_else(|| OriginError::Abi("empty slot0 batch".into()))?;
                    let slot0 = result.decode(&address, ContractKind::UniswapV3Pool, "slot0")?;
                    let sqrt_price = contracts::as_uint(contracts::output(&slot0, 0)?)?;
                    Ok(amm::concentrated::pair_price(
                        &sqrt_price,
                        token0.decimals,
                        token1.decimals,
                        base_is_token0,
                    )?)
                })
                .map_err(|err| {
                    warn!(origin = %self.name, %pair, block, error = %err, "Uniswap V3 read failed");
                    err.to_point_error()
                });
            let failed = sample.is_err();
            prices.push(sample);
            if failed {
                break;
            }
        }
        prices
    }
}

#[async_trait]
impl Origin for UniswapV3Origin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_data_points(&self, ctx: &FetchContext, pairs: &[Pair]) -> Result<HashMap<Pair, Point>> {
        let mut samples = Samples::new();
        let mut requests = Vec::new();
        for pair in pairs {
            match self.pools.resolve(pair) {
                Some(resolved) => requests.push((pair.clone(), resolved.address)),
                None => samples.fail(
                    pair,
                    PointError::configuration(format!("no Uniswap V3 pool configured for {pair}")),
                ),
            }
        }
        if requests.is_empty() {
            return Ok(samples.into_points(&self.name, 0));
        }

        let latest = self
            .retry
            .run(ctx, "block_number", || self.client.block_number())
            .await?;

        let mut pools: Vec<Address> = requests.iter().map(|(_, address)| *address).collect();
        pools.sort();
        pools.dedup();
        let failed = self.load_tokens(ctx, &pools, latest).await?;
        requests.retain(|(pair, address)| match failed.get(address) {
            Some(err) => {
                samples.fail(pair, err.to_point_error());
                false
            }
            None => true,
        });

        let blocks = target_blocks(latest, &self.block_offsets);
        let fetched = join_all(
            requests
                .iter()
                .map(|(pair, address)| self.fetch_pair(ctx, pair, *address, &blocks)),
        )
        .await;

        for ((pair, _), prices) in requests.iter().zip(fetched) {
            for price in prices {
                samples.push(pair, price);
            }
        }
        Ok(samples.into_points(&self.name, latest))
    }
}
