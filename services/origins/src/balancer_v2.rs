//! Balancer V2 pools
//!
//! Prices are exact swap quotes: the quote-token amount the vault would pay out for one
//! whole unit of the base token, computed off-chain with the pool's own math from state
//! read in a single aggregated batch per block.

use crate::addresses::ContractAddresses;
use crate::chain::{format_address, parse_address, Call, CallResult, ChainClient};
use crate::context::FetchContext;
use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use crate::origin::Origin;
use crate::retry::RetryPolicy;
use crate::samples::{ratio, target_blocks, Samples};
use crate::tokens::{position, TokenCache, TokenInfo};
use amm::{
    ComposableStablePool, LastJoinExit, Pool, PoolKind, StablePool, TokenRateCache, WeightedPool,
};
use async_trait::async_trait;
use bn::{DecFixedPointNumber, IntNumber};
use dashmap::DashMap;
use ethabi::{Address, Token, Uint};
use node_config::BalancerV2Config;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};
use types::{Pair, Point, PointError};

/// Mainnet vault
pub const DEFAULT_VAULT: &str = "0xBA12222222228d8Ba445958a75a0704d566BF2C8";

const PROTOCOL_FEE_SWAP: u64 = 0;
const PROTOCOL_FEE_YIELD: u64 = 2;

/// Registration data of a pool; fixed once the pool is deployed
#[derive(Debug, Clone)]
struct PoolMetadata {
    pool_id: [u8; 32],
    tokens: Vec<TokenInfo>,
    bpt_index: Option<usize>,
}

/// Pool state at one block
enum PoolState {
    Weighted(WeightedPool),
    Stable(StablePool),
    ComposableStable(ComposableStablePool),
}

impl PoolState {
    fn as_pool(&self) -> &dyn Pool {
        match self {
            Self::Weighted(pool) => pool,
            Self::Stable(pool) => pool,
            Self::ComposableStable(pool) => pool,
        }
    }
}

/// Calls of one pool inside a block batch
struct PoolQuery {
    address: Address,
    kind: PoolKind,
    calls: Range<usize>,
}

pub struct BalancerV2Origin {
    name: String,
    client: Arc<dyn ChainClient>,
    retry: RetryPolicy,
    vault: Address,
    block_offsets: Vec<u64>,
    pools: ContractAddresses<PoolKind>,
    metadata: DashMap<Address, PoolMetadata>,
    tokens: TokenCache,
}

impl BalancerV2Origin {
    pub fn new(
        name: impl Into<String>,
        config: &BalancerV2Config,
        client: Option<Arc<dyn ChainClient>>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let name = name.into();
        let client = client.ok_or_else(|| OriginError::MissingChainClient { origin: name.clone() })?;
        if config.block_offsets.is_empty() {
            return Err(OriginError::Configuration(format!("{name}: block_offsets is empty")));
        }

        let mut pools = ContractAddresses::new();
        for pool in &config.pools {
            pools.insert(pool.pair.clone(), &pool.address, pool.inverted, pool.kind)?;
        }

        Ok(Self {
            vault: parse_address(config.vault.as_deref().unwrap_or(DEFAULT_VAULT))?,
            name,
            client,
            retry,
            block_offsets: config.block_offsets.clone(),
            pools,
            metadata: DashMap::new(),
            tokens: TokenCache::new(),
        })
    }

    async fn call_batch(&self, ctx: &FetchContext, operation: &str, calls: &[Call], block: u64) -> Result<Vec<CallResult>> {
        self.retry
            .run(ctx, operation, || self.client.call_batch(calls, block))
            .await
    }

    /// Load pool ids, registered tokens and BPT indices of pools not seen before
    ///
    /// A pool whose registration cannot be read is returned with its error and left
    /// uncached; only a failed batch fails the whole load.
    async fn load_metadata(
        &self,
        ctx: &FetchContext,
        pools: &[(Address, PoolKind)],
        block: u64,
    ) -> Result<HashMap<Address, OriginError>> {
        let mut failed = HashMap::new();
        let missing: Vec<(Address, PoolKind)> = pools
            .iter()
            .filter(|(address, _)| !self.metadata.contains_key(address))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(failed);
        }
        debug!(origin = %self.name, pools = missing.len(), "Loading Balancer pool metadata");

        let id_calls = missing
            .iter()
            .map(|(address, _)| Call::new(*address, ContractKind::BalancerPool, "getPoolId", &[]))
            .collect::<Result<Vec<_>>>()?;
        let id_results = self.call_batch(ctx, "balancer_pool_ids", &id_calls, block).await?;

        let mut registered = Vec::with_capacity(missing.len());
        for ((address, kind), result) in missing.iter().zip(&id_results) {
            let pool_id = result
                .decode(address, ContractKind::BalancerPool, "getPoolId")
                .and_then(|tokens| contracts::as_bytes32(contracts::output(&tokens, 0)?));
            match pool_id {
                Ok(pool_id) => registered.push((*address, *kind, pool_id)),
                Err(err) => {
                    warn!(origin = %self.name, pool = %format_address(address), error = %err, "Balancer pool id unreadable");
                    failed.insert(*address, err);
                }
            }
        }
        if registered.is_empty() {
            return Ok(failed);
        }

        let mut calls = Vec::with_capacity(registered.len() * 2);
        for (address, _, pool_id) in &registered {
            calls.push(Call::new(
                self.vault,
                ContractKind::BalancerVault,
                "getPoolTokens",
                &[Token::FixedBytes(pool_id.to_vec())],
            )?);
            calls.push(Call::new(*address, ContractKind::BalancerPool, "getBptIndex", &[])?);
        }
        let results = self.call_batch(ctx, "balancer_pool_tokens", &calls, block).await?;

        for ((address, kind, pool_id), chunk) in registered.iter().zip(results.chunks(2)) {
            match self.register(ctx, address, *kind, *pool_id, chunk, block).await {
                Ok(metadata) => {
                    self.metadata.insert(*address, metadata);
                }
                Err(err) => {
                    warn!(origin = %self.name, pool = %format_address(address), error = %err, "Balancer pool tokens unreadable");
                    failed.insert(*address, err);
                }
            }
        }
        Ok(failed)
    }

    /// Metadata of one pool from its `getPoolTokens` and `getBptIndex` results
    async fn register(
        &self,
        ctx: &FetchContext,
        address: &Address,
        kind: PoolKind,
        pool_id: [u8; 32],
        results: &[CallResult],
        block: u64,
    ) -> Result<PoolMetadata> {
        let [pool_tokens, bpt_index] = results else {
            return Err(OriginError::Abi("pool token batch truncated".into()));
        };
        let pool_tokens = pool_tokens.decode(&self.vault, ContractKind::BalancerVault, "getPoolTokens")?;
        let addresses = contracts::as_array(contracts::output(&pool_tokens, 0)?)?
            .iter()
            .map(contracts::as_address)
            .collect::<Result<Vec<_>>>()?;

        let bpt_index = match kind {
            PoolKind::ComposableStable => {
                let index = bpt_index.decode(address, ContractKind::BalancerPool, "getBptIndex")?;
                Some(contracts::as_usize(contracts::output(&index, 0)?)?)
            }
            _ => None,
        };

        let tokens = self
            .tokens
            .resolve(self.client.as_ref(), &self.retry, ctx, &addresses, block)
            .await?;
        Ok(PoolMetadata {
            pool_id,
            tokens,
            bpt_index,
        })
    }

    fn metadata(&self, address: &Address) -> Result<PoolMetadata> {
        self.metadata
            .get(address)
            .map(|entry| entry.clone())
            .ok_or_else(|| OriginError::InvalidResponse {
                target: format_address(address),
                reason: "pool metadata not loaded".into(),
            })
    }

    fn state_calls(&self, address: Address, kind: PoolKind, metadata: &PoolMetadata) -> Result<Vec<Call>> {
        let pool = |function: &str, args: &[Token]| Call::new(address, ContractKind::BalancerPool, function, args);
        let mut calls = vec![
            Call::new(
                self.vault,
                ContractKind::BalancerVault,
                "getPoolTokens",
                &[Token::FixedBytes(metadata.pool_id.to_vec())],
            )?,
            pool("getSwapFeePercentage", &[])?,
            pool("getScalingFactors", &[])?,
        ];
        match kind {
            PoolKind::Weighted => calls.push(pool("getNormalizedWeights", &[])?),
            PoolKind::Stable => calls.push(pool("getAmplificationParameter", &[])?),
            PoolKind::ComposableStable => {
                calls.push(pool("getAmplificationParameter", &[])?);
                calls.push(pool("totalSupply", &[])?);
                calls.push(pool("getLastJoinExitData", &[])?);
                calls.push(pool("getProtocolFeePercentageCache", &[Token::Uint(Uint::from(PROTOCOL_FEE_SWAP))])?);
                calls.push(pool("getProtocolFeePercentageCache", &[Token::Uint(Uint::from(PROTOCOL_FEE_YIELD))])?);
                for (index, token) in metadata.tokens.iter().enumerate() {
                    if Some(index) == metadata.bpt_index {
                        continue;
                    }
                    calls.push(pool("getTokenRateCache", &[Token::Address(token.address)])?);
                    calls.push(pool("isTokenExemptFromYieldProtocolFee", &[Token::Address(token.address)])?);
                }
            }
        }
        Ok(calls)
    }

    fn decode_state(&self, address: &Address, kind: PoolKind, metadata: &PoolMetadata, results: &[CallResult]) -> Result<PoolState> {
        let pool_value = |index: usize, function: &str| -> Result<Vec<Token>> {
            results
                .get(index)
                .ok_or_else(|| OriginError::Abi(format!("missing result for {function}")))?
                .decode(address, ContractKind::BalancerPool, function)
        };

        let pool_tokens = results
            .first()
            .ok_or_else(|| OriginError::Abi("missing result for getPoolTokens".into()))?
            .decode(&self.vault, ContractKind::BalancerVault, "getPoolTokens")?;
        let balances = uint_array(contracts::output(&pool_tokens, 1)?)?;
        let swap_fee_percentage = fixed(contracts::as_uint(contracts::output(&pool_value(1, "getSwapFeePercentage")?, 0)?)?);
        let scaling_factors = uint_array(contracts::output(&pool_value(2, "getScalingFactors")?, 0)?)?
            .into_iter()
            .map(fixed)
            .collect::<Vec<_>>();

        let state = match kind {
            PoolKind::Weighted => {
                let weights = uint_array(contracts::output(&pool_value(3, "getNormalizedWeights")?, 0)?)?;
                PoolState::Weighted(WeightedPool {
                    balances,
                    normalized_weights: weights.into_iter().map(fixed).collect(),
                    scaling_factors,
                    swap_fee_percentage,
                })
            }
            PoolKind::Stable => PoolState::Stable(StablePool {
                balances,
                scaling_factors,
                amplification: contracts::as_uint(contracts::output(&pool_value(3, "getAmplificationParameter")?, 0)?)?,
                swap_fee_percentage,
            }),
            PoolKind::ComposableStable => {
                let bpt_index = metadata.bpt_index.ok_or_else(|| OriginError::InvalidResponse {
                    target: format_address(address),
                    reason: "composable stable pool without BPT index".into(),
                })?;
                let amplification = contracts::as_uint(contracts::output(&pool_value(3, "getAmplificationParameter")?, 0)?)?;
                let total_supply = contracts::as_uint(contracts::output(&pool_value(4, "totalSupply")?, 0)?)?;
                let last = pool_value(5, "getLastJoinExitData")?;
                let protocol_swap = contracts::as_uint(contracts::output(&pool_value(6, "getProtocolFeePercentageCache")?, 0)?)?;
                let protocol_yield = contracts::as_uint(contracts::output(&pool_value(7, "getProtocolFeePercentageCache")?, 0)?)?;

                let mut rate_caches = Vec::with_capacity(metadata.tokens.len());
                let mut exempt_from_yield_fee = Vec::with_capacity(metadata.tokens.len());
                let mut next = 8;
                for index in 0..metadata.tokens.len() {
                    if index == bpt_index {
                        rate_caches.push(None);
                        exempt_from_yield_fee.push(false);
                        continue;
                    }
                    let rate_result = results
                        .get(next)
                        .ok_or_else(|| OriginError::Abi("missing result for getTokenRateCache".into()))?;
                    // tokens without a rate provider revert
                    let rate_cache = match rate_result.decode_optional(ContractKind::BalancerPool, "getTokenRateCache")? {
                        Some(values) => Some(TokenRateCache {
                            rate: contracts::as_uint(contracts::output(&values, 0)?)?,
                            old_rate: contracts::as_uint(contracts::output(&values, 1)?)?,
                        }),
                        None => None,
                    };
                    let exempt = contracts::as_bool(contracts::output(
                        &pool_value(next + 1, "isTokenExemptFromYieldProtocolFee")?,
                        0,
                    )?)?;
                    rate_caches.push(rate_cache);
                    exempt_from_yield_fee.push(exempt);
                    next += 2;
                }

                PoolState::ComposableStable(ComposableStablePool {
                    balances,
                    scaling_factors,
                    bpt_index,
                    amplification,
                    swap_fee_percentage,
                    total_supply,
                    rate_caches,
                    exempt_from_yield_fee,
                    last_join_exit: LastJoinExit {
                        amplification: contracts::as_uint(contracts::output(&last, 0)?)?,
                        post_join_exit_invariant: contracts::as_uint(contracts::output(&last, 1)?)?,
                    },
                    protocol_swap_fee_percentage: fixed(protocol_swap),
                    protocol_yield_fee_percentage: fixed(protocol_yield),
                })
            }
        };
        Ok(state)
    }

    /// Quote-token units paid for one whole base token
    fn quote(state: &PoolState, metadata: &PoolMetadata, pair: &Pair) -> std::result::Result<bn::DecFloatPointNumber, PointError> {
        let base = position(&metadata.tokens, &pair.base)
            .ok_or_else(|| PointError::configuration(format!("pool has no {} token", pair.base)))?;
        let quote = position(&metadata.tokens, &pair.quote)
            .ok_or_else(|| PointError::configuration(format!("pool has no {} token", pair.quote)))?;
        let amount_in = IntNumber::pow10(u32::from(metadata.tokens[base].decimals));
        let amount_out = state
            .as_pool()
            .calc_out_given_in(base, quote, &amount_in)
            .map_err(|err| OriginError::from(err).to_point_error())?;
        Ok(ratio(&amount_out, metadata.tokens[quote].decimals))
    }
}

fn fixed(value: IntNumber) -> DecFixedPointNumber {
    DecFixedPointNumber::from_mantissa(value.into_big(), 18)
}

fn uint_array(token: &Token) -> Result<Vec<IntNumber>> {
    contracts::as_array(token)?.iter().map(contracts::as_uint).collect()
}

#[async_trait]
impl Origin for BalancerV2Origin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_data_points(&self, ctx: &FetchContext, pairs: &[Pair]) -> Result<HashMap<Pair, Point>> {
        let mut samples = Samples::new();
        let mut requests: Vec<(Pair, Address, PoolKind)> = Vec::new();
        for pair in pairs {
            match self.pools.resolve(pair) {
                Some(resolved) => requests.push((pair.clone(), resolved.address, resolved.kind)),
                None => samples.fail(pair, PointError::configuration(format!("no Balancer pool configured for {pair}"))),
            }
        }
        if requests.is_empty() {
            return Ok(samples.into_points(&self.name, 0));
        }

        let latest = self
            .retry
            .run(ctx, "block_number", || self.client.block_number())
            .await?;

        let mut pools: Vec<(Address, PoolKind)> = Vec::new();
        for (_, address, kind) in &requests {
            if !pools.iter().any(|(known, _)| known == address) {
                pools.push((*address, *kind));
            }
        }
        let failed = self.load_metadata(ctx, &pools, latest).await?;
        if !failed.is_empty() {
            for (pair, address, _) in &requests {
                if let Some(err) = failed.get(address) {
                    samples.fail(pair, err.to_point_error());
                }
            }
            requests.retain(|(_, address, _)| !failed.contains_key(address));
            pools.retain(|(address, _)| !failed.contains_key(address));
            if pools.is_empty() {
                return Ok(samples.into_points(&self.name, latest));
            }
        }

        let mut queries = Vec::with_capacity(pools.len());
        let mut calls = Vec::new();
        for (address, kind) in &pools {
            let metadata = self.metadata(address)?;
            let start = calls.len();
            calls.extend(self.state_calls(*address, *kind, &metadata)?);
            queries.push(PoolQuery {
                address: *address,
                kind: *kind,
                calls: start..calls.len(),
            });
        }

        for block in target_blocks(latest, &self.block_offsets) {
            let results = match self.call_batch(ctx, "balancer_pool_state", &calls, block).await {
                Ok(results) => results,
                Err(err) => {
                    warn!(origin = %self.name, block, error = %err, "Balancer state batch failed");
                    let err = err.to_point_error();
                    samples.fail_all(requests.iter().map(|(pair, _, _)| pair), &err);
                    continue;
                }
            };

            for query in &queries {
                let metadata = self.metadata(&query.address)?;
                let state = results
                    .get(query.calls.clone())
                    .ok_or_else(|| OriginError::Abi("pool state batch truncated".into()))
                    .and_then(|results| self.decode_state(&query.address, query.kind, &metadata, results));
                for (pair, _, _) in requests.iter().filter(|(_, address, _)| *address == query.address) {
                    let sample = match &state {
                        Ok(state) => Self::quote(state, &metadata, pair),
                        Err(err) => Err(err.to_point_error()),
                    };
                    samples.push(pair, sample);
                }
            }
        }

        Ok(samples.into_points(&self.name, latest))
    }
}
