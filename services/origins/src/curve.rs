//! Curve stable swap and crypto swap pools
//!
//! Prices come straight from the pool's `get_dy` quote for one whole base token, so the
//! fee and the pool's own invariant are already applied on chain.

use crate::addresses::ContractAddresses;
use crate::chain::{format_address, Call, CallResult, ChainClient};
use crate::context::FetchContext;
use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use crate::origin::Origin;
use crate::retry::RetryPolicy;
use crate::samples::{ratio, target_blocks, Samples};
use crate::tokens::{position, TokenCache, TokenInfo};
use async_trait::async_trait;
use dashmap::DashMap;
use ethabi::{Address, Token, Uint};
use node_config::{CurveConfig, CurvePoolKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use types::{Pair, Point, PointError};

/// Upper bound on coins in a Curve pool
const MAX_COINS: u64 = 8;

fn contract_kind(kind: CurvePoolKind) -> ContractKind {
    match kind {
        CurvePoolKind::StableSwap => ContractKind::CurveStableSwap,
        CurvePoolKind::CryptoSwap => ContractKind::CurveCryptoSwap,
    }
}

/// `get_dy` takes `int128` indices on stable swap pools and `uint256` on crypto pools
fn coin_index(kind: CurvePoolKind, index: usize) -> Token {
    match kind {
        CurvePoolKind::StableSwap => Token::Int(Uint::from(index)),
        CurvePoolKind::CryptoSwap => Token::Uint(Uint::from(index)),
    }
}

/// Coin addresses of one pool from its `coins(i)` results
fn coin_addresses(address: &Address, kind: CurvePoolKind, results: &[CallResult]) -> Result<Vec<Address>> {
    let mut addresses = Vec::new();
    for result in results {
        match result.decode_optional(contract_kind(kind), "coins")? {
            Some(tokens) => addresses.push(contracts::as_address(contracts::output(&tokens, 0)?)?),
            None => break,
        }
    }
    if addresses.len() < 2 {
        return Err(OriginError::InvalidResponse {
            target: format_address(address),
            reason: format!("pool lists {} coins", addresses.len()),
        });
    }
    Ok(addresses)
}

/// A requested pair with the coins it swaps between
struct Quote {
    pair: Pair,
    address: Address,
    kind: CurvePoolKind,
    base: usize,
    quote: usize,
    base_decimals: u8,
    quote_decimals: u8,
}

pub struct CurveOrigin {
    name: String,
    client: Arc<dyn ChainClient>,
    retry: RetryPolicy,
    block_offsets: Vec<u64>,
    pools: ContractAddresses<CurvePoolKind>,
    coins: DashMap<Address, Vec<TokenInfo>>,
    tokens: TokenCache,
}

impl CurveOrigin {
    pub fn new(
        name: impl Into<String>,
        config: &CurveConfig,
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
            name,
            client,
            retry,
            block_offsets: config.block_offsets.clone(),
            pools,
            coins: DashMap::new(),
            tokens: TokenCache::new(),
        })
    }

    async fn call_batch(&self, ctx: &FetchContext, operation: &str, calls: &[Call], block: u64) -> Result<Vec<CallResult>> {
        self.retry
            .run(ctx, operation, || self.client.call_batch(calls, block))
            .await
    }

    /// Read the coin list of every pool not seen before
    ///
    /// Pools do not expose their coin count, so `coins(i)` is read for every possible
    /// index and the list ends at the first revert. Pools whose coins cannot be read
    /// are returned with their error.
    async fn load_coins(
        &self,
        ctx: &FetchContext,
        pools: &[(Address, CurvePoolKind)],
        block: u64,
    ) -> Result<HashMap<Address, OriginError>> {
        let mut failed = HashMap::new();
        let missing: Vec<(Address, CurvePoolKind)> = pools
            .iter()
            .filter(|(address, _)| !self.coins.contains_key(address))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(failed);
        }
        debug!(origin = %self.name, pools = missing.len(), "Loading Curve pool coins");

        let mut calls = Vec::new();
        for (address, kind) in &missing {
            for index in 0..MAX_COINS {
                calls.push(Call::new(
                    *address,
                    contract_kind(*kind),
                    "coins",
                    &[Token::Uint(Uint::from(index))],
                )?);
            }
        }
        let results = self.call_batch(ctx, "curve_coins", &calls, block).await?;

        for ((address, kind), chunk) in missing.iter().zip(results.chunks(MAX_COINS as usize)) {
            let coins = match coin_addresses(address, *kind, chunk) {
                Ok(addresses) => {
                    self.tokens
                        .resolve(self.client.as_ref(), &self.retry, ctx, &addresses, block)
                        .await
                }
                Err(err) => Err(err),
            };
            match coins {
                Ok(coins) => {
                    self.coins.insert(*address, coins);
                }
                Err(err) => {
                    warn!(origin = %self.name, pool = %format_address(address), error = %err, "Curve pool coins unreadable");
                    failed.insert(*address, err);
                }
            }
        }
        Ok(failed)
    }

    fn quote_for(&self, pair: &Pair, address: Address, kind: CurvePoolKind) -> std::result::Result<Quote, PointError> {
        let coins = self
            .coins
            .get(&address)
            .map(|entry| entry.clone())
            .ok_or_else(|| PointError::domain(format!("coins of {} not loaded", format_address(&address))))?;
        let base = position(&coins, &pair.base)
            .ok_or_else(|| PointError::configuration(format!("pool has no {} coin", pair.base)))?;
        let quote = position(&coins, &pair.quote)
            .ok_or_else(|| PointError::configuration(format!("pool has no {} coin", pair.quote)))?;
        Ok(Quote {
            pair: pair.clone(),
            address,
            kind,
            base,
            quote,
            base_decimals: coins[base].decimals,
            quote_decimals: coins[quote].decimals,
        })
    }
}

#[async_trait]
impl Origin for CurveOrigin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_data_points(&self, ctx: &FetchContext, pairs: &[Pair]) -> Result<HashMap<Pair, Point>> {
        let mut samples = Samples::new();
        let mut requests = Vec::new();
        for pair in pairs {
            match self.pools.resolve(pair) {
                Some(resolved) => requests.push((pair.clone(), resolved.address, resolved.kind)),
                None => samples.fail(pair, PointError::configuration(format!("no Curve pool configured for {pair}"))),
            }
        }
        if requests.is_empty() {
            return Ok(samples.into_points(&self.name, 0));
        }

        let latest = self
            .retry
            .run(ctx, "block_number", || self.client.block_number())
            .await?;

        let mut pools: Vec<(Address, CurvePoolKind)> = Vec::new();
        for (_, address, kind) in &requests {
            if !pools.iter().any(|(known, _)| known == address) {
                pools.push((*address, *kind));
            }
        }
        let failed = self.load_coins(ctx, &pools, latest).await?;

        let mut quotes = Vec::with_capacity(requests.len());
        for (pair, address, kind) in &requests {
            if let Some(err) = failed.get(address) {
                samples.fail(pair, err.to_point_error());
                continue;
            }
            match self.quote_for(pair, *address, *kind) {
                Ok(quote) => quotes.push(quote),
                Err(err) => samples.fail(pair, err),
            }
        }
        if quotes.is_empty() {
            return Ok(samples.into_points(&self.name, latest));
        }

        let calls = quotes
            .iter()
            .map(|quote| {
                Call::new(
                    quote.address,
                    contract_kind(quote.kind),
                    "get_dy",
                    &[
                        coin_index(quote.kind, quote.base),
                        coin_index(quote.kind, quote.quote),
                        Token::Uint(Uint::exp10(usize::from(quote.base_decimals))),
                    ],
                )
            })
            .collect::<Result<Vec<_>>>()?;

        for block in target_blocks(latest, &self.block_offsets) {
            let results = match self.call_batch(ctx, "curve_get_dy", &calls, block).await {
                Ok(results) => results,
                Err(err) => {
                    warn!(origin = %self.name, block, error = %err, "Curve quote batch failed");
                    samples.fail_all(quotes.iter().map(|quote| &quote.pair), &err.to_point_error());
                    continue;
                }
            };

            for (quote, result) in quotes.iter().zip(&results) {
                let sample = result
                    .decode(&quote.address, contract_kind(quote.kind), "get_dy")
                    .and_then(|tokens| contracts::as_uint(contracts::output(&tokens, 0)?))
                    .map(|amount| ratio(&amount, quote.quote_decimals))
                    .map_err(|err| err.to_point_error());
                samples.push(&quote.pair, sample);
            }
        }

        Ok(samples.into_points(&self.name, latest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::parse_address;
    use crate::testing::ScriptedChainClient;
    use crate::tokens::NATIVE_ETH_PLACEHOLDER;
    use node_config::CurvePoolConfig;

    const STETH_POOL: &str = "0xDC24316b9AE028F1497c275EB9192a3Ea0f67022";
    const STETH: &str = "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84";

    fn addr(value: &str) -> Address {
        parse_address(value).unwrap()
    }

    fn get_dy(client: &ScriptedChainClient, block: Option<u64>, i: usize, j: usize, dy: &str) {
        let args = [
            Token::Int(Uint::from(i)),
            Token::Int(Uint::from(j)),
            Token::Uint(Uint::exp10(18)),
        ];
        let outputs = [Token::Uint(Uint::from_dec_str(dy).unwrap())];
        match block {
            Some(block) => client
                .respond_at(block, addr(STETH_POOL), ContractKind::CurveStableSwap, "get_dy", &args, &outputs)
                .unwrap(),
            None => client
                .respond(addr(STETH_POOL), ContractKind::CurveStableSwap, "get_dy", &args, &outputs)
                .unwrap(),
        }
    }

    fn steth_pool(block: u64) -> ScriptedChainClient {
        let client = ScriptedChainClient::new(block);
        for (index, coin) in [NATIVE_ETH_PLACEHOLDER, STETH].iter().enumerate() {
            client
                .respond(
                    addr(STETH_POOL),
                    ContractKind::CurveStableSwap,
                    "coins",
                    &[Token::Uint(Uint::from(index))],
                    &[Token::Address(addr(coin))],
                )
                .unwrap();
        }
        client
            .respond(addr(STETH), ContractKind::Erc20, "symbol", &[], &[Token::String("stETH".into())])
            .unwrap();
        client
            .respond(addr(STETH), ContractKind::Erc20, "decimals", &[], &[Token::Uint(Uint::from(18))])
            .unwrap();
        client
    }

    fn origin(client: ScriptedChainClient, block_offsets: Vec<u64>) -> CurveOrigin {
        let config = CurveConfig {
            block_offsets,
            pools: vec![CurvePoolConfig {
                pair: Pair::new("STETH", "ETH"),
                address: STETH_POOL.into(),
                kind: CurvePoolKind::StableSwap,
                inverted: false,
            }],
        };
        CurveOrigin::new("curve", &config, Some(Arc::new(client)), RetryPolicy::none()).unwrap()
    }

    #[tokio::test]
    async fn test_quotes_both_directions() {
        let client = steth_pool(100);
        get_dy(&client, None, 1, 0, "999500000000000000");
        get_dy(&client, None, 0, 1, "1000400000000000000");
        let origin = origin(client, vec![0]);

        let steth_eth = Pair::new("STETH", "ETH");
        let eth_steth = Pair::new("ETH", "STETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[steth_eth.clone(), eth_steth.clone()])
            .await
            .unwrap();

        assert_eq!(points[&steth_eth].tick().unwrap().price, Some("0.9995".parse().unwrap()));
        assert_eq!(points[&eth_steth].tick().unwrap().price, Some("1.0004".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_averages_block_offsets() {
        let client = steth_pool(100);
        get_dy(&client, Some(100), 1, 0, "999000000000000000");
        get_dy(&client, Some(90), 1, 0, "998000000000000000");
        let origin = origin(client, vec![0, 10]);

        let pair = Pair::new("STETH", "ETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[pair.clone()])
            .await
            .unwrap();
        assert_eq!(points[&pair].tick().unwrap().price, Some("0.9985".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_revert_at_one_offset_fails_pair() {
        let client = steth_pool(100);
        get_dy(&client, Some(100), 1, 0, "999000000000000000");
        let origin = origin(client, vec![0, 10]);

        let pair = Pair::new("STETH", "ETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[pair.clone()])
            .await
            .unwrap();
        let error = points[&pair].error.as_ref().unwrap();
        assert!(error.message.contains("get_dy"));
    }

    #[tokio::test]
    async fn test_pool_without_coins_fails_only_its_pairs() {
        const RETH_POOL: &str = "0x0f3159811670c117c372428D4E69AC32325e4D0F";
        let client = steth_pool(100);
        get_dy(&client, None, 1, 0, "999500000000000000");
        let config = CurveConfig {
            block_offsets: vec![0],
            pools: vec![
                CurvePoolConfig {
                    pair: Pair::new("STETH", "ETH"),
                    address: STETH_POOL.into(),
                    kind: CurvePoolKind::StableSwap,
                    inverted: false,
                },
                CurvePoolConfig {
                    pair: Pair::new("RETH", "ETH"),
                    address: RETH_POOL.into(),
                    kind: CurvePoolKind::CryptoSwap,
                    inverted: false,
                },
            ],
        };
        let origin = CurveOrigin::new("curve", &config, Some(Arc::new(client)), RetryPolicy::none()).unwrap();

        let steth_eth = Pair::new("STETH", "ETH");
        let reth_eth = Pair::new("RETH", "ETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[steth_eth.clone(), reth_eth.clone()])
            .await
            .unwrap();

        assert_eq!(points[&steth_eth].tick().unwrap().price, Some("0.9995".parse().unwrap()));
        let error = points[&reth_eth].error.as_ref().unwrap();
        assert_eq!(error.kind, types::ErrorKind::Domain);
        assert!(error.message.contains("pool lists 0 coins"));
    }

    #[tokio::test]
    async fn test_unconfigured_pair() {
        let origin = origin(steth_pool(100), vec![0]);
        let pair = Pair::new("RETH", "ETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[pair.clone()])
            .await
            .unwrap();
        assert_eq!(points[&pair].error.as_ref().unwrap().kind, types::ErrorKind::Configuration);
    }
}
