//! Liquid staking token exchange rates
//!
//! Rocket Pool's rETH and Lido's wstETH expose the amount of underlying per token as an
//! 18 decimal fixed point getter. Both origins read that getter, scale it and invert it
//! for pairs registered the other way around. Rocket Pool reads all pairs in one batch
//! per block; wstETH reads every pair on its own.

use crate::addresses::{ContractAddresses, Resolved};
use crate::chain::{Call, ChainClient};
use crate::context::FetchContext;
use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use crate::origin::Origin;
use crate::retry::RetryPolicy;
use crate::samples::{ratio, target_blocks, Samples};
use async_trait::async_trait;
use bn::DecFloatPointNumber;
use futures::future::join_all;
use node_config::ContractOriginConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use types::{Pair, Point, PointError};

const RATE_DECIMALS: u8 = 18;

/// Rate getter of one token family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateContract {
    pub kind: ContractKind,
    pub function: &'static str,
    /// One batch for all pairs instead of one per pair
    pub shared_batch: bool,
}

/// rETH `getExchangeRate()`, ETH per rETH
pub const ROCKET_POOL: RateContract = RateContract {
    kind: ContractKind::RocketTokenReth,
    function: "getExchangeRate",
    shared_batch: true,
};

/// wstETH `stEthPerToken()`, stETH per wstETH
pub const WSTETH: RateContract = RateContract {
    kind: ContractKind::WstEth,
    function: "stEthPerToken",
    shared_batch: false,
};

pub struct ExchangeRateOrigin {
    name: String,
    contract: RateContract,
    client: Arc<dyn ChainClient>,
    retry: RetryPolicy,
    block_offsets: Vec<u64>,
    contracts: ContractAddresses,
}

impl ExchangeRateOrigin {
    pub fn new(
        name: impl Into<String>,
        contract: RateContract,
        config: &ContractOriginConfig,
        client: Option<Arc<dyn ChainClient>>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let name = name.into();
        let client = client.ok_or_else(|| OriginError::MissingChainClient { origin: name.clone() })?;
        if config.block_offsets.is_empty() {
            return Err(OriginError::Configuration(format!("{name}: block_offsets is empty")));
        }

        let mut contracts = ContractAddresses::new();
        for entry in &config.contracts {
            contracts.insert(entry.pair.clone(), &entry.address, entry.inverted, ())?;
        }

        Ok(Self {
            name,
            contract,
            client,
            retry,
            block_offsets: config.block_offsets.clone(),
            contracts,
        })
    }

    fn call(&self, resolved: &Resolved<()>) -> Result<Call> {
        Call::new(resolved.address, self.contract.kind, self.contract.function, &[])
    }

    fn price(&self, resolved: &Resolved<()>, result: &crate::chain::CallResult) -> Result<DecFloatPointNumber> {
        let tokens = result.decode(&resolved.address, self.contract.kind, self.contract.function)?;
        let rate = ratio(&contracts::as_uint(contracts::output(&tokens, 0)?)?, RATE_DECIMALS);
        if resolved.inverted {
            Ok(rate.inv()?)
        } else {
            Ok(rate)
        }
    }

    /// Read `requests` in one batch at `block`
    async fn read(
        &self,
        ctx: &FetchContext,
        requests: &[(Pair, Resolved<()>)],
        block: u64,
    ) -> Vec<std::result::Result<DecFloatPointNumber, PointError>> {
        let calls = match requests.iter().map(|(_, resolved)| self.call(resolved)).collect::<Result<Vec<_>>>() {
            Ok(calls) => calls,
            Err(err) => return vec![Err(err.to_point_error()); requests.len()],
        };
        match self
            .retry
            .run(ctx, self.contract.function, || self.client.call_batch(&calls, block))
            .await
        {
            Ok(results) => requests
                .iter()
                .zip(results.iter().map(Some).chain(std::iter::repeat(None)))
                .map(|((_, resolved), result)| match result {
                    Some(result) => self.price(resolved, result).map_err(|err| err.to_point_error()),
                    None => Err(PointError::domain("rate batch truncated")),
                })
                .collect(),
            Err(err) => {
                warn!(origin = %self.name, block, error = %err, "Exchange rate read failed");
                vec![Err(err.to_point_error()); requests.len()]
            }
        }
    }
}

#[async_trait]
impl Origin for ExchangeRateOrigin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_data_points(&self, ctx: &FetchContext, pairs: &[Pair]) -> Result<HashMap<Pair, Point>> {
        let mut samples = Samples::new();
        let mut requests = Vec::new();
        for pair in pairs {
            match self.contracts.resolve(pair) {
                Some(resolved) => requests.push((pair.clone(), resolved)),
                None => samples.fail(pair, PointError::configuration(format!("no contract configured for {pair}"))),
            }
        }
        if requests.is_empty() {
            return Ok(samples.into_points(&self.name, 0));
        }

        let latest = self
            .retry
            .run(ctx, "block_number", || self.client.block_number())
            .await?;

        for block in target_blocks(latest, &self.block_offsets) {
            let prices = if self.contract.shared_batch {
                self.read(ctx, &requests, block).await
            } else {
                join_all(
                    requests
                        .iter()
                        .map(|request| self.read(ctx, std::slice::from_ref(request), block)),
                )
                .await
                .into_iter()
                .flatten()
                .collect()
            };
            for ((pair, _), price) in requests.iter().zip(prices) {
                samples.push(pair, price);
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
    use ethabi::{Token, Uint};
    use node_config::ContractConfig;
    use types::ErrorKind;

    const RETH: &str = "0xae78736Cd615f374D3085123A210448E74Fc6393";
    const WSTETH_TOKEN: &str = "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0";

    fn rate(value: &str) -> Vec<Token> {
        vec![Token::Uint(Uint::from_dec_str(value).unwrap())]
    }

    fn config(pair: Pair, address: &str, block_offsets: Vec<u64>) -> ContractOriginConfig {
        ContractOriginConfig {
            block_offsets,
            contracts: vec![ContractConfig {
                pair,
                address: address.into(),
                inverted: false,
            }],
        }
    }

    fn dec(s: &str) -> DecFloatPointNumber {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_reth_rate_and_inverse() {
        let client = ScriptedChainClient::new(500);
        client
            .respond(
                parse_address(RETH).unwrap(),
                ContractKind::RocketTokenReth,
                "getExchangeRate",
                &[],
                &rate("1250000000000000000"),
            )
            .unwrap();
        let client = Arc::new(client);
        let origin = ExchangeRateOrigin::new(
            "rocket_pool",
            ROCKET_POOL,
            &config(Pair::new("RETH", "ETH"), RETH, vec![0]),
            Some(client.clone()),
            RetryPolicy::none(),
        )
        .unwrap();

        let reth = Pair::new("RETH", "ETH");
        let eth = Pair::new("ETH", "RETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[reth.clone(), eth.clone()])
            .await
            .unwrap();
        assert_eq!(points[&reth].tick().unwrap().price, Some(dec("1.25")));
        assert_eq!(points[&eth].tick().unwrap().price, Some(dec("0.8")));
        assert_eq!(points[&reth].meta["origin"], "rocket_pool");
        // both pairs share one batch
        assert_eq!(client.batch_count(), 1);
    }

    #[tokio::test]
    async fn test_wsteth_averages_offsets() {
        let client = ScriptedChainClient::new(1_000);
        let token = parse_address(WSTETH_TOKEN).unwrap();
        client
            .respond_at(1_000, token, ContractKind::WstEth, "stEthPerToken", &[], &rate("1150000000000000000"))
            .unwrap();
        client
            .respond_at(900, token, ContractKind::WstEth, "stEthPerToken", &[], &rate("1140000000000000000"))
            .unwrap();
        let origin = ExchangeRateOrigin::new(
            "wsteth",
            WSTETH,
            &config(Pair::new("WSTETH", "STETH"), WSTETH_TOKEN, vec![0, 100]),
            Some(Arc::new(client)),
            RetryPolicy::none(),
        )
        .unwrap();

        let pair = Pair::new("WSTETH", "STETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[pair.clone()])
            .await
            .unwrap();
        assert_eq!(points[&pair].tick().unwrap().price, Some(dec("1.145")));
        assert_eq!(points[&pair].meta["block"], 1_000);
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let client = ScriptedChainClient::new(1_000);
        client.fail_next_batches(1);
        let origin = ExchangeRateOrigin::new(
            "rocket_pool",
            ROCKET_POOL,
            &config(Pair::new("RETH", "ETH"), RETH, vec![0]),
            Some(Arc::new(client)),
            RetryPolicy::none(),
        )
        .unwrap();

        let pair = Pair::new("RETH", "ETH");
        let points = origin
            .fetch_data_points(&FetchContext::background(), &[pair.clone()])
            .await
            .unwrap();
        let error = points[&pair].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Transient);
        assert!(error.message.starts_with("rocket_pool RETH/ETH: "));
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_fetch() {
        let origin = ExchangeRateOrigin::new(
            "wsteth",
            WSTETH,
            &config(Pair::new("WSTETH", "STETH"), WSTETH_TOKEN, vec![0]),
            Some(Arc::new(ScriptedChainClient::new(1))),
            RetryPolicy::none(),
        )
        .unwrap();
        let (ctx, cancel) = FetchContext::background().cancellable();
        cancel.cancel();

        let result = origin.fetch_data_points(&ctx, &[Pair::new("WSTETH", "STETH")]).await;
        assert_eq!(result.unwrap_err(), OriginError::Cancelled);
    }
}
