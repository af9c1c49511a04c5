//! ERC-20 symbol and decimals cache

use crate::chain::{format_address, parse_address, Call, CallResult, ChainClient};
use crate::context::FetchContext;
use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use crate::retry::RetryPolicy;
use dashmap::DashMap;
use ethabi::Address;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Address Curve and other pools use for native ether
pub const NATIVE_ETH_PLACEHOLDER: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    /// Upper-cased, matching [`types::Pair`] symbols
    pub symbol: String,
    pub decimals: u8,
}

/// Token metadata never changes, so entries are kept for the life of the origin
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: DashMap<Address, TokenInfo>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<TokenInfo> {
        self.tokens.get(address).map(|entry| entry.clone())
    }

    pub fn insert(&self, info: TokenInfo) {
        self.tokens.insert(info.address, info);
    }

    /// Metadata for every address, in order, reading the uncached ones at `block`
    ///
    /// A token whose metadata cannot be read fails the lookup without poisoning the
    /// cache for the other tokens of the batch.
    pub async fn resolve(
        &self,
        client: &dyn ChainClient,
        retry: &RetryPolicy,
        ctx: &FetchContext,
        addresses: &[Address],
        block: u64,
    ) -> Result<Vec<TokenInfo>> {
        let native = parse_address(NATIVE_ETH_PLACEHOLDER)?;
        let mut missing: Vec<Address> = Vec::new();
        let mut failures: HashMap<Address, OriginError> = HashMap::new();
        for address in addresses {
            if *address == native {
                self.tokens.entry(native).or_insert_with(|| TokenInfo {
                    address: native,
                    symbol: "ETH".to_string(),
                    decimals: 18,
                });
            } else if !self.tokens.contains_key(address) && !missing.contains(address) {
                missing.push(*address);
            }
        }

        if !missing.is_empty() {
            debug!(tokens = missing.len(), block, "Loading token metadata");
            let calls = missing
                .iter()
                .flat_map(|address| {
                    [
                        Call::new(*address, ContractKind::Erc20, "symbol", &[]),
                        Call::new(*address, ContractKind::Erc20, "decimals", &[]),
                    ]
                })
                .collect::<Result<Vec<_>>>()?;
            let results = retry
                .run(ctx, "token_metadata", || client.call_batch(&calls, block))
                .await?;

            for (address, pair) in missing.iter().zip(results.chunks(2)) {
                match decode_token(address, pair) {
                    Ok(info) => self.insert(info),
                    Err(err) => {
                        warn!(token = %format_address(address), error = %err, "Token metadata unreadable");
                        failures.insert(*address, err);
                    }
                }
            }
        }

        addresses
            .iter()
            .map(|address| match (self.get(address), failures.get(address)) {
                (Some(info), _) => Ok(info),
                (None, Some(err)) => Err(err.clone()),
                (None, None) => Err(OriginError::InvalidResponse {
                    target: format_address(address),
                    reason: "token metadata missing".into(),
                }),
            })
            .collect()
    }
}

fn decode_token(address: &Address, results: &[CallResult]) -> Result<TokenInfo> {
    let [symbol, decimals] = results else {
        return Err(OriginError::Abi("token metadata batch truncated".into()));
    };
    let symbol = symbol.decode(address, ContractKind::Erc20, "symbol")?;
    let decimals = decimals.decode(address, ContractKind::Erc20, "decimals")?;
    Ok(TokenInfo {
        address: *address,
        symbol: contracts::as_string(contracts::output(&symbol, 0)?)?.to_uppercase(),
        decimals: contracts::as_u8(contracts::output(&decimals, 0)?)?,
    })
}

/// Index of the token whose symbol is `symbol`
pub fn position(tokens: &[TokenInfo], symbol: &str) -> Option<usize> {
    tokens.iter().position(|token| token.symbol == symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChainClient;
    use ethabi::{Token, Uint};

    const STETH: &str = "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84";

    #[tokio::test]
    async fn test_resolve_caches_and_maps_native_eth() {
        let client = ScriptedChainClient::new(100);
        let steth = parse_address(STETH).unwrap();
        client
            .respond(steth, ContractKind::Erc20, "symbol", &[], &[Token::String("stETH".into())])
            .unwrap();
        client
            .respond(steth, ContractKind::Erc20, "decimals", &[], &[Token::Uint(Uint::from(18))])
            .unwrap();

        let cache = TokenCache::new();
        let native = parse_address(NATIVE_ETH_PLACEHOLDER).unwrap();
        let ctx = FetchContext::background();
        let tokens = cache
            .resolve(&client, &RetryPolicy::none(), &ctx, &[native, steth], 100)
            .await
            .unwrap();

        assert_eq!(tokens[0].symbol, "ETH");
        assert_eq!(tokens[1].symbol, "STETH");
        assert_eq!(tokens[1].decimals, 18);
        assert_eq!(position(&tokens, "STETH"), Some(1));
        assert_eq!(client.batch_count(), 1);

        cache
            .resolve(&client, &RetryPolicy::none(), &ctx, &[steth], 101)
            .await
            .unwrap();
        assert_eq!(client.batch_count(), 1);
    }

    #[tokio::test]
    async fn test_reverting_token_fails() {
        let client = ScriptedChainClient::new(100);
        let cache = TokenCache::new();
        let unknown = parse_address(STETH).unwrap();
        let result = cache
            .resolve(&client, &RetryPolicy::none(), &FetchContext::background(), &[unknown], 100)
            .await;
        assert!(matches!(result, Err(OriginError::Reverted { .. })));
    }

    #[tokio::test]
    async fn test_reverting_token_does_not_block_others() {
        const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let client = ScriptedChainClient::new(100);
        let usdc = parse_address(USDC).unwrap();
        client
            .respond(usdc, ContractKind::Erc20, "symbol", &[], &[Token::String("USDC".into())])
            .unwrap();
        client
            .respond(usdc, ContractKind::Erc20, "decimals", &[], &[Token::Uint(Uint::from(6))])
            .unwrap();

        let cache = TokenCache::new();
        let broken = parse_address(STETH).unwrap();
        let ctx = FetchContext::background();
        let result = cache
            .resolve(&client, &RetryPolicy::none(), &ctx, &[usdc, broken], 100)
            .await;
        assert!(matches!(result, Err(OriginError::Reverted { .. })));
        assert_eq!(cache.get(&broken), None);

        let tokens = cache
            .resolve(&client, &RetryPolicy::none(), &ctx, &[usdc], 100)
            .await
            .unwrap();
        assert_eq!(tokens[0].decimals, 6);
        assert_eq!(client.batch_count(), 1);
    }
}
