//! Aggregated contract reads
//!
//! Origins never talk to a node directly. They describe the reads they need as a list of
//! [`Call`]s and hand them to a [`ChainClient`], which executes the whole list against
//! one block and reports one [`CallResult`] per call in request order.

use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use async_trait::async_trait;
use ethabi::{Address, Token};
use node_config::EthereumConfig;
use std::time::Duration;
use tracing::debug;
use web3::transports::Http;
use web3::types::{BlockId, BlockNumber, Bytes, CallRequest, U64};
use web3::Web3;

/// One contract read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub target: Address,
    pub data: Vec<u8>,
}

impl Call {
    pub fn new(target: Address, kind: ContractKind, function: &str, args: &[Token]) -> Result<Self> {
        Ok(Self {
            target,
            data: contracts::encode_call(kind, function, args)?,
        })
    }
}

/// Outcome of one call inside a batch; a revert does not fail its siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub data: Vec<u8>,
}

impl CallResult {
    pub fn ok(data: Vec<u8>) -> Self {
        Self { success: true, data }
    }

    pub fn reverted() -> Self {
        Self {
            success: false,
            data: Vec::new(),
        }
    }

    /// Decode the return data of `function`, failing on a revert
    pub fn decode(&self, target: &Address, kind: ContractKind, function: &str) -> Result<Vec<Token>> {
        if !self.success {
            return Err(OriginError::Reverted {
                target: format_address(target),
                function: function.to_string(),
            });
        }
        contracts::decode_output(kind, function, &self.data)
    }

    /// Like [`CallResult::decode`] but a revert yields `None`
    pub fn decode_optional(&self, kind: ContractKind, function: &str) -> Result<Option<Vec<Token>>> {
        if !self.success {
            return Ok(None);
        }
        contracts::decode_output(kind, function, &self.data).map(Some)
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> Result<u64>;

    /// Execute `calls` against `block`
    ///
    /// Transport failures fail the whole batch; a reverted call is reported in its own
    /// result.
    async fn call_batch(&self, calls: &[Call], block: u64) -> Result<Vec<CallResult>>;
}

pub fn parse_address(value: &str) -> Result<Address> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| OriginError::InvalidAddress(value.to_string()))?;
    if bytes.len() != 20 {
        return Err(OriginError::InvalidAddress(value.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// [`ChainClient`] over JSON-RPC, batching through the Multicall3 `aggregate3` contract
pub struct Web3ChainClient {
    web3: Web3<Http>,
    multicall: Address,
    timeout: Duration,
}

impl Web3ChainClient {
    pub fn new(config: &EthereumConfig) -> Result<Self> {
        let transport = Http::new(&config.rpc_url)
            .map_err(|e| OriginError::Configuration(format!("invalid RPC URL {}: {}", config.rpc_url, e)))?;
        Ok(Self {
            web3: Web3::new(transport),
            multicall: parse_address(&config.multicall_address)?,
            timeout: config.timeout(),
        })
    }

    async fn with_timeout<T, F>(&self, method: &str, future: F) -> Result<T>
    where
        F: std::future::Future<Output = web3::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result.map_err(OriginError::from),
            Err(_) => Err(OriginError::Rpc(format!(
                "{method} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for Web3ChainClient {
    async fn block_number(&self) -> Result<u64> {
        let block = self
            .with_timeout("eth_blockNumber", self.web3.eth().block_number())
            .await?;
        Ok(block.as_u64())
    }

    async fn call_batch(&self, calls: &[Call], block: u64) -> Result<Vec<CallResult>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let data = encode_aggregate3(calls)?;
        let request = CallRequest {
            to: Some(self.multicall),
            data: Some(Bytes(data)),
            ..Default::default()
        };
        let block_id = BlockId::Number(BlockNumber::Number(U64::from(block)));

        debug!(calls = calls.len(), block, "Executing aggregated call batch");
        let raw = self
            .with_timeout("eth_call", self.web3.eth().call(request, Some(block_id)))
            .await?;

        decode_aggregate3(&raw.0, calls.len())
    }
}

pub(crate) fn encode_aggregate3(calls: &[Call]) -> Result<Vec<u8>> {
    let entries = calls
        .iter()
        .map(|call| Token::Tuple(vec![Token::Address(call.target), Token::Bool(true), Token::Bytes(call.data.clone())]))
        .collect();
    contracts::encode_call(ContractKind::Multicall3, "aggregate3", &[Token::Array(entries)])
}

pub(crate) fn decode_aggregate3(data: &[u8], expected: usize) -> Result<Vec<CallResult>> {
    let tokens = contracts::decode_output(ContractKind::Multicall3, "aggregate3", data)?;
    let entries = contracts::as_array(contracts::output(&tokens, 0)?)?;
    if entries.len() != expected {
        return Err(OriginError::Abi(format!(
            "aggregate3 returned {} results for {} calls",
            entries.len(),
            expected
        )));
    }

    entries
        .iter()
        .map(|entry| match entry {
            Token::Tuple(fields) => match fields.as_slice() {
                [Token::Bool(success), Token::Bytes(data)] => Ok(CallResult {
                    success: *success,
                    data: data.clone(),
                }),
                _ => Err(OriginError::Abi(format!("malformed aggregate3 result {entry:?}"))),
            },
            _ => Err(OriginError::Abi(format!("malformed aggregate3 result {entry:?}"))),
        })
        .collect()
}
