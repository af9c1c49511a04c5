//! Contract ABI registry
//!
//! One immutable function table per contract kind, built on first use and shared by
//! every origin. Only the read functions the origins call are registered.

use crate::error::{OriginError, Result};
use bn::IntNumber;
use ethabi::{Address, Function, Param, ParamType, StateMutability, Token};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Multicall3,
    Erc20,
    BalancerVault,
    /// Union of the weighted, meta-stable and composable stable pool getters
    BalancerPool,
    CurveStableSwap,
    CurveCryptoSwap,
    UniswapV3Pool,
    RocketTokenReth,
    WstEth,
}

type FunctionTable = HashMap<String, Function>;

static REGISTRY: Lazy<HashMap<ContractKind, FunctionTable>> = Lazy::new(build_registry);

fn param(kind: ParamType) -> Param {
    Param {
        name: String::new(),
        kind,
        internal_type: None,
    }
}

#[allow(deprecated)]
fn view(name: &str, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Function {
    Function {
        name: name.to_string(),
        inputs: inputs.into_iter().map(param).collect(),
        outputs: outputs.into_iter().map(param).collect(),
        constant: None,
        state_mutability: StateMutability::View,
    }
}

fn table(functions: Vec<Function>) -> FunctionTable {
    functions
        .into_iter()
        .map(|function| (function.name.clone(), function))
        .collect()
}

fn uint() -> ParamType {
    ParamType::Uint(256)
}

fn build_registry() -> HashMap<ContractKind, FunctionTable> {
    use ParamType::{Address as Addr, Array, Bool, Bytes, FixedBytes, Int, String as Str, Tuple, Uint};

    let mut registry = HashMap::new();

    registry.insert(
        ContractKind::Multicall3,
        table(vec![view(
            "aggregate3",
            vec![Array(Box::new(Tuple(vec![Addr, Bool, Bytes])))],
            vec![Array(Box::new(Tuple(vec![Bool, Bytes])))],
        )]),
    );

    registry.insert(
        ContractKind::Erc20,
        table(vec![
            view("symbol", vec![], vec![Str]),
            view("decimals", vec![], vec![Uint(8)]),
        ]),
    );

    registry.insert(
        ContractKind::BalancerVault,
        table(vec![view(
            "getPoolTokens",
            vec![FixedBytes(32)],
            vec![Array(Box::new(Addr)), Array(Box::new(uint())), uint()],
        )]),
    );

    registry.insert(
        ContractKind::BalancerPool,
        table(vec![
            view("getPoolId", vec![], vec![FixedBytes(32)]),
            view("getSwapFeePercentage", vec![], vec![uint()]),
            view("getScalingFactors", vec![], vec![Array(Box::new(uint()))]),
            view("getNormalizedWeights", vec![], vec![Array(Box::new(uint()))]),
            view("getAmplificationParameter", vec![], vec![uint(), Bool, uint()]),
            view("getBptIndex", vec![], vec![uint()]),
            view("totalSupply", vec![], vec![uint()]),
            view("getTokenRateCache", vec![Addr], vec![uint(), uint(), uint(), uint()]),
            view("isTokenExemptFromYieldProtocolFee", vec![Addr], vec![Bool]),
            view("getProtocolFeePercentageCache", vec![uint()], vec![uint()]),
            view("getLastJoinExitData", vec![], vec![uint(), uint()]),
        ]),
    );

    registry.insert(
        ContractKind::CurveStableSwap,
        table(vec![
            view("coins", vec![uint()], vec![Addr]),
            view("get_dy", vec![Int(128), Int(128), uint()], vec![uint()]),
        ]),
    );

    registry.insert(
        ContractKind::CurveCryptoSwap,
        table(vec![
            view("coins", vec![uint()], vec![Addr]),
            view("get_dy", vec![uint(), uint(), uint()], vec![uint()]),
        ]),
    );

    registry.insert(
        ContractKind::UniswapV3Pool,
        table(vec![
            view(
                "slot0",
                vec![],
                vec![Uint(160), Int(24), Uint(16), Uint(16), Uint(16), Uint(8), Bool],
            ),
            view("token0", vec![], vec![Addr]),
            view("token1", vec![], vec![Addr]),
        ]),
    );

    registry.insert(
        ContractKind::RocketTokenReth,
        table(vec![view("getExchangeRate", vec![], vec![uint()])]),
    );

    registry.insert(
        ContractKind::WstEth,
        table(vec![view("stEthPerToken", vec![], vec![uint()])]),
    );

    registry
}

pub fn function(kind: ContractKind, name: &str) -> Result<&'static Function> {
    REGISTRY
        .get(&kind)
        .and_then(|functions| functions.get(name))
        .ok_or_else(|| OriginError::Abi(format!("{kind:?} has no function {name}")))
}

/// ABI-encoded call data, selector included
pub fn encode_call(kind: ContractKind, name: &str, args: &[Token]) -> Result<Vec<u8>> {
    Ok(function(kind, name)?.encode_input(args)?)
}

pub fn decode_output(kind: ContractKind, name: &str, data: &[u8]) -> Result<Vec<Token>> {
    Ok(function(kind, name)?.decode_output(data)?)
}

fn unexpected(expected: &str, token: &Token) -> OriginError {
    OriginError::Abi(format!("expected {expected}, got {token:?}"))
}

pub fn as_uint(token: &Token) -> Result<IntNumber> {
    match token {
        Token::Uint(value) => {
            let mut bytes = [0u8; 32];
            value.to_big_endian(&mut bytes);
            Ok(IntNumber::from_unsigned_bytes_be(&bytes))
        }
        other => Err(unexpected("uint", other)),
    }
}

pub fn as_u8(token: &Token) -> Result<u8> {
    let value = as_uint(token)?;
    value
        .to_u32()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| OriginError::Abi(format!("{value} does not fit in uint8")))
}

pub fn as_usize(token: &Token) -> Result<usize> {
    let value = as_uint(token)?;
    value
        .to_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| OriginError::Abi(format!("{value} is not an index")))
}

pub fn as_address(token: &Token) -> Result<Address> {
    match token {
        Token::Address(address) => Ok(*address),
        other => Err(unexpected("address", other)),
    }
}

pub fn as_bool(token: &Token) -> Result<bool> {
    match token {
        Token::Bool(value) => Ok(*value),
        other => Err(unexpected("bool", other)),
    }
}

pub fn as_string(token: &Token) -> Result<String> {
    match token {
        Token::String(value) => Ok(value.clone()),
        other => Err(unexpected("string", other)),
    }
}

pub fn as_bytes32(token: &Token) -> Result<[u8; 32]> {
    match token {
        Token::FixedBytes(bytes) if bytes.len() == 32 => {
            let mut out = [0u8; 32];
            out.copy_from_slice(bytes);
            Ok(out)
        }
        other => Err(unexpected("bytes32", other)),
    }
}

pub fn as_array(token: &Token) -> Result<&[Token]> {
    match token {
        Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => Ok(items),
        other => Err(unexpected("array", other)),
    }
}

/// Token at `index` of a decoded output
pub fn output(tokens: &[Token], index: usize) -> Result<&Token> {
    tokens
        .get(index)
        .ok_or_else(|| OriginError::Abi(format!("output has {} values, wanted index {index}", tokens.len())))
}
