//! Pool trait definitions for unified quoting across pool families

use crate::error::{AmmError, Result};
use crate::fixed_point;
use crate::math::{fixed, raw, sub, PRECISION};
use bn::{DecFixedPointNumber, IntNumber};
use serde::{Deserialize, Serialize};

/// Pool family identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Weighted,
    Stable,
    ComposableStable,
}

impl PoolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Stable => "stable",
            Self::ComposableStable => "composable_stable",
        }
    }
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified pool interface for exact-in quotes
///
/// Token indices refer to the pool's registered token list and amounts are raw token
/// units, exactly as the vault passes them to the pool contract.
pub trait Pool {
    fn kind(&self) -> PoolKind;

    /// Number of registered tokens, including the pool token for composable pools
    fn token_count(&self) -> usize;

    /// Raw amount of `index_out` received for `amount_in` raw units of `index_in`
    fn calc_out_given_in(&self, index_in: usize, index_out: usize, amount_in: &IntNumber) -> Result<IntNumber>;
}

/// `amount * scaling_factor`, rounded down
pub fn upscale(amount: &IntNumber, scaling_factor: &DecFixedPointNumber) -> IntNumber {
    raw(&fixed_point::mul_down(&fixed(amount), scaling_factor))
}

pub fn upscale_all(amounts: &[IntNumber], scaling_factors: &[DecFixedPointNumber]) -> Vec<IntNumber> {
    amounts
        .iter()
        .zip(scaling_factors)
        .map(|(amount, factor)| upscale(amount, factor))
        .collect()
}

/// `amount / scaling_factor`, rounded down
pub fn downscale_down(amount: &IntNumber, scaling_factor: &DecFixedPointNumber) -> Result<IntNumber> {
    Ok(raw(&fixed_point::div_down(&fixed(amount), scaling_factor)?))
}

/// Amount left after the swap fee, with the fee itself rounded up
pub fn subtract_swap_fee(amount: &IntNumber, swap_fee_percentage: &DecFixedPointNumber) -> Result<IntNumber> {
    let fee = raw(&fixed_point::mul_up(&fixed(amount), swap_fee_percentage));
    sub(amount, &fee)
}

/// Scaling factor of a token with `decimals` decimals and no rate provider
pub fn scaling_factor_for_decimals(decimals: u8) -> Result<DecFixedPointNumber> {
    if decimals > 18 {
        return Err(AmmError::InvalidPoolState(format!(
            "tokens with {decimals} decimals cannot be upscaled"
        )));
    }
    Ok(DecFixedPointNumber::from_int(
        &IntNumber::pow10(u32::from(18 - decimals)),
        PRECISION,
    ))
}

pub(crate) fn check_indices(index_in: usize, index_out: usize, len: usize) -> Result<()> {
    for index in [index_in, index_out] {
        if index >= len {
            return Err(AmmError::InvalidTokenIndex { index, len });
        }
    }
    if index_in == index_out {
        return Err(AmmError::InvalidPoolState(format!(
            "cannot swap token {index_in} for itself"
        )));
    }
    Ok(())
}

pub(crate) fn check_lengths(what: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(AmmError::InvalidPoolState(format!(
            "{len} {what} for {expected} tokens"
        )));
    }
    Ok(())
}
