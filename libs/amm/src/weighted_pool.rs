//! Weighted pool quoting
//!
//! Mirrors the vault's exact-in swap path: the fee is taken from the raw amount, balances
//! and amount are upscaled to 18 decimals, the weighted curve is solved and the result is
//! downscaled rounding down.

use crate::error::Result;
use crate::math::{fixed, raw};
use crate::pool_traits::{
    check_indices, check_lengths, downscale_down, subtract_swap_fee, upscale, upscale_all, Pool, PoolKind,
};
use crate::weighted_math;
use bn::{DecFixedPointNumber, IntNumber};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedPool {
    /// Raw token balances as reported by the vault
    pub balances: Vec<IntNumber>,
    pub normalized_weights: Vec<DecFixedPointNumber>,
    pub scaling_factors: Vec<DecFixedPointNumber>,
    pub swap_fee_percentage: DecFixedPointNumber,
}

impl WeightedPool {
    pub fn validate(&self) -> Result<()> {
        let len = self.balances.len();
        check_lengths("weights", self.normalized_weights.len(), len)?;
        check_lengths("scaling factors", self.scaling_factors.len(), len)
    }

    /// Fee-less price of `index_in` in units of `index_out`, on upscaled balances
    pub fn spot_price(&self, index_in: usize, index_out: usize) -> Result<DecFixedPointNumber> {
        self.validate()?;
        check_indices(index_in, index_out, self.balances.len())?;
        let balances = upscale_all(&self.balances, &self.scaling_factors);
        weighted_math::calc_spot_price(
            &fixed(&balances[index_in]),
            &self.normalized_weights[index_in],
            &fixed(&balances[index_out]),
            &self.normalized_weights[index_out],
        )
    }
}

impl Pool for WeightedPool {
    fn kind(&self) -> PoolKind {
        PoolKind::Weighted
    }

    fn token_count(&self) -> usize {
        self.balances.len()
    }

    fn calc_out_given_in(&self, index_in: usize, index_out: usize, amount_in: &IntNumber) -> Result<IntNumber> {
        self.validate()?;
        check_indices(index_in, index_out, self.balances.len())?;

        let amount = subtract_swap_fee(amount_in, &self.swap_fee_percentage)?;
        let balances = upscale_all(&self.balances, &self.scaling_factors);
        let amount = upscale(&amount, &self.scaling_factors[index_in]);

        let amount_out = weighted_math::calc_out_given_in(
            &fixed(&balances[index_in]),
            &self.normalized_weights[index_in],
            &fixed(&balances[index_out]),
            &self.normalized_weights[index_out],
            &fixed(&amount),
        )?;

        downscale_down(&raw(&amount_out), &self.scaling_factors[index_out])
    }
}
