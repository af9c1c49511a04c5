//! Stable and meta-stable pool quoting

use crate::error::Result;
use crate::pool_traits::{
    check_indices, check_lengths, downscale_down, subtract_swap_fee, upscale, upscale_all, Pool, PoolKind,
};
use crate::stable_math::{self, Rounding};
use bn::{DecFixedPointNumber, IntNumber};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StablePool {
    pub balances: Vec<IntNumber>,
    /// Per-token scaling factors; meta-stable pools fold the cached token rate in
    pub scaling_factors: Vec<DecFixedPointNumber>,
    /// Amplification parameter multiplied by [`stable_math::AMP_PRECISION`]
    pub amplification: IntNumber,
    pub swap_fee_percentage: DecFixedPointNumber,
}

impl StablePool {
    pub fn validate(&self) -> Result<()> {
        check_lengths("scaling factors", self.scaling_factors.len(), self.balances.len())
    }

    pub fn invariant(&self) -> Result<IntNumber> {
        self.validate()?;
        let balances = upscale_all(&self.balances, &self.scaling_factors);
        stable_math::calculate_invariant_rounded(&self.amplification, &balances, Rounding::Down)
    }
}

impl Pool for StablePool {
    fn kind(&self) -> PoolKind {
        PoolKind::Stable
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

        let invariant = stable_math::calculate_invariant_rounded(&self.amplification, &balances, Rounding::Up)?;
        let amount_out = stable_math::calc_out_given_in(
            &self.amplification,
            &balances,
            index_in,
            index_out,
            &amount,
            &invariant,
        )?;

        downscale_down(&amount_out, &self.scaling_factors[index_out])
    }
}
