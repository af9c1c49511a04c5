//! Composable stable pool quoting
//!
//! The pool token (BPT) is registered as one of the pool's own tokens. Regular swaps drop
//! the BPT slot and behave like a stable pool. Swaps into or out of BPT are priced as
//! single-token joins and exits, after accounting for the protocol fees accrued since
//! the last join or exit: the BPT the protocol would be minted is added to the supply
//! before the join/exit math runs.

use crate::error::{AmmError, Result};
use crate::fixed_point;
use crate::math::{fixed, raw, sub};
use crate::pool_traits::{
    check_indices, check_lengths, downscale_down, subtract_swap_fee, upscale, upscale_all, Pool, PoolKind,
};
use crate::stable_math;
use bn::{DecFixedPointNumber, IntNumber};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Cached rate of a token with a rate provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRateCache {
    pub rate: IntNumber,
    pub old_rate: IntNumber,
}

/// Invariant and amplification recorded after the last join or exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastJoinExit {
    pub amplification: IntNumber,
    pub post_join_exit_invariant: IntNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposableStablePool {
    /// Registered balances, BPT slot included
    pub balances: Vec<IntNumber>,
    /// Rate-adjusted scaling factors, BPT slot included
    pub scaling_factors: Vec<DecFixedPointNumber>,
    pub bpt_index: usize,
    pub amplification: IntNumber,
    pub swap_fee_percentage: DecFixedPointNumber,
    pub total_supply: IntNumber,
    /// `None` for the BPT slot and for tokens without a rate provider
    pub rate_caches: Vec<Option<TokenRateCache>>,
    pub exempt_from_yield_fee: Vec<bool>,
    pub last_join_exit: LastJoinExit,
    pub protocol_swap_fee_percentage: DecFixedPointNumber,
    pub protocol_yield_fee_percentage: DecFixedPointNumber,
}

fn drop_index<T: Clone>(values: &[T], index: usize) -> Vec<T> {
    values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, v)| v.clone())
        .collect()
}

impl ComposableStablePool {
    pub fn validate(&self) -> Result<()> {
        let len = self.balances.len();
        check_lengths("scaling factors", self.scaling_factors.len(), len)?;
        check_lengths("rate caches", self.rate_caches.len(), len)?;
        check_lengths("exemption flags", self.exempt_from_yield_fee.len(), len)?;
        if self.bpt_index >= len {
            return Err(AmmError::InvalidTokenIndex {
                index: self.bpt_index,
                len,
            });
        }
        Ok(())
    }

    /// Index into the balance vector with the BPT slot removed
    fn skip_bpt_index(&self, index: usize) -> usize {
        if index > self.bpt_index {
            index - 1
        } else {
            index
        }
    }

    /// Balances with old rates substituted for tokens whose yield the protocol does not
    /// tax (or for every rated token when `ignore_exempt_flags` is set)
    fn adjusted_balances(&self, balances: &[IntNumber], ignore_exempt_flags: bool) -> Result<Vec<IntNumber>> {
        let caches = drop_index(&self.rate_caches, self.bpt_index);
        let exempt = drop_index(&self.exempt_from_yield_fee, self.bpt_index);

        balances
            .iter()
            .zip(caches.iter().zip(exempt))
            .map(|(balance, (cache, exempt))| -> Result<IntNumber> {
                match cache {
                    Some(cache) if exempt || ignore_exempt_flags => {
                        Ok((balance * &cache.old_rate).checked_div(&cache.rate)?)
                    }
                    _ => Ok(balance.clone()),
                }
            })
            .collect()
    }

    /// Share of the pool owed to the protocol and the invariant of `balances` at the
    /// last join/exit amplification
    fn protocol_pool_ownership_percentage(&self, balances: &[IntNumber]) -> Result<(DecFixedPointNumber, IntNumber)> {
        let amp = &self.last_join_exit.amplification;
        let swap_fee_growth_invariant = stable_math::calculate_invariant(amp, &self.adjusted_balances(balances, true)?)?;
        let total_non_exempt_growth_invariant =
            stable_math::calculate_invariant(amp, &self.adjusted_balances(balances, false)?)?;
        let total_growth_invariant = stable_math::calculate_invariant(amp, balances)?;

        let last_invariant = &self.last_join_exit.post_join_exit_invariant;
        let swap_fee_growth_delta = if &swap_fee_growth_invariant > last_invariant {
            &swap_fee_growth_invariant - last_invariant
        } else {
            IntNumber::zero()
        };
        let non_exempt_yield_growth_delta = if total_non_exempt_growth_invariant > swap_fee_growth_invariant {
            &total_non_exempt_growth_invariant - &swap_fee_growth_invariant
        } else {
            IntNumber::zero()
        };

        let total = fixed(&total_growth_invariant);
        let swap_fee_share = fixed_point::mul_down(
            &fixed_point::div_down(&fixed(&swap_fee_growth_delta), &total)?,
            &self.protocol_swap_fee_percentage,
        );
        let yield_share = fixed_point::mul_down(
            &fixed_point::div_down(&fixed(&non_exempt_yield_growth_delta), &total)?,
            &self.protocol_yield_fee_percentage,
        );

        Ok((&swap_fee_share + &yield_share, total_growth_invariant))
    }

    /// BPT supply, balances without BPT and the invariant right before a join or exit
    fn before_join_exit(&self, registered: &[IntNumber]) -> Result<(IntNumber, Vec<IntNumber>, IntNumber)> {
        let virtual_supply = sub(&self.total_supply, &registered[self.bpt_index])?;
        let balances = drop_index(registered, self.bpt_index);

        let (ownership, last_amp_invariant) = self.protocol_pool_ownership_percentage(&balances)?;
        let ownership = raw(&ownership);
        let protocol_fee_amount =
            (&virtual_supply * &ownership).checked_div(&sub(&IntNumber::pow10(18), &ownership)?)?;
        trace!(%protocol_fee_amount, "protocol fees due before join/exit");

        let invariant = if self.amplification == self.last_join_exit.amplification {
            last_amp_invariant
        } else {
            stable_math::calculate_invariant(&self.amplification, &balances)?
        };

        Ok((&virtual_supply + &protocol_fee_amount, balances, invariant))
    }

    fn swap_with_bpt(&self, index_in: usize, index_out: usize, amount_in: &IntNumber) -> Result<IntNumber> {
        let registered = upscale_all(&self.balances, &self.scaling_factors);
        let amount = upscale(amount_in, &self.scaling_factors[index_in]);
        let (supply, balances, invariant) = self.before_join_exit(&registered)?;
        let swap_fee = raw(&self.swap_fee_percentage);

        let amount_out = if index_out == self.bpt_index {
            let mut amounts_in = vec![IntNumber::zero(); balances.len()];
            amounts_in[self.skip_bpt_index(index_in)] = amount;
            stable_math::calc_bpt_out_given_exact_tokens_in(
                &self.amplification,
                &balances,
                &amounts_in,
                &supply,
                &invariant,
                &swap_fee,
            )?
        } else {
            stable_math::calc_token_out_given_exact_bpt_in(
                &self.amplification,
                &balances,
                self.skip_bpt_index(index_out),
                &amount,
                &supply,
                &invariant,
                &swap_fee,
            )?
        };

        downscale_down(&amount_out, &self.scaling_factors[index_out])
    }

    fn regular_swap(&self, index_in: usize, index_out: usize, amount_in: &IntNumber) -> Result<IntNumber> {
        let amount = subtract_swap_fee(amount_in, &self.swap_fee_percentage)?;
        let registered = upscale_all(&self.balances, &self.scaling_factors);
        let amount = upscale(&amount, &self.scaling_factors[index_in]);

        let balances = drop_index(&registered, self.bpt_index);
        let invariant = stable_math::calculate_invariant(&self.amplification, &balances)?;
        let amount_out = stable_math::calc_out_given_in(
            &self.amplification,
            &balances,
            self.skip_bpt_index(index_in),
            self.skip_bpt_index(index_out),
            &amount,
            &invariant,
        )?;

        downscale_down(&amount_out, &self.scaling_factors[index_out])
    }
}

impl Pool for ComposableStablePool {
    fn kind(&self) -> PoolKind {
        PoolKind::ComposableStable
    }

    fn token_count(&self) -> usize {
        self.balances.len()
    }

    fn calc_out_given_in(&self, index_in: usize, index_out: usize, amount_in: &IntNumber) -> Result<IntNumber> {
        self.validate()?;
        check_indices(index_in, index_out, self.balances.len())?;

        if index_in == self.bpt_index || index_out == self.bpt_index {
            self.swap_with_bpt(index_in, index_out, amount_in)
        } else {
            self.regular_swap(index_in, index_out, amount_in)
        }
    }
}
