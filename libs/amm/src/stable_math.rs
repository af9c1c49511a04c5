//! StableSwap invariant math
//!
//! All quantities are raw `uint256` integers: balances are upscaled to 18 decimals and
//! the amplification parameter carries [`AMP_PRECISION`]. Invariant and balance
//! solutions use Newton iteration and fail rather than return an unconverged value.
//!
//! Composable stable pools use [`calculate_invariant`]; the older stable and
//! meta-stable pools use [`calculate_invariant_rounded`].

use crate::error::{AmmError, Result};
use crate::fixed_point;
use crate::math::{div_down, div_up, fixed, raw, sub};
use bn::IntNumber;

pub const AMP_PRECISION: u64 = 1_000;

const MAX_ITERATIONS: usize = 255;

fn amp_precision() -> IntNumber {
    IntNumber::from(AMP_PRECISION)
}

fn converged(current: &IntNumber, previous: &IntNumber) -> bool {
    let delta = if current > previous {
        current - previous
    } else {
        previous - current
    };
    delta <= IntNumber::one()
}

/// StableSwap invariant `D` for the given balances
pub fn calculate_invariant(amplification: &IntNumber, balances: &[IntNumber]) -> Result<IntNumber> {
    let sum = balances.iter().fold(IntNumber::zero(), |acc, b| &acc + b);
    if sum.is_zero() {
        return Ok(IntNumber::zero());
    }

    let num_tokens = IntNumber::from(balances.len());
    let amp_times_total = amplification * &num_tokens;
    let mut invariant = sum.clone();

    for _ in 0..MAX_ITERATIONS {
        let mut d_p = invariant.clone();
        for balance in balances {
            d_p = div_down(&(&d_p * &invariant), &(balance * &num_tokens))?;
        }

        let previous = invariant.clone();
        let numerator = &(&div_down(&(&amp_times_total * &sum), &amp_precision())? + &(&d_p * &num_tokens))
            * &invariant;
        let denominator = &div_down(
            &(&sub(&amp_times_total, &amp_precision())? * &invariant),
            &amp_precision(),
        )? + &(&(&num_tokens + &IntNumber::one()) * &d_p);
        invariant = div_down(&numerator, &denominator)?;

        if converged(&invariant, &previous) {
            return Ok(invariant);
        }
    }

    Err(AmmError::StableInvariantDidntConverge)
}

/// Rounding direction of the meta-stable invariant solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

impl Rounding {
    fn div(self, a: &IntNumber, b: &IntNumber) -> Result<IntNumber> {
        match self {
            Rounding::Down => div_down(a, b),
            Rounding::Up => div_up(a, b),
        }
    }

    fn flip(self) -> Self {
        match self {
            Rounding::Down => Rounding::Up,
            Rounding::Up => Rounding::Down,
        }
    }
}

/// StableSwap invariant `D` as computed by stable and meta-stable pools
///
/// Iterates on the balance product `P_D` instead of `D_P`, rounding every quotient in
/// the `rounding` direction except the amplification term of the denominator, which
/// rounds the other way. Swaps round up; joins and exits round down.
pub fn calculate_invariant_rounded(
    amplification: &IntNumber,
    balances: &[IntNumber],
    rounding: Rounding,
) -> Result<IntNumber> {
    let sum = balances.iter().fold(IntNumber::zero(), |acc, b| &acc + b);
    if sum.is_zero() {
        return Ok(IntNumber::zero());
    }

    let num_tokens = IntNumber::from(balances.len());
    let amp_times_total = amplification * &num_tokens;
    let mut invariant = sum.clone();

    for _ in 0..MAX_ITERATIONS {
        let mut p_d = &balances[0] * &num_tokens;
        for balance in &balances[1..] {
            p_d = rounding.div(&(&(&p_d * balance) * &num_tokens), &invariant)?;
        }

        let previous = invariant.clone();
        let numerator = &(&(&num_tokens * &invariant) * &invariant)
            + &rounding.div(&(&(&amp_times_total * &sum) * &p_d), &amp_precision())?;
        let denominator = &(&(&num_tokens + &IntNumber::one()) * &invariant)
            + &rounding
                .flip()
                .div(&(&sub(&amp_times_total, &amp_precision())? * &p_d), &amp_precision())?;
        invariant = rounding.div(&numerator, &denominator)?;

        if converged(&invariant, &previous) {
            return Ok(invariant);
        }
    }

    Err(AmmError::StableInvariantDidntConverge)
}

/// Balance of `token_index` that keeps the invariant, given every other balance
pub fn get_token_balance_given_invariant_and_all_other_balances(
    amplification: &IntNumber,
    balances: &[IntNumber],
    invariant: &IntNumber,
    token_index: usize,
) -> Result<IntNumber> {
    if token_index >= balances.len() {
        return Err(AmmError::InvalidTokenIndex {
            index: token_index,
            len: balances.len(),
        });
    }

    let num_tokens = IntNumber::from(balances.len());
    let amp_times_total = amplification * &num_tokens;
    let mut sum = balances[0].clone();
    let mut p_d = &balances[0] * &num_tokens;
    for balance in &balances[1..] {
        p_d = div_down(&(&(&p_d * balance) * &num_tokens), invariant)?;
        sum = &sum + balance;
    }
    sum = &sum - &balances[token_index];

    let inv2 = invariant * invariant;
    let c = &(&div_up(&inv2, &(&amp_times_total * &p_d))? * &amp_precision()) * &balances[token_index];
    let b = &sum + &(&div_down(invariant, &amp_times_total)? * &amp_precision());

    let mut token_balance = div_up(&(&inv2 + &c), &(invariant + &b))?;
    for _ in 0..MAX_ITERATIONS {
        let previous = token_balance.clone();
        let numerator = &(&token_balance * &token_balance) + &c;
        let denominator = sub(&(&(&token_balance * &IntNumber::from(2u8)) + &b), invariant)?;
        token_balance = div_up(&numerator, &denominator)?;

        if converged(&token_balance, &previous) {
            return Ok(token_balance);
        }
    }

    Err(AmmError::StableGetBalanceDidntConverge)
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(AmmError::InvalidTokenIndex { index, len });
    }
    Ok(())
}

/// Amount of `token_index_out` received for `token_amount_in` of `token_index_in`
pub fn calc_out_given_in(
    amplification: &IntNumber,
    balances: &[IntNumber],
    token_index_in: usize,
    token_index_out: usize,
    token_amount_in: &IntNumber,
    invariant: &IntNumber,
) -> Result<IntNumber> {
    check_index(token_index_in, balances.len())?;
    check_index(token_index_out, balances.len())?;

    let mut balances = balances.to_vec();
    balances[token_index_in] = &balances[token_index_in] + token_amount_in;
    let final_balance_out = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        &balances,
        invariant,
        token_index_out,
    )?;

    // one unit is kept in the pool to cover rounding
    sub(&sub(&balances[token_index_out], &final_balance_out)?, &IntNumber::one())
}

/// Amount of `token_index_in` required to receive `token_amount_out` of `token_index_out`
pub fn calc_in_given_out(
    amplification: &IntNumber,
    balances: &[IntNumber],
    token_index_in: usize,
    token_index_out: usize,
    token_amount_out: &IntNumber,
    invariant: &IntNumber,
) -> Result<IntNumber> {
    check_index(token_index_in, balances.len())?;
    check_index(token_index_out, balances.len())?;

    let mut balances = balances.to_vec();
    balances[token_index_out] = sub(&balances[token_index_out], token_amount_out)?;
    let final_balance_in = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        &balances,
        invariant,
        token_index_in,
    )?;

    Ok(&sub(&final_balance_in, &balances[token_index_in])? + &IntNumber::one())
}

/// BPT minted for a join with `amounts_in`; fees apply to the part of each amount
/// beyond the proportional share
pub fn calc_bpt_out_given_exact_tokens_in(
    amplification: &IntNumber,
    balances: &[IntNumber],
    amounts_in: &[IntNumber],
    bpt_total_supply: &IntNumber,
    current_invariant: &IntNumber,
    swap_fee_percentage: &IntNumber,
) -> Result<IntNumber> {
    if amounts_in.len() != balances.len() {
        return Err(AmmError::InvalidPoolState(format!(
            "{} amounts for {} balances",
            amounts_in.len(),
            balances.len()
        )));
    }

    let sum_balances = balances.iter().fold(IntNumber::zero(), |acc, b| &acc + b);

    let mut balance_ratios_with_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_with_fees = fixed_point::zero();
    for (balance, amount_in) in balances.iter().zip(amounts_in) {
        let current_weight = fixed_point::div_down(&fixed(balance), &fixed(&sum_balances))?;
        let ratio = fixed_point::div_down(&fixed(&(balance + amount_in)), &fixed(balance))?;
        invariant_ratio_with_fees = &invariant_ratio_with_fees + &fixed_point::mul_down(&ratio, &current_weight);
        balance_ratios_with_fee.push(ratio);
    }

    let fee_complement = &fixed_point::one() - &fixed(swap_fee_percentage);
    let mut new_balances = Vec::with_capacity(balances.len());
    for ((balance, amount_in), ratio) in balances.iter().zip(amounts_in).zip(&balance_ratios_with_fee) {
        let amount_in_without_fee = if ratio > &invariant_ratio_with_fees {
            let excess = raw(&invariant_ratio_with_fees) - IntNumber::pow10(18);
            let non_taxable = raw(&fixed_point::mul_down(&fixed(balance), &fixed(&excess)));
            let taxable = sub(amount_in, &non_taxable)?;
            &non_taxable + &raw(&fixed_point::mul_down(&fixed(&taxable), &fee_complement))
        } else {
            amount_in.clone()
        };
        new_balances.push(balance + &amount_in_without_fee);
    }

    let new_invariant = calculate_invariant(amplification, &new_balances)?;
    let invariant_ratio = fixed_point::div_down(&fixed(&new_invariant), &fixed(current_invariant))?;
    if invariant_ratio > fixed_point::one() {
        let growth = &invariant_ratio - &fixed_point::one();
        Ok(raw(&fixed_point::mul_down(&fixed(bpt_total_supply), &growth)))
    } else {
        Ok(IntNumber::zero())
    }
}

/// Amount of `token_index` paid out for burning `bpt_amount_in`
pub fn calc_token_out_given_exact_bpt_in(
    amplification: &IntNumber,
    balances: &[IntNumber],
    token_index: usize,
    bpt_amount_in: &IntNumber,
    bpt_total_supply: &IntNumber,
    current_invariant: &IntNumber,
    swap_fee_percentage: &IntNumber,
) -> Result<IntNumber> {
    check_index(token_index, balances.len())?;

    let remaining_supply = sub(bpt_total_supply, bpt_amount_in)?;
    let new_invariant = fixed_point::mul_up(
        &fixed_point::div_up(&fixed(&remaining_supply), &fixed(bpt_total_supply))?,
        &fixed(current_invariant),
    );

    let new_balance = get_token_balance_given_invariant_and_all_other_balances(
        amplification,
        balances,
        &raw(&new_invariant),
        token_index,
    )?;
    let amount_out_without_fee = sub(&balances[token_index], &new_balance)?;

    let sum_balances = balances.iter().fold(IntNumber::zero(), |acc, b| &acc + b);
    let current_weight = fixed_point::div_down(&fixed(&balances[token_index]), &fixed(&sum_balances))?;
    let taxable_percentage = fixed_point::complement(&current_weight);

    let taxable = raw(&fixed_point::mul_up(&fixed(&amount_out_without_fee), &taxable_percentage));
    let non_taxable = sub(&amount_out_without_fee, &taxable)?;
    let fee_complement = &fixed_point::one() - &fixed(swap_fee_percentage);

    Ok(&non_taxable + &raw(&fixed_point::mul_down(&fixed(&taxable), &fee_complement)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(s: &str) -> IntNumber {
        s.parse().unwrap()
    }

    fn ints(values: &[&str]) -> Vec<IntNumber> {
        values.iter().map(|v| int(v)).collect()
    }

    #[test]
    fn test_invariant_of_empty_pool_is_zero() {
        let balances = ints(&["0", "0"]);
        assert_eq!(calculate_invariant(&int("100000"), &balances).unwrap(), IntNumber::zero());
    }

    #[test]
    fn test_invariant_of_balanced_pool_is_the_sum() {
        let balances = ints(&["1000000000000000000000", "1000000000000000000000"]);
        assert_eq!(
            calculate_invariant(&int("200000"), &balances).unwrap(),
            int("2000000000000000000000")
        );
    }

    #[test]
    fn test_meta_stable_invariant_rounding_down_does_not_converge() {
        let balances = ints(&[
            "50310513788381313281",
            "19360701460293571158",
            "58687814461000000000000",
        ]);
        assert_eq!(
            calculate_invariant_rounded(&int("60000"), &balances, Rounding::Down),
            Err(AmmError::StableInvariantDidntConverge)
        );
        assert_eq!(
            calculate_invariant_rounded(&int("60000"), &balances, Rounding::Up).unwrap(),
            int("10749877394384654056408")
        );
    }

    #[test]
    fn test_meta_stable_invariant_of_balanced_pool() {
        let balances = ints(&["1000000000000000000000000", "1000000000000000000000000"]);
        assert_eq!(
            calculate_invariant_rounded(&int("200000"), &balances, Rounding::Down).unwrap(),
            int("2000000000000000000000000")
        );
        assert_eq!(
            calculate_invariant_rounded(&int("200000"), &ints(&["0", "0"]), Rounding::Up).unwrap(),
            IntNumber::zero()
        );
    }

    #[test]
    fn test_invariant_non_convergence_is_an_error() {
        let cases = [
            ("60000", vec!["6838539921574940", "75492158154927531475573038", "7"]),
            ("200000", vec!["1164115433906158533", "126614243"]),
        ];
        for (amp, balances) in cases {
            let balances = ints(&balances);
            assert_eq!(
                calculate_invariant(&int(amp), &balances),
                Err(AmmError::StableInvariantDidntConverge),
                "amp {amp}"
            );
        }
    }

    #[test]
    fn test_out_given_in_and_in_given_out() {
        let amp = int("200000");
        let balances = ints(&["1000000000000000000000", "1200000000000000000000"]);
        let invariant = calculate_invariant(&amp, &balances).unwrap();
        let amount_in = int("1000000000000000000");

        let out = calc_out_given_in(&amp, &balances, 0, 1, &amount_in, &invariant).unwrap();
        assert_eq!(out, int("1000915241976611425"));

        let back = calc_in_given_out(&amp, &balances, 0, 1, &out, &invariant).unwrap();
        assert!(back >= amount_in);
        assert_eq!(back, int("1000000000000000378"));
    }

    #[test]
    fn test_bpt_join_and_exit() {
        let amp = int("200000");
        let balances = ints(&["1000000000000000000000", "1200000000000000000000"]);
        let invariant = calculate_invariant(&amp, &balances).unwrap();
        let supply = invariant.clone();
        let fee = int("1000000000000000");

        let amounts = ints(&["10000000000000000000", "0"]);
        let bpt_out =
            calc_bpt_out_given_exact_tokens_in(&amp, &balances, &amounts, &supply, &invariant, &fee).unwrap();
        assert_eq!(bpt_out, int("9999211221572869280"));

        let token_out = calc_token_out_given_exact_bpt_in(
            &amp,
            &balances,
            0,
            &int("10000000000000000000"),
            &supply,
            &invariant,
            &fee,
        )
        .unwrap();
        assert_eq!(token_out, int("9989599769911730406"));
    }

    #[test]
    fn test_invalid_index() {
        let balances = ints(&["1", "2"]);
        assert_eq!(
            calc_out_given_in(&int("1000"), &balances, 0, 2, &int("1"), &int("3")),
            Err(AmmError::InvalidTokenIndex { index: 2, len: 2 })
        );
    }
}
