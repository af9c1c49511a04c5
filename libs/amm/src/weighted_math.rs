//! Weighted pool swap math
//!
//! Balances and amounts are upscaled 18-decimal values; weights are normalized
//! 18-decimal fractions.

use crate::error::{AmmError, Result};
use crate::fixed_point::{complement, div_down, div_up, mul_down, mul_up, one, pow_up};
use bn::DecFixedPointNumber;

/// Swaps may not move more than 30% of a balance
pub fn max_in_ratio() -> DecFixedPointNumber {
    DecFixedPointNumber::from_mantissa(3u64.into(), 1).set_precision(18)
}

pub fn max_out_ratio() -> DecFixedPointNumber {
    max_in_ratio()
}

/// `balance_out * (1 - (balance_in / (balance_in + amount_in))^(weight_in / weight_out))`
pub fn calc_out_given_in(
    balance_in: &DecFixedPointNumber,
    weight_in: &DecFixedPointNumber,
    balance_out: &DecFixedPointNumber,
    weight_out: &DecFixedPointNumber,
    amount_in: &DecFixedPointNumber,
) -> Result<DecFixedPointNumber> {
    if amount_in > &mul_down(balance_in, &max_in_ratio()) {
        return Err(AmmError::MaxInRatio);
    }

    // base rounds up so the power (and the amount out) rounds down
    let denominator = balance_in + amount_in;
    let base = div_up(balance_in, &denominator)?;
    let exponent = div_down(weight_in, weight_out)?;
    let power = pow_up(&base, &exponent)?;

    Ok(mul_down(balance_out, &complement(&power)))
}

/// `balance_in * ((balance_out / (balance_out - amount_out))^(weight_out / weight_in) - 1)`
pub fn calc_in_given_out(
    balance_in: &DecFixedPointNumber,
    weight_in: &DecFixedPointNumber,
    balance_out: &DecFixedPointNumber,
    weight_out: &DecFixedPointNumber,
    amount_out: &DecFixedPointNumber,
) -> Result<DecFixedPointNumber> {
    if amount_out > &mul_down(balance_out, &max_out_ratio()) {
        return Err(AmmError::MaxOutRatio);
    }

    let base = div_up(balance_out, &(balance_out - amount_out))?;
    let exponent = div_up(weight_out, weight_in)?;
    let power = pow_up(&base, &exponent)?;

    let ratio = &power - &one();
    Ok(mul_up(balance_in, &ratio))
}

/// Price of the `in` token in units of the `out` token, ignoring fees
pub fn calc_spot_price(
    balance_in: &DecFixedPointNumber,
    weight_in: &DecFixedPointNumber,
    balance_out: &DecFixedPointNumber,
    weight_out: &DecFixedPointNumber,
) -> Result<DecFixedPointNumber> {
    let numerator = div_down(balance_out, weight_out)?;
    let denominator = div_up(balance_in, weight_in)?;
    div_down(&numerator, &denominator)
}
