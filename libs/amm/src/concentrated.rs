//! Concentrated liquidity price math
//!
//! Pools store `sqrt(price) * 2^96` where price is token1 raw units per token0 raw unit.
//! `2^-192 = 5^192 / 10^192`, so the squared ratio converts to a decimal without loss.

use crate::error::{AmmError, Result};
use bn::{DecFixedPointNumber, DecFloatPointNumber, IntNumber};
use once_cell::sync::Lazy;

/// Sqrt ratio at the minimum tick (-887272)
pub static MIN_SQRT_RATIO: Lazy<IntNumber> = Lazy::new(|| IntNumber::from(4_295_128_739u64));

/// Sqrt ratio at the maximum tick (887272)
pub static MAX_SQRT_RATIO: Lazy<IntNumber> = Lazy::new(|| {
    IntNumber::from_big(
        "1461446703485210103287273052203988822378723970342"
            .parse()
            .unwrap_or_default(),
    )
});

const Q192_DECIMALS: u8 = 192;

static FIVE_POW_192: Lazy<IntNumber> = Lazy::new(|| IntNumber::from(5u8).pow(u32::from(Q192_DECIMALS)));

pub fn check_sqrt_price(sqrt_price_x96: &IntNumber) -> Result<()> {
    if sqrt_price_x96 < &*MIN_SQRT_RATIO || sqrt_price_x96 >= &*MAX_SQRT_RATIO {
        return Err(AmmError::InvalidSqrtPrice {
            value: sqrt_price_x96.to_string(),
        });
    }
    Ok(())
}

/// Price of one whole token0 in whole token1 units
pub fn sqrt_price_x96_to_price(sqrt_price_x96: &IntNumber, decimals0: u8, decimals1: u8) -> Result<DecFloatPointNumber> {
    check_sqrt_price(sqrt_price_x96)?;

    let mut mantissa = sqrt_price_x96 * sqrt_price_x96 * FIVE_POW_192.clone();
    let mut precision = u32::from(Q192_DECIMALS);
    if decimals0 >= decimals1 {
        mantissa = mantissa * IntNumber::pow10(u32::from(decimals0 - decimals1));
    } else {
        precision += u32::from(decimals1 - decimals0);
    }

    let max = u32::from(bn::MAX_PRECISION);
    if precision > max {
        // more digits than a decimal can hold: drop the excess, truncating
        mantissa = mantissa.checked_div(&IntNumber::pow10(precision - max))?;
        precision = max;
    }

    let scaled = DecFixedPointNumber::from_mantissa(mantissa.into_big(), precision as u8);
    Ok(DecFloatPointNumber::from(scaled))
}

/// Price of `base` in `quote` for a pool whose token0 may be either side
pub fn pair_price(
    sqrt_price_x96: &IntNumber,
    decimals0: u8,
    decimals1: u8,
    base_is_token0: bool,
) -> Result<DecFloatPointNumber> {
    let price = sqrt_price_x96_to_price(sqrt_price_x96, decimals0, decimals1)?;
    if base_is_token0 {
        Ok(price)
    } else {
        Ok(price.inv()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(s: &str) -> IntNumber {
        s.parse().unwrap()
    }

    #[test]
    fn test_unit_sqrt_price_is_one() {
        let q96 = int("79228162514264337593543950336");
        let price = sqrt_price_x96_to_price(&q96, 18, 18).unwrap();
        assert_eq!(price.to_string(), "1");
        assert_eq!(price.precision(), 0);
    }

    #[test]
    fn test_usdc_weth_price_is_exact() {
        // token0 USDC (6 decimals), token1 WETH (18 decimals)
        let sqrt = int("1350174849792634181862360983626536");
        let price = sqrt_price_x96_to_price(&sqrt, 6, 18).unwrap();
        assert_eq!(
            price.to_string(),
            "0.000290416214657745054299429331132958519427128574824682385654530209093781474338167672774046059224654580314122211130363010981419829614647915131021851411252166809406904945944916107691824436187744140625"
        );

        let eth_in_usdc = pair_price(&sqrt, 6, 18, false).unwrap();
        assert!(eth_in_usdc.to_string().starts_with("3443.33391018989094827564916322725777993520041470414926"));
    }

    #[test]
    fn test_wbtc_weth_decimals_shift() {
        let sqrt = int("31506548087041373924566289408542924");
        let price = sqrt_price_x96_to_price(&sqrt, 8, 18).unwrap();
        assert!(price.to_string().starts_with("15.8140271451232207517954394598500283817475"));
    }

    #[test]
    fn test_sqrt_ratio_bounds() {
        assert!(sqrt_price_x96_to_price(&MIN_SQRT_RATIO, 18, 18).is_ok());
        let below = &*MIN_SQRT_RATIO - &IntNumber::one();
        assert!(matches!(
            sqrt_price_x96_to_price(&below, 18, 18),
            Err(AmmError::InvalidSqrtPrice { .. })
        ));
        assert!(sqrt_price_x96_to_price(&MAX_SQRT_RATIO, 18, 18).is_err());
    }
}
