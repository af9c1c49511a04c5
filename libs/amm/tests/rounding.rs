//! Rounding-direction properties shared by every pool family

use amm::{fixed_point, Pool, StablePool, WeightedPool};
use bn::{DecFixedPointNumber, IntNumber};
use proptest::prelude::*;

fn fp_raw(raw: u128) -> DecFixedPointNumber {
    DecFixedPointNumber::from_mantissa(raw.into(), 18)
}

fn fp(s: &str) -> DecFixedPointNumber {
    DecFixedPointNumber::parse(s, 18).unwrap()
}

proptest! {
    #[test]
    fn prop_directional_rounding_brackets(a in 1u128..u64::MAX as u128, b in 1u128..u64::MAX as u128) {
        let (a, b) = (fp_raw(a), fp_raw(b));
        let down = fixed_point::mul_down(&a, &b);
        let up = fixed_point::mul_up(&a, &b);
        prop_assert!(down <= up);
        prop_assert!(up.mantissa() - down.mantissa() <= IntNumber::one());

        let down = fixed_point::div_down(&a, &b).unwrap();
        let up = fixed_point::div_up(&a, &b).unwrap();
        prop_assert!(down <= up);
        prop_assert!(up.mantissa() - down.mantissa() <= IntNumber::one());
    }

    #[test]
    fn prop_pow_down_never_exceeds_pow_up(x in 1u128..(100u128 * 10u128.pow(18)), y in 1u128..(4u128 * 10u128.pow(18))) {
        let (x, y) = (fp_raw(x), fp_raw(y));
        if let (Ok(down), Ok(up)) = (fixed_point::pow_down(&x, &y), fixed_point::pow_up(&x, &y)) {
            prop_assert!(down <= up);
        }
    }

    #[test]
    fn prop_balanced_weighted_pool_never_gives_more_than_in(amount in 1u64..1_000_000_000_000_000_000u64) {
        let pool = WeightedPool {
            balances: vec![IntNumber::pow10(24), IntNumber::pow10(24)],
            normalized_weights: vec![fp("0.5"), fp("0.5")],
            scaling_factors: vec![fp("1"), fp("1")],
            swap_fee_percentage: fp("0.001"),
        };
        let amount_in = IntNumber::from(amount);
        let out = pool.calc_out_given_in(0, 1, &amount_in).unwrap();
        prop_assert!(out < amount_in);
    }

    #[test]
    fn prop_balanced_stable_pool_never_gives_more_than_in(amount in 1_000_000u64..1_000_000_000_000_000_000u64) {
        let pool = StablePool {
            balances: vec![IntNumber::pow10(24), IntNumber::pow10(24)],
            scaling_factors: vec![fp("1"), fp("1")],
            amplification: IntNumber::from(100_000u32),
            swap_fee_percentage: fp("0.0004"),
        };
        let amount_in = IntNumber::from(amount);
        let out = pool.calc_out_given_in(0, 1, &amount_in).unwrap();
        prop_assert!(out < amount_in);
    }
}
