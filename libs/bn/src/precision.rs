//! Decimal precision policy
//!
//! [`DecFloatPointNumber`](crate::DecFloatPointNumber) does not carry a caller-chosen
//! precision. Every operation asks [`working_precision`] how many decimal digits the
//! result is computed with, then strips trailing zeros from the result.
//!
//! | Operation | Working precision            |
//! |-----------|------------------------------|
//! | add/sub   | `max(p1, p2)`                |
//! | mul       | `min(p1 + p2, 255)`          |
//! | div       | `min(p1 + p2 + 18, 255)`     |
//!
//! Add, sub and mul are exact below the ceiling. Division truncates at its working
//! precision.

use num_bigint::BigInt;
use once_cell::sync::Lazy;

/// Largest decimal precision any number can carry (fits the binary header byte)
pub const MAX_PRECISION: u8 = u8::MAX;

/// Extra fractional digits granted to a quotient beyond the operands' own digits
pub const DIV_EXTRA_PRECISION: u16 = 18;

const POW10_TABLE_SIZE: usize = 2 * MAX_PRECISION as usize + DIV_EXTRA_PRECISION as usize + 1;

static POW10: Lazy<Vec<BigInt>> = Lazy::new(|| {
    let ten = BigInt::from(10u8);
    let mut table = Vec::with_capacity(POW10_TABLE_SIZE);
    let mut acc = BigInt::from(1u8);
    for _ in 0..POW10_TABLE_SIZE {
        table.push(acc.clone());
        acc *= &ten;
    }
    table
});

/// Arithmetic operations subject to the precision policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

/// Precision at which `op` computes its result from operands of precision `p1` and `p2`
pub fn working_precision(op: Operation, p1: u8, p2: u8) -> u8 {
    let (p1, p2) = (u16::from(p1), u16::from(p2));
    let prec = match op {
        Operation::Add | Operation::Sub => p1.max(p2),
        Operation::Mul => p1 + p2,
        Operation::Div => p1 + p2 + DIV_EXTRA_PRECISION,
    };
    prec.min(u16::from(MAX_PRECISION)) as u8
}

/// `10^exp`
pub(crate) fn pow10(exp: u32) -> BigInt {
    match POW10.get(exp as usize) {
        Some(value) => value.clone(),
        None => BigInt::from(10u8).pow(exp),
    }
}
