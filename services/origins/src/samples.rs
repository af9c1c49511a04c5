//! Per-pair price samples across historical blocks

use bn::{DecFixedPointNumber, DecFloatPointNumber, IntNumber};
use chrono::Utc;
use std::collections::HashMap;
use types::{Pair, Point, PointError, Tick};

/// Blocks to read for `offsets` below `latest`, never below genesis
pub fn target_blocks(latest: u64, offsets: &[u64]) -> Vec<u64> {
    offsets.iter().map(|offset| latest.saturating_sub(*offset)).collect()
}

/// `raw / 10^decimals` as a decimal
pub fn ratio(raw: &IntNumber, decimals: u8) -> DecFloatPointNumber {
    DecFixedPointNumber::from_mantissa(raw.as_big().clone(), decimals).into()
}

/// Arithmetic mean
pub fn average(prices: &[DecFloatPointNumber]) -> Result<DecFloatPointNumber, PointError> {
    if prices.is_empty() {
        return Err(PointError::domain("no price samples to average"));
    }
    let sum = prices
        .iter()
        .fold(DecFloatPointNumber::zero(), |acc, price| &acc + price);
    Ok(sum.checked_div(&DecFloatPointNumber::from(prices.len() as u64))?)
}

/// Collects one price per pair per block; the first failure of a pair sticks
#[derive(Debug, Default)]
pub struct Samples {
    pairs: HashMap<Pair, Result<Vec<DecFloatPointNumber>, PointError>>,
}

impl Samples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pair: &Pair, sample: Result<DecFloatPointNumber, PointError>) {
        let entry = self.pairs.entry(pair.clone()).or_insert_with(|| Ok(Vec::new()));
        match (entry.as_mut(), sample) {
            (Ok(prices), Ok(price)) => prices.push(price),
            (Ok(_), Err(err)) => *entry = Err(err),
            (Err(_), _) => {}
        }
    }

    pub fn fail(&mut self, pair: &Pair, err: PointError) {
        self.push(pair, Err(err));
    }

    pub fn fail_all<'a>(&mut self, pairs: impl IntoIterator<Item = &'a Pair>, err: &PointError) {
        for pair in pairs {
            self.fail(pair, err.clone());
        }
    }

    /// Whether the pair has already failed
    pub fn has_failed(&self, pair: &Pair) -> bool {
        matches!(self.pairs.get(pair), Some(Err(_)))
    }

    /// Average each pair's samples into a tick point tagged with `origin` and `block`
    pub fn into_points(self, origin: &str, block: u64) -> HashMap<Pair, Point> {
        let now = Utc::now();
        self.pairs
            .into_iter()
            .map(|(pair, samples)| {
                let point = match samples.and_then(|prices| average(&prices)) {
                    Ok(price) => Point::new(Tick::new(pair.clone(), price), now)
                        .with_meta("origin", origin)
                        .with_meta("block", block),
                    Err(err) => Point::from_error(err.context(format!("{origin} {pair}"))),
                };
                (pair, point)
            })
            .collect()
    }
}
