//! Cross-rate chain over ordered children

use crate::node::{child_tick, Node};
use bn::DecFloatPointNumber;
use std::sync::Arc;
use types::{Pair, Point, PointError, Tick};

/// Derives a price by chaining its children's ticks left to right
///
/// Adjacent ticks must share an asset. Given `A/C` and `B/C` the result is `A/B`;
/// `C/A` and `C/B` give `A/B`; `A/C` and `C/B` give `A/B`; `C/A` and `B/C` give `A/B`.
#[derive(Debug)]
pub struct IndirectNode {
    children: Vec<Arc<Node>>,
}

impl IndirectNode {
    pub fn new(children: Vec<Arc<Node>>) -> Self {
        Self { children }
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn data_point(&self) -> Point {
        match self.children.as_slice() {
            [] => Point::from_error(PointError::configuration("indirect node has no children")),
            [only] => only.data_point(),
            children => {
                let points: Vec<Point> = children.iter().map(|child| child.data_point()).collect();
                evaluate(points)
            }
        }
    }
}

fn evaluate(points: Vec<Point>) -> Point {
    let ticks: Result<Vec<_>, PointError> = points
        .iter()
        .map(|point| child_tick(point).map(|tick| (tick, point.time)))
        .collect();
    let ticks = match ticks {
        Ok(ticks) => ticks,
        Err(err) => return Point::from_error(err).with_sub_points(points),
    };

    let mut iter = ticks.into_iter();
    let Some((mut acc, mut time)) = iter.next() else {
        return Point::from_error(PointError::configuration("indirect node has no children"));
    };
    for (next, next_time) in iter {
        match cross_rate(&acc, &next) {
            Ok(tick) => acc = tick,
            Err(err) => return Point::from_error(err).with_sub_points(points),
        }
        time = time.min(next_time);
    }

    Point::new(acc, time).with_sub_points(points)
}

fn div_or_zero(a: &DecFloatPointNumber, b: &DecFloatPointNumber) -> Result<DecFloatPointNumber, PointError> {
    if b.is_zero() {
        return Ok(DecFloatPointNumber::zero());
    }
    Ok(a.checked_div(b)?)
}

/// Combines two ticks sharing one asset into a tick for the two remaining assets
pub fn cross_rate(a: &Tick, b: &Tick) -> Result<Tick, PointError> {
    let (Some(pa), Some(pb)) = (&a.price, &b.price) else {
        return Err(PointError::aggregation("cross rate needs both prices"));
    };

    let (pair, price) = if a.pair.quote == b.pair.quote {
        // A/C, B/C
        (Pair::new(&a.pair.base, &b.pair.base), div_or_zero(pa, pb)?)
    } else if a.pair.base == b.pair.base {
        // C/A, C/B
        (Pair::new(&a.pair.quote, &b.pair.quote), div_or_zero(pb, pa)?)
    } else if a.pair.quote == b.pair.base {
        // A/C, C/B
        (Pair::new(&a.pair.base, &b.pair.quote), pa * pb)
    } else if a.pair.base == b.pair.quote {
        // C/A, B/C
        let product = pa * pb;
        (Pair::new(&a.pair.quote, &b.pair.base), div_or_zero(&DecFloatPointNumber::one(), &product)?)
    } else {
        return Err(PointError::aggregation(format!(
            "unable to calculate cross rate for {} and {}",
            a.pair, b.pair
        )));
    };

    Ok(Tick {
        pair,
        price: Some(price),
        volume24h: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ErrorKind;

    fn tick(pair: &str, price: &str) -> Tick {
        Tick::new(pair.parse().unwrap(), price.parse().unwrap())
    }

    fn price_of(t: &Tick) -> String {
        t.price.as_ref().unwrap().to_string()
    }

    #[test]
    fn test_four_relationships() {
        let cases = [
            ("A/C", "6", "B/C", "2", "A/B", "3"),
            ("C/A", "2", "C/B", "6", "A/B", "3"),
            ("A/C", "3", "C/B", "2", "A/B", "6"),
            ("C/A", "2", "B/C", "4", "A/B", "0.125"),
        ];
        for (pa, a, pb, b, pair, price) in cases {
            let result = cross_rate(&tick(pa, a), &tick(pb, b)).unwrap();
            assert_eq!(result.pair.to_string(), pair, "{pa} x {pb}");
            assert_eq!(price_of(&result), price, "{pa} x {pb}");
        }
    }

    #[test]
    fn test_unrelated_pairs_fail() {
        let err = cross_rate(&tick("A/B", "1"), &tick("C/D", "1")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Aggregation);
        assert_eq!(err.message, "unable to calculate cross rate for A/B and C/D");
    }

    #[test]
    fn test_zero_leg_yields_zero() {
        let result = cross_rate(&tick("A/C", "5"), &tick("B/C", "0")).unwrap();
        assert!(result.price.unwrap().is_zero());
    }

    #[test]
    fn test_chain_keeps_earliest_time() {
        let now = chrono::Utc::now();
        let earlier = now - chrono::Duration::seconds(30);
        let points = vec![
            Point::new(tick("WSTETH/STETH", "1.2"), now),
            Point::new(tick("STETH/ETH", "0.999"), earlier),
            Point::new(tick("ETH/USD", "2000"), now),
        ];
        let result = evaluate(points);
        let t = result.tick().unwrap();
        assert_eq!(t.pair.to_string(), "WSTETH/USD");
        assert_eq!(price_of(t), "2397.6");
        assert_eq!(result.time, earlier);
        assert_eq!(result.sub_points.len(), 3);
    }

    #[test]
    fn test_invalid_child_fails_node() {
        let points = vec![
            Point::new(tick("A/B", "1"), chrono::Utc::now()),
            Point::from_error(PointError::transient("rpc down")),
        ];
        let result = evaluate(points);
        let err = result.error.unwrap();
        assert_eq!(err.kind, ErrorKind::Transient);
        assert!(err.message.ends_with("rpc down"));
        assert_eq!(result.sub_points.len(), 2);
    }
}
