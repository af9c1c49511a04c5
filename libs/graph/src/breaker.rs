//! Deviation circuit breaker

use crate::error::{GraphError, Result};
use crate::node::{child_tick, type_meta, Node};
use bn::DecFloatPointNumber;
use std::sync::Arc;
use types::{Meta, Point, PointError};

/// Passes the value child through while it stays within `threshold` relative deviation
/// of the reference child
#[derive(Debug)]
pub struct DevCircuitBreakerNode {
    threshold: DecFloatPointNumber,
    children: Vec<Arc<Node>>,
}

impl DevCircuitBreakerNode {
    pub fn new(value: Arc<Node>, reference: Arc<Node>, threshold: DecFloatPointNumber) -> Result<Self> {
        if threshold.sign() <= 0 {
            return Err(GraphError::InvalidThreshold(format!(
                "deviation threshold must be positive, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            children: vec![value, reference],
        })
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn meta(&self) -> Meta {
        let mut meta = type_meta("dev_circuit_breaker");
        meta.insert("threshold".into(), self.threshold.to_string().into());
        meta
    }

    pub fn data_point(&self) -> Point {
        let value = self.children[0].data_point();
        let reference = self.children[1].data_point();
        match self.check(&value, &reference) {
            Ok(()) => value,
            Err(err) => Point::from_error(err).with_sub_points(vec![value, reference]),
        }
    }

    fn check(&self, value: &Point, reference: &Point) -> std::result::Result<(), PointError> {
        let value_tick = child_tick(value)?;
        let reference_tick = child_tick(reference)?;
        let (Some(price), Some(reference_price)) = (&value_tick.price, &reference_tick.price) else {
            return Err(PointError::aggregation("circuit breaker inputs have no price"));
        };

        let deviation = (price - reference_price).abs().checked_div(reference_price)?;
        if deviation > self.threshold {
            return Err(PointError::aggregation(format!(
                "{} deviates {} from reference {}, above threshold {}",
                price, deviation, reference_price, self.threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::OriginNode;
    use std::time::Duration;
    use types::{Pair, Tick};

    fn leaf(price: &str) -> Arc<Node> {
        let pair = Pair::new("STETH", "ETH");
        let node = OriginNode::new("curve", pair.clone(), Duration::from_secs(60), Duration::from_secs(600)).unwrap();
        node.record(Point::new(Tick::new(pair, price.parse().unwrap()), chrono::Utc::now()))
            .unwrap();
        Arc::new(Node::Origin(node))
    }

    #[test]
    fn test_within_threshold_passes_value() {
        let breaker = DevCircuitBreakerNode::new(leaf("0.999"), leaf("1"), "0.02".parse().unwrap()).unwrap();
        let point = breaker.data_point();
        assert_eq!(point.tick().unwrap().price.as_ref().unwrap().to_string(), "0.999");
    }

    #[test]
    fn test_large_deviation_trips() {
        let breaker = DevCircuitBreakerNode::new(leaf("0.95"), leaf("1"), "0.02".parse().unwrap()).unwrap();
        let point = breaker.data_point();
        let err = point.error.unwrap();
        assert!(err.message.contains("deviates 0.05"));
        assert_eq!(point.sub_points.len(), 2);
    }

    #[test]
    fn test_threshold_must_be_positive() {
        assert!(DevCircuitBreakerNode::new(leaf("1"), leaf("1"), DecFloatPointNumber::zero()).is_err());
    }
}
