//! Origin-backed leaf node

use crate::error::{GraphError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use types::{Meta, Pair, Point, PointError};

/// Last point an origin reported for one pair
///
/// The point is refreshed by the updater once it is older than `freshness_threshold`
/// and refused to readers once it is older than `expiry_threshold`.
#[derive(Debug)]
pub struct OriginNode {
    origin: String,
    pair: Pair,
    freshness_threshold: Duration,
    expiry_threshold: Duration,
    point: RwLock<Option<Point>>,
}

impl OriginNode {
    pub fn new(
        origin: impl Into<String>,
        pair: Pair,
        freshness_threshold: Duration,
        expiry_threshold: Duration,
    ) -> Result<Self> {
        if freshness_threshold > expiry_threshold {
            return Err(GraphError::InvalidThreshold(format!(
                "freshness {freshness_threshold:?} exceeds expiry {expiry_threshold:?}"
            )));
        }
        Ok(Self {
            origin: origin.into(),
            pair,
            freshness_threshold,
            expiry_threshold,
            point: RwLock::new(None),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    /// Store `point` as the latest observation
    ///
    /// A valid point must be for this leaf's pair and must not be older than a valid
    /// point already stored. An error point replaces a valid point only once that point
    /// has expired, so a failed refresh keeps serving the last good price.
    pub fn record(&self, point: Point) -> Result<()> {
        self.record_at(point, Utc::now())
    }

    pub fn record_at(&self, point: Point, now: DateTime<Utc>) -> Result<()> {
        if point.error.is_none() {
            if let Some(tick) = point.value.as_ref().and_then(|v| v.as_tick()) {
                if tick.pair != self.pair {
                    return Err(GraphError::PairMismatch {
                        expected: self.pair.clone(),
                        got: tick.pair.clone(),
                    });
                }
            }
        }

        let mut current = self.point.write();
        if let Some(existing) = current.as_ref().filter(|existing| existing.error.is_none()) {
            match &point.error {
                None if point.time < existing.time => {
                    return Err(GraphError::OlderPoint {
                        pair: self.pair.clone(),
                        time: point.time.to_rfc3339(),
                    });
                }
                Some(err) if Self::age(existing, now) <= self.expiry_threshold => {
                    return Err(GraphError::ErrorOverValidPoint {
                        pair: self.pair.clone(),
                        message: err.message.clone(),
                    });
                }
                _ => {}
            }
        }
        *current = Some(point);
        Ok(())
    }

    fn age(point: &Point, now: DateTime<Utc>) -> Duration {
        // points from the future count as brand new
        now.signed_duration_since(point.time).to_std().unwrap_or_default()
    }

    /// Whether the stored point is valid and younger than the freshness threshold
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.point.read().as_ref() {
            Some(point) if point.error.is_none() => Self::age(point, now) < self.freshness_threshold,
            _ => false,
        }
    }

    pub fn data_point(&self) -> Point {
        self.data_point_at(Utc::now())
    }

    pub fn data_point_at(&self, now: DateTime<Utc>) -> Point {
        let guard = self.point.read();
        let Some(point) = guard.as_ref() else {
            return Point::from_error(PointError::transient(format!(
                "no data point recorded for {} from origin {}",
                self.pair, self.origin
            )));
        };
        if point.error.is_none() && Self::age(point, now) > self.expiry_threshold {
            return Point::from_error(PointError::transient(format!(
                "data point for {} from origin {} expired at {}",
                self.pair,
                self.origin,
                point.time.to_rfc3339()
            )));
        }
        point.clone()
    }

    pub fn meta(&self) -> Meta {
        let mut meta = Meta::new();
        meta.insert("type".into(), "origin".into());
        meta.insert("origin".into(), self.origin.clone().into());
        meta.insert("pair".into(), self.pair.to_string().into());
        meta.insert("freshness_threshold".into(), self.freshness_threshold.as_secs().into());
        meta.insert("expiry_threshold".into(), self.expiry_threshold.as_secs().into());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use types::{ErrorKind, Tick};

    fn leaf() -> OriginNode {
        OriginNode::new(
            "balancer",
            Pair::new("RETH", "ETH"),
            Duration::from_secs(60),
            Duration::from_secs(300),
        )
        .unwrap()
    }

    fn point_at(pair: Pair, time: DateTime<Utc>) -> Point {
        Point::new(Tick::new(pair, "1.07".parse().unwrap()), time)
    }

    #[test]
    fn test_empty_leaf_reports_error() {
        let node = leaf();
        assert!(!node.is_fresh());
        assert_eq!(node.data_point().error.unwrap().kind, ErrorKind::Transient);
    }

    #[test]
    fn test_freshness_and_expiry() {
        let node = leaf();
        let t0 = Utc::now();
        node.record(point_at(Pair::new("RETH", "ETH"), t0)).unwrap();

        assert!(node.is_fresh_at(t0 + ChronoDuration::seconds(30)));
        assert!(!node.is_fresh_at(t0 + ChronoDuration::seconds(90)));
        assert!(node.data_point_at(t0 + ChronoDuration::seconds(90)).validate().is_ok());

        let expired = node.data_point_at(t0 + ChronoDuration::seconds(301));
        assert!(expired.error.unwrap().message.contains("expired"));
    }

    #[test]
    fn test_record_rejects_foreign_and_older_points() {
        let node = leaf();
        let t0 = Utc::now();
        node.record(point_at(Pair::new("RETH", "ETH"), t0)).unwrap();

        assert!(matches!(
            node.record(point_at(Pair::new("ETH", "USD"), t0)),
            Err(GraphError::PairMismatch { .. })
        ));
        assert!(matches!(
            node.record(point_at(Pair::new("RETH", "ETH"), t0 - ChronoDuration::seconds(5))),
            Err(GraphError::OlderPoint { .. })
        ));

        let fresh = Point::new(Tick::new(Pair::new("RETH", "ETH"), "1.08".parse().unwrap()), t0);
        node.record(fresh).unwrap();
        assert_eq!(node.data_point().tick().unwrap().price, Some("1.08".parse().unwrap()));
    }

    #[test]
    fn test_error_keeps_valid_point_until_expiry() {
        let node = leaf();
        let t0 = Utc::now();
        node.record_at(point_at(Pair::new("RETH", "ETH"), t0), t0).unwrap();

        let failure = Point::from_error(PointError::transient("rpc down"));
        assert!(matches!(
            node.record_at(failure.clone(), t0 + ChronoDuration::seconds(120)),
            Err(GraphError::ErrorOverValidPoint { .. })
        ));
        let kept = node.data_point_at(t0 + ChronoDuration::seconds(120));
        assert_eq!(kept.tick().unwrap().price, Some("1.07".parse().unwrap()));
        assert!(!node.is_fresh_at(t0 + ChronoDuration::seconds(120)));

        node.record_at(failure, t0 + ChronoDuration::seconds(301)).unwrap();
        let stored = node.data_point_at(t0 + ChronoDuration::seconds(301));
        assert_eq!(stored.error.unwrap().message, "rpc down");
    }

    #[test]
    fn test_error_replaces_error() {
        let node = leaf();
        node.record(Point::from_error(PointError::transient("rpc down"))).unwrap();
        node.record(Point::from_error(PointError::domain("pool drained"))).unwrap();
        assert_eq!(node.data_point().error.unwrap().message, "pool drained");

        node.record(point_at(Pair::new("RETH", "ETH"), Utc::now())).unwrap();
        assert!(node.data_point().validate().is_ok());
    }

    #[test]
    fn test_thresholds_are_ordered() {
        let result = OriginNode::new(
            "curve",
            Pair::new("STETH", "ETH"),
            Duration::from_secs(600),
            Duration::from_secs(60),
        );
        assert!(matches!(result, Err(GraphError::InvalidThreshold(_))));
    }
}
