//! Quorum-bound median aggregation

use crate::error::{GraphError, Result};
use crate::node::{child_tick, type_meta, Node};
use bn::DecFloatPointNumber;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use types::{Meta, Pair, Point, PointError, Tick};

/// Median price of the children that produced a valid tick
///
/// Fails when fewer than `min_values` children are valid, when the valid ticks disagree
/// on the pair, or when their timestamps spread further than `max_time_diff`.
#[derive(Debug)]
pub struct MedianNode {
    pair: Pair,
    min_values: usize,
    max_time_diff: Option<Duration>,
    children: Vec<Arc<Node>>,
}

impl MedianNode {
    pub fn new(
        pair: Pair,
        min_values: usize,
        max_time_diff: Option<Duration>,
        children: Vec<Arc<Node>>,
    ) -> Result<Self> {
        if min_values == 0 {
            return Err(GraphError::InvalidMinValues);
        }
        expect_enough(children.len(), min_values)?;
        Ok(Self {
            pair,
            min_values,
            max_time_diff,
            children,
        })
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn data_point(&self) -> Point {
        let points: Vec<Point> = self.children.iter().map(|child| child.data_point()).collect();
        self.aggregate(points)
    }

    pub fn meta(&self) -> Meta {
        let mut meta = type_meta("aggregator");
        meta.insert("pair".into(), self.pair.to_string().into());
        meta.insert("min_values".into(), self.min_values.into());
        if let Some(diff) = self.max_time_diff {
            meta.insert("max_time_diff".into(), diff.as_secs().into());
        }
        meta
    }

    fn aggregate(&self, points: Vec<Point>) -> Point {
        let mut valid: Vec<(Tick, DateTime<Utc>)> = Vec::with_capacity(points.len());
        for point in &points {
            match child_tick(point) {
                Ok(tick) => valid.push((tick, point.time)),
                Err(err) => debug!(pair = %self.pair, error = %err, "skipping invalid median input"),
            }
        }

        match self.median(&valid) {
            Ok(point) => point.with_sub_points(points).with_meta("type", "aggregator"),
            Err(err) => Point::from_error(err).with_sub_points(points),
        }
    }

    fn median(&self, valid: &[(Tick, DateTime<Utc>)]) -> std::result::Result<Point, PointError> {
        if valid.len() < self.min_values {
            return Err(PointError::aggregation(format!(
                "not enough valid data points for {}: got {}, need {}",
                self.pair,
                valid.len(),
                self.min_values
            )));
        }
        if let Some((tick, _)) = valid.iter().find(|(tick, _)| tick.pair != self.pair) {
            return Err(PointError::aggregation(format!(
                "median of {} received a tick for {}",
                self.pair, tick.pair
            )));
        }

        let earliest = valid.iter().map(|(_, time)| *time).min();
        let latest = valid.iter().map(|(_, time)| *time).max();
        let (Some(earliest), Some(latest)) = (earliest, latest) else {
            return Err(PointError::aggregation("median of no data points"));
        };
        if let Some(max_diff) = self.max_time_diff {
            let spread = latest.signed_duration_since(earliest).to_std().unwrap_or_default();
            if spread > max_diff {
                return Err(PointError::aggregation(format!(
                    "data points for {} are {}s apart, more than {}s allowed",
                    self.pair,
                    spread.as_secs(),
                    max_diff.as_secs()
                )));
            }
        }

        let mut prices: Vec<&DecFloatPointNumber> = valid.iter().filter_map(|(tick, _)| tick.price.as_ref()).collect();
        prices.sort();
        let price = median_of_sorted(&prices)?;

        let volumes: Vec<&DecFloatPointNumber> = valid.iter().filter_map(|(tick, _)| tick.volume24h.as_ref()).collect();
        let volume = if volumes.is_empty() {
            None
        } else {
            Some(volumes.into_iter().fold(DecFloatPointNumber::zero(), |acc, v| &acc + v))
        };

        Ok(Point::new(
            Tick {
                pair: self.pair.clone(),
                price: Some(price),
                volume24h: volume,
            },
            earliest,
        ))
    }
}

fn expect_enough(children: usize, min_values: usize) -> Result<()> {
    if children < min_values {
        return Err(GraphError::InvalidChildCount {
            node: "median",
            expected: "at least min_values",
            got: children,
        });
    }
    Ok(())
}

fn median_of_sorted(prices: &[&DecFloatPointNumber]) -> std::result::Result<DecFloatPointNumber, PointError> {
    let n = prices.len();
    if n == 0 {
        return Err(PointError::aggregation("median of no prices"));
    }
    if n % 2 == 1 {
        return Ok(prices[n / 2].clone());
    }
    let half: DecFloatPointNumber = "0.5".parse()?;
    Ok(&(prices[n / 2 - 1] + prices[n / 2]) * &half)
}
