//! Pair inversion

use crate::error::Result;
use crate::node::{child_tick, expect_children, Node};
use std::sync::Arc;
use types::{Point, Tick};

/// Swaps base and quote of its single child
///
/// The price becomes its reciprocal and the volume, if present, is converted into the
/// new base asset by multiplying with the original price.
#[derive(Debug)]
pub struct InvertNode {
    children: Vec<Arc<Node>>,
}

impl InvertNode {
    pub fn new(child: Arc<Node>) -> Self {
        Self { children: vec![child] }
    }

    /// Fails unless exactly one child is given
    pub fn with_children(children: Vec<Arc<Node>>) -> Result<Self> {
        expect_children("invert", "exactly 1", children.len(), children.len() == 1)?;
        Ok(Self { children })
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn data_point(&self) -> Point {
        invert(self.children[0].data_point())
    }
}

fn invert(point: Point) -> Point {
    let tick = match child_tick(&point) {
        Ok(tick) => tick,
        Err(err) => return Point::from_error(err).with_sub_points(vec![point]),
    };

    let Some(price) = tick.price.as_ref() else {
        return point;
    };
    let inverted_price = match price.inv() {
        Ok(inverted) => inverted,
        Err(err) => return Point::from_error(err.into()).with_sub_points(vec![point]),
    };
    let volume = tick.volume24h.as_ref().map(|volume| volume * price);

    let inverted = Tick {
        pair: tick.pair.invert(),
        price: Some(inverted_price),
        volume24h: volume,
    };
    let time = point.time;
    Point::new(inverted, time).with_sub_points(vec![point])
}
