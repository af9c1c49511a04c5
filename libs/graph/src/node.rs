//! Closed set of graph nodes

use crate::breaker::DevCircuitBreakerNode;
use crate::error::{GraphError, Result};
use crate::indirect::IndirectNode;
use crate::invert::InvertNode;
use crate::median::MedianNode;
use crate::origin::OriginNode;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use types::{Meta, Point, PointError, Tick};

/// Node of the price graph
///
/// Graphs are built once and are immutable afterwards, except for the point recorded on
/// origin leaves.
#[derive(Debug)]
pub enum Node {
    Origin(OriginNode),
    Indirect(IndirectNode),
    Invert(InvertNode),
    Median(MedianNode),
    Reference(ReferenceNode),
    DevCircuitBreaker(DevCircuitBreakerNode),
}

impl Node {
    pub fn data_point(&self) -> Point {
        match self {
            Node::Origin(node) => node.data_point(),
            Node::Indirect(node) => node.data_point(),
            Node::Invert(node) => node.data_point(),
            Node::Median(node) => node.data_point(),
            Node::Reference(node) => node.data_point(),
            Node::DevCircuitBreaker(node) => node.data_point(),
        }
    }

    /// Direct children; empty for origin leaves
    pub fn nodes(&self) -> &[Arc<Node>] {
        match self {
            Node::Origin(_) => &[],
            Node::Indirect(node) => node.nodes(),
            Node::Invert(node) => node.nodes(),
            Node::Median(node) => node.nodes(),
            Node::Reference(node) => node.nodes(),
            Node::DevCircuitBreaker(node) => node.nodes(),
        }
    }

    pub fn meta(&self) -> Meta {
        match self {
            Node::Origin(node) => node.meta(),
            Node::Indirect(_) => type_meta("indirect"),
            Node::Invert(_) => type_meta("invert"),
            Node::Median(node) => node.meta(),
            Node::Reference(node) => node.meta(),
            Node::DevCircuitBreaker(node) => node.meta(),
        }
    }

    pub fn as_origin(&self) -> Option<&OriginNode> {
        match self {
            Node::Origin(node) => Some(node),
            _ => None,
        }
    }
}

pub(crate) fn type_meta(kind: &str) -> Meta {
    let mut meta = Meta::new();
    meta.insert("type".into(), kind.into());
    meta
}

/// Another model's node, exposed unchanged
#[derive(Debug)]
pub struct ReferenceNode {
    model: String,
    children: Vec<Arc<Node>>,
}

impl ReferenceNode {
    pub fn new(model: impl Into<String>, node: Arc<Node>) -> Self {
        Self {
            model: model.into(),
            children: vec![node],
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn data_point(&self) -> Point {
        self.children[0].data_point()
    }

    pub fn meta(&self) -> Meta {
        let mut meta = type_meta("reference");
        meta.insert("model".into(), self.model.clone().into());
        meta
    }
}

/// Serializable shape of a node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescription {
    pub meta: Meta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeDescription>,
}

pub fn describe(node: &Node) -> NodeDescription {
    NodeDescription {
        meta: node.meta(),
        nodes: node.nodes().iter().map(|child| describe(child)).collect(),
    }
}

/// Every origin leaf reachable from `roots`, each listed once
pub fn origin_leaves(roots: &[Arc<Node>]) -> Vec<Arc<Node>> {
    let mut seen = HashSet::new();
    let mut leaves = Vec::new();
    let mut stack: Vec<Arc<Node>> = roots.iter().rev().cloned().collect();

    while let Some(node) = stack.pop() {
        if !seen.insert(Arc::as_ptr(&node)) {
            continue;
        }
        if node.as_origin().is_some() {
            leaves.push(node);
        } else {
            stack.extend(node.nodes().iter().rev().cloned());
        }
    }
    leaves
}

/// Validated tick of a child point; the child's error kind is kept
pub(crate) fn child_tick(point: &Point) -> std::result::Result<Tick, PointError> {
    point
        .tick()
        .cloned()
        .map_err(|err| err.context("invalid child data point"))
}

pub(crate) fn expect_children(node: &'static str, expected: &'static str, got: usize, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(GraphError::InvalidChildCount { node, expected, got })
    }
}
