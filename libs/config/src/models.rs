//! Model configuration
//!
//! A model is a named price graph. Its root node and every combinator below it are
//! described by [`ModelNode`], which mirrors the graph node set one to one.

use bn::DecFloatPointNumber;
use serde::{Deserialize, Serialize};
use types::Pair;

fn default_freshness_secs() -> u64 {
    60
}

fn default_expiry_secs() -> u64 {
    600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub node: ModelNode,
}

/// Graph node description, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelNode {
    Origin {
        origin: String,
        pair: Pair,
        #[serde(default = "default_freshness_secs")]
        freshness_secs: u64,
        #[serde(default = "default_expiry_secs")]
        expiry_secs: u64,
    },
    Indirect {
        sources: Vec<ModelNode>,
    },
    Invert {
        sources: Vec<ModelNode>,
    },
    Median {
        pair: Pair,
        min_values: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_time_diff_secs: Option<u64>,
        sources: Vec<ModelNode>,
    },
    Reference {
        model: String,
    },
    DevCircuitBreaker {
        value: Box<ModelNode>,
        reference: Box<ModelNode>,
        threshold: DecFloatPointNumber,
    },
}

impl ModelNode {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Origin { .. } => "origin",
            Self::Indirect { .. } => "indirect",
            Self::Invert { .. } => "invert",
            Self::Median { .. } => "median",
            Self::Reference { .. } => "reference",
            Self::DevCircuitBreaker { .. } => "dev_circuit_breaker",
        }
    }

    /// Direct child descriptions in evaluation order
    pub fn children(&self) -> Vec<&ModelNode> {
        match self {
            Self::Origin { .. } | Self::Reference { .. } => Vec::new(),
            Self::Indirect { sources } | Self::Invert { sources } | Self::Median { sources, .. } => {
                sources.iter().collect()
            }
            Self::DevCircuitBreaker { value, reference, .. } => vec![value.as_ref(), reference.as_ref()],
        }
    }

    /// Visit this node and all descendants, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ModelNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Names of the models this subtree refers to
    pub fn referenced_models(&self) -> Vec<&str> {
        let mut models = Vec::new();
        self.walk(&mut |node| {
            if let ModelNode::Reference { model } = node {
                models.push(model.as_str());
            }
        });
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STETH_USD: &str = r#"
name = "STETH/USD"

[node]
type = "indirect"

[[node.sources]]
type = "median"
pair = "STETH/ETH"
min_values = 1
sources = [
    { type = "origin", origin = "curve", pair = "STETH/ETH" },
    { type = "origin", origin = "balancer", pair = "STETH/ETH", freshness_secs = 30 },
]

[[node.sources]]
type = "reference"
model = "ETH/USD"
"#;

    #[test]
    fn test_nested_model_parses() {
        let model: ModelConfig = toml::from_str(STETH_USD).unwrap();
        assert_eq!(model.name, "STETH/USD");
        assert_eq!(model.node.kind(), "indirect");

        let children = model.node.children();
        assert_eq!(children.len(), 2);
        let ModelNode::Median { sources, min_values, max_time_diff_secs, .. } = children[0] else {
            panic!("expected median");
        };
        assert_eq!(*min_values, 1);
        assert_eq!(*max_time_diff_secs, None);
        assert_eq!(
            sources[0],
            ModelNode::Origin {
                origin: "curve".into(),
                pair: Pair::new("STETH", "ETH"),
                freshness_secs: 60,
                expiry_secs: 600,
            }
        );
        assert!(matches!(sources[1], ModelNode::Origin { freshness_secs: 30, .. }));
    }

    #[test]
    fn test_walk_and_references() {
        let model: ModelConfig = toml::from_str(STETH_USD).unwrap();
        let mut kinds = Vec::new();
        model.node.walk(&mut |node| kinds.push(node.kind()));
        assert_eq!(kinds, vec!["indirect", "median", "origin", "origin", "reference"]);
        assert_eq!(model.node.referenced_models(), vec!["ETH/USD"]);
    }

    #[test]
    fn test_circuit_breaker_threshold() {
        let node: ModelNode = toml::from_str(
            r#"
type = "dev_circuit_breaker"
threshold = "0.02"
value = { type = "origin", origin = "curve", pair = "STETH/ETH" }
reference = { type = "reference", model = "STETH/ETH" }
"#,
        )
        .unwrap();
        let ModelNode::DevCircuitBreaker { threshold, .. } = &node else {
            panic!("expected circuit breaker");
        };
        assert_eq!(threshold.to_string(), "0.02");
        assert_eq!(node.children().len(), 2);
    }
}
