//! Provider construction from node configuration

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::updater::Updater;
use bn::DecFloatPointNumber;
use graph::{
    DevCircuitBreakerNode, GraphError, IndirectNode, InvertNode, MedianNode, Node, OriginNode, ReferenceNode,
};
use node_config::{ModelConfig, ModelNode, NodeConfig};
use origins::{build_origins, ChainClient};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use types::Pair;

/// Leaves with the same origin, pair and thresholds are shared between models
type LeafKey = (String, Pair, u64, u64);

/// Builds every configured model, resolving references by name
struct ModelBuilder<'a> {
    config: &'a NodeConfig,
    built: HashMap<String, Arc<Node>>,
    in_progress: HashSet<String>,
    leaves: HashMap<LeafKey, Arc<Node>>,
}

impl<'a> ModelBuilder<'a> {
    fn new(config: &'a NodeConfig) -> Self {
        Self {
            config,
            built: HashMap::new(),
            in_progress: HashSet::new(),
            leaves: HashMap::new(),
        }
    }

    fn model(&mut self, model: &ModelConfig) -> Result<Arc<Node>> {
        if let Some(node) = self.built.get(&model.name) {
            return Ok(node.clone());
        }
        if !self.in_progress.insert(model.name.clone()) {
            return Err(ProviderError::ReferenceCycle {
                model: model.name.clone(),
            });
        }
        let node = self.node(&model.name, &model.node)?;
        self.in_progress.remove(&model.name);
        self.built.insert(model.name.clone(), node.clone());
        Ok(node)
    }

    fn node(&mut self, model: &str, node: &ModelNode) -> Result<Arc<Node>> {
        let graph_error = |source: GraphError| ProviderError::Graph {
            model: model.to_string(),
            source,
        };

        let built = match node {
            ModelNode::Origin {
                origin,
                pair,
                freshness_secs,
                expiry_secs,
            } => return self.leaf(model, origin, pair, *freshness_secs, *expiry_secs),
            ModelNode::Indirect { sources } => Node::Indirect(IndirectNode::new(self.nodes(model, sources)?)),
            ModelNode::Invert { sources } => {
                Node::Invert(InvertNode::with_children(self.nodes(model, sources)?).map_err(graph_error)?)
            }
            ModelNode::Median {
                pair,
                min_values,
                max_time_diff_secs,
                sources,
            } => Node::Median(
                MedianNode::new(
                    pair.clone(),
                    *min_values,
                    max_time_diff_secs.map(Duration::from_secs),
                    self.nodes(model, sources)?,
                )
                .map_err(graph_error)?,
            ),
            ModelNode::Reference { model: reference } => {
                let target = self.config.model(reference).ok_or_else(|| ProviderError::UnknownReference {
                    model: model.to_string(),
                    reference: reference.clone(),
                })?;
                Node::Reference(ReferenceNode::new(reference.clone(), self.model(target)?))
            }
            ModelNode::DevCircuitBreaker {
                value,
                reference,
                threshold,
            } => self.breaker(model, value, reference, threshold)?,
        };
        Ok(Arc::new(built))
    }

    fn nodes(&mut self, model: &str, sources: &[ModelNode]) -> Result<Vec<Arc<Node>>> {
        sources.iter().map(|source| self.node(model, source)).collect()
    }

    fn breaker(
        &mut self,
        model: &str,
        value: &ModelNode,
        reference: &ModelNode,
        threshold: &DecFloatPointNumber,
    ) -> Result<Node> {
        let value = self.node(model, value)?;
        let reference = self.node(model, reference)?;
        DevCircuitBreakerNode::new(value, reference, threshold.clone())
            .map(Node::DevCircuitBreaker)
            .map_err(|source| ProviderError::Graph {
                model: model.to_string(),
                source,
            })
    }

    fn leaf(&mut self, model: &str, origin: &str, pair: &Pair, freshness: u64, expiry: u64) -> Result<Arc<Node>> {
        if !self.config.origins.contains_key(origin) {
            return Err(ProviderError::UnknownOrigin {
                model: model.to_string(),
                origin: origin.to_string(),
            });
        }
        let key = (origin.to_string(), pair.clone(), freshness, expiry);
        if let Some(leaf) = self.leaves.get(&key) {
            return Ok(leaf.clone());
        }
        let leaf = OriginNode::new(
            origin,
            pair.clone(),
            Duration::from_secs(freshness),
            Duration::from_secs(expiry),
        )
        .map_err(|source| ProviderError::Graph {
            model: model.to_string(),
            source,
        })?;
        let leaf = Arc::new(Node::Origin(leaf));
        self.leaves.insert(key, leaf.clone());
        Ok(leaf)
    }
}

/// Build every model of `config` without origins or updater
pub fn build_models(config: &NodeConfig) -> Result<HashMap<String, Arc<Node>>> {
    let mut builder = ModelBuilder::new(config);
    for model in &config.models {
        builder.model(model)?;
    }
    Ok(builder.built)
}

/// Validate `config`, build its origins and models, and wire them into a provider that
/// refreshes leaves before every evaluation
pub fn build_provider(config: &NodeConfig, client: Option<Arc<dyn ChainClient>>) -> Result<Provider> {
    config.validate()?;
    let origins = build_origins(config, client)?;
    let models = build_models(config)?;
    info!(origins = origins.len(), models = models.len(), "Provider ready");
    let updater = Updater::new(origins, &config.updater);
    Ok(Provider::new(models, Some(updater)))
}
