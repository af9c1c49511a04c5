//! Named models over the price graph

use crate::error::{ProviderError, Result};
use crate::updater::{UpdateSummary, Updater};
use graph::{describe, origin_leaves, Node, NodeDescription};
use origins::FetchContext;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use types::Point;

/// Evaluates models by name, refreshing their origin leaves first when an updater is set
pub struct Provider {
    models: HashMap<String, Arc<Node>>,
    updater: Option<Updater>,
}

impl Provider {
    pub fn new(models: HashMap<String, Arc<Node>>, updater: Option<Updater>) -> Self {
        Self { models, updater }
    }

    fn node(&self, model: &str) -> Result<&Arc<Node>> {
        self.models.get(model).ok_or_else(|| ProviderError::ModelNotFound {
            model: model.to_string(),
        })
    }

    /// Refresh the stale leaves below `roots`; a no-op without an updater
    async fn refresh(&self, ctx: &FetchContext, roots: &[Arc<Node>]) -> UpdateSummary {
        match &self.updater {
            Some(updater) => updater.update(ctx, &origin_leaves(roots)).await,
            None => UpdateSummary::default(),
        }
    }

    pub async fn data_point(&self, ctx: &FetchContext, model: &str) -> Result<Point> {
        let node = self.node(model)?.clone();
        self.refresh(ctx, std::slice::from_ref(&node)).await;
        debug!(model, "Evaluating model");
        Ok(node.data_point())
    }

    /// Points for every model in `models`
    ///
    /// Failures of single models come back as error points; only an unknown model name
    /// fails the call.
    pub async fn data_points(&self, ctx: &FetchContext, models: &[&str]) -> Result<HashMap<String, Point>> {
        let nodes = models
            .iter()
            .map(|model| Ok((model.to_string(), self.node(model)?.clone())))
            .collect::<Result<Vec<_>>>()?;
        let roots: Vec<Arc<Node>> = nodes.iter().map(|(_, node)| node.clone()).collect();
        self.refresh(ctx, &roots).await;
        Ok(nodes
            .into_iter()
            .map(|(model, node)| (model, node.data_point()))
            .collect())
    }

    /// Refresh every stale leaf of every model
    pub async fn update_all(&self, ctx: &FetchContext) -> UpdateSummary {
        let roots: Vec<Arc<Node>> = self.models.values().cloned().collect();
        self.refresh(ctx, &roots).await
    }

    pub fn model(&self, name: &str) -> Result<NodeDescription> {
        Ok(describe(self.node(name)?))
    }

    pub fn models(&self, names: &[&str]) -> Result<HashMap<String, NodeDescription>> {
        names
            .iter()
            .map(|name| Ok((name.to_string(), self.model(name)?)))
            .collect()
    }

    /// Model names, sorted
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }
}
