//! Node configuration loading and validation

use crate::models::{ModelConfig, ModelNode};
use crate::origins::OriginConfig;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "PRISM";

/// Multicall3, deployed at the same address on every EVM chain
pub const DEFAULT_MULTICALL_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSettings,

    /// Required as soon as one on-chain origin is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethereum: Option<EthereumConfig>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub updater: UpdaterConfig,

    #[serde(default)]
    pub origins: BTreeMap<String, OriginConfig>,

    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Seconds between update passes of the running node
    pub interval_secs: u64,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            interval_secs: 30,
        }
    }
}

impl NodeSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthereumConfig {
    pub rpc_url: String,
    #[serde(default = "default_multicall_address")]
    pub multicall_address: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_multicall_address() -> String {
    DEFAULT_MULTICALL_ADDRESS.to_string()
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

impl EthereumConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry policy for idempotent chain reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Most pairs requested from one origin in a single fetch
    pub batch_size: usize,
    /// Most fetches in flight at once
    pub max_concurrency: usize,
    /// Deadline of one update pass
    pub timeout_ms: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_concurrency: 8,
            timeout_ms: 15_000,
        }
    }
}

impl UpdaterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Semantic problems found after deserialization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("model name must not be empty")]
    EmptyModelName,

    #[error("model {0} is defined more than once")]
    DuplicateModel(String),

    #[error("model {model}: median min_values must be at least 1")]
    ZeroMinValues { model: String },

    #[error("model {model}: invert takes exactly one source, got {got}")]
    InvertSources { model: String, got: usize },

    #[error("model {model}: unknown origin {origin}")]
    UnknownOrigin { model: String, origin: String },

    #[error("origin {origin}: block_offsets must not be empty")]
    EmptyBlockOffsets { origin: String },

    #[error("origin {origin} reads chain state but no [ethereum] section is configured")]
    MissingEthereum { origin: String },

    #[error("updater {field} must be at least 1")]
    ZeroUpdaterLimit { field: &'static str },
}

impl NodeConfig {
    /// Load from `path`, overlay `PRISM__*` environment variables, expand `${VAR}` in
    /// the RPC URL and validate
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading node config: {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()
            .context("Failed to build configuration")?;

        let mut node_config: NodeConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        node_config.expand_env_vars()?;
        node_config.validate().context("Invalid configuration")?;

        debug!(
            origins = node_config.origins.len(),
            models = node_config.models.len(),
            "Node config loaded"
        );
        Ok(node_config)
    }

    /// Expand environment variables in string values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        if let Some(ethereum) = self.ethereum.as_mut() {
            let expanded = shellexpand::env(&ethereum.rpc_url).context("Failed to expand RPC URL")?;
            ethereum.rpc_url = expanded.to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.updater.batch_size == 0 {
            return Err(ValidationError::ZeroUpdaterLimit { field: "batch_size" });
        }
        if self.updater.max_concurrency == 0 {
            return Err(ValidationError::ZeroUpdaterLimit {
                field: "max_concurrency",
            });
        }

        for (name, origin) in &self.origins {
            if origin.is_on_chain() {
                if origin.block_offsets().is_empty() {
                    return Err(ValidationError::EmptyBlockOffsets { origin: name.clone() });
                }
                if self.ethereum.is_none() {
                    return Err(ValidationError::MissingEthereum { origin: name.clone() });
                }
            }
        }

        let mut names = HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(ValidationError::EmptyModelName);
            }
            if !names.insert(model.name.as_str()) {
                return Err(ValidationError::DuplicateModel(model.name.clone()));
            }
            self.validate_node(&model.name, &model.node)?;
        }
        Ok(())
    }

    fn validate_node(&self, model: &str, root: &ModelNode) -> std::result::Result<(), ValidationError> {
        let mut result = Ok(());
        root.walk(&mut |node| {
            if result.is_err() {
                return;
            }
            result = match node {
                ModelNode::Median { min_values: 0, .. } => Err(ValidationError::ZeroMinValues {
                    model: model.to_string(),
                }),
                ModelNode::Invert { sources } if sources.len() != 1 => Err(ValidationError::InvertSources {
                    model: model.to_string(),
                    got: sources.len(),
                }),
                ModelNode::Origin { origin, .. } if !self.origins.contains_key(origin) => {
                    Err(ValidationError::UnknownOrigin {
                        model: model.to_string(),
                        origin: origin.clone(),
                    })
                }
                _ => Ok(()),
            };
        });
        result
    }

    /// Model definition by name
    pub fn model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|model| model.name == name)
    }

    /// Render the effective configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
