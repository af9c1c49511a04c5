//! Prism node - refreshes and prints configured price models
//!
//! Usage:
//!   prism-node --config config/node.toml
//!   prism-node --config config/node.toml --model STETH/USD --once
//!   prism-node --config config/node.toml --print-config

use anyhow::{Context, Result};
use clap::Parser;
use node_config::NodeConfig;
use origins::{connect, FetchContext};
use provider::{build_provider, logging, Provider};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "prism-node")]
#[command(about = "Prism price oracle node")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Models to evaluate each round; all models when omitted
    #[arg(short, long)]
    model: Vec<String>,

    /// Evaluate once and exit
    #[arg(long)]
    once: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = NodeConfig::load(&args.config)?;
    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    logging::init(&config.node)?;
    info!("Starting Prism node");
    info!("Configuration: {}", args.config.display());

    let client = connect(&config).context("Failed to connect to Ethereum node")?;
    let provider = build_provider(&config, client).map_err(|e| {
        error!("Failed to build provider: {}", e);
        e
    })?;

    let models = if args.model.is_empty() {
        provider.model_names()
    } else {
        args.model.clone()
    };
    info!(models = models.len(), "Serving models");

    let mut interval = tokio::time::interval(config.node.interval());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let ctx = FetchContext::with_timeout(config.updater.timeout());
                evaluate(&provider, &ctx, &models).await?;
                if args.once {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                return Ok(());
            }
        }
    }
}

async fn evaluate(provider: &Provider, ctx: &FetchContext, models: &[String]) -> Result<()> {
    let names: Vec<&str> = models.iter().map(String::as_str).collect();
    let points = provider.data_points(ctx, &names).await?;
    for name in &names {
        let Some(point) = points.get(*name) else {
            continue;
        };
        match point.tick() {
            Ok(tick) => {
                let price = tick.price.as_ref().map(ToString::to_string).unwrap_or_default();
                info!(model = %name, %price, time = %point.time.to_rfc3339(), "Model price");
            }
            Err(err) => warn!(model = %name, kind = err.kind.as_str(), error = %err.message, "Model failed"),
        }
        println!("{name}\t{}", serde_json::to_string(point)?);
    }
    Ok(())
}
