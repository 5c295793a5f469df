//! `shelfscan` - batch product search from the command line.
//!
//! Results go to stdout as JSON; logs go to stderr.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use serde::Serialize;
use shelfscan_core::AppConfig;
use shelfscan_net::ReqwestTransport;
use shelfscan_registry::ScraperRegistry;
use shelfscan_scraper::ScrapeContext;
use std::sync::Arc;
use tracing::info;

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shelfscan=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::load().context("loading config")?,
    };
    config.apply_env();
    config.validate().context("validating config")?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting shelfscan v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;
    let transport = Arc::new(ReqwestTransport::new().context("building HTTP client")?);
    let context = ScrapeContext::from_config(&config, transport);
    let registry = ScraperRegistry::with_default_sources(context, &config)?;

    match cli.command {
        Command::Search {
            query,
            sources,
            categories,
        } => {
            let batch = registry
                .batch_search(&query, Some(sources.as_slice()), Some(categories.as_slice()))
                .await?;
            print_json(&batch)?;
        }
        Command::Product { source, url } => {
            let scraper = registry.get(&source)?;
            let record = scraper
                .get_product(&url)
                .await
                .with_context(|| format!("fetching {url} from {source}"))?;
            print_json(&record)?;
        }
        Command::Sources => print_json(&registry.all_stats())?,
    }

    Ok(())
}
