use std::error::Error;
use std::sync::Arc;

use airoam_news::NewsAggregator;
use airoam_news::api;
use airoam_news::cli::Cli;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "airoam_news starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        arxiv = config.aggregator.arxiv.is_some(),
        blogs = config.aggregator.blogs.len(),
        curated = config.aggregator.curated,
        request_timeout_secs = config.aggregator.request_timeout_secs,
        aggregate_timeout_secs = config.aggregator.aggregate_timeout_secs,
        "Configured news sources"
    );

    let aggregator = Arc::new(NewsAggregator::new(&config.aggregator)?);
    debug!(?aggregator, "Aggregator ready");

    api::serve(aggregator, &config.server).await?;
    Ok(())
}
