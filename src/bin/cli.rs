//! Module of the Week CLI
//!
//! Serves the scraped collection over HTTP, or runs a single scrape.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Client;
use motw::{
    error::{AppError, Result},
    models::Config,
    pipeline::RefreshScheduler,
    server::{self, AppState},
    services::{CommandBridge, HtmlExtractor, WebhookNotifier},
    utils::http,
};

/// motw - Module of the Week scraper and server
#[derive(Parser, Debug)]
#[command(name = "motw", version, about = "Module of the Week scraper and server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "motw.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh periodically and serve HTTP until Ctrl-C
    Serve {
        /// Listen address (overrides config and MOTW_BIND)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run one refresh cycle and print the collection
    Scrape,

    /// Validate the configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Shared HTTP client plus a scheduler scraping through it.
fn build_scheduler(config: &Config) -> Result<(Client, Arc<RefreshScheduler>)> {
    let client = http::create_async_client(&config.crawler)?;
    let extractor = Arc::new(HtmlExtractor::new(config, client.clone())?);
    Ok((client, RefreshScheduler::from_config(config, extractor)))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env()?;
    config.validate()?;
    log::debug!("Using source {}", config.source.base_url);

    match cli.command {
        Command::Serve { bind } => {
            let (client, scheduler) = build_scheduler(&config)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let notifier = Arc::new(WebhookNotifier::new(client));
            let bridge = CommandBridge::new(&config, Arc::clone(&scheduler), notifier);
            let state = AppState::new(&config, Arc::clone(&scheduler), bridge);

            log::info!(
                "Refreshing every {}s, keeping up to {} modules",
                config.refresh.interval_secs,
                config.refresh.cache_capacity
            );
            let refresher = scheduler.spawn();
            let served = server::serve(&bind, state).await;
            refresher.abort();
            served?;
        }

        Command::Scrape => {
            let (_, scheduler) = build_scheduler(&config)?;
            let modules = scheduler
                .refresh()
                .await
                .ok_or_else(|| AppError::extraction(&config.source.base_url, "refresh failed"))?;
            println!("{}", serde_json::to_string_pretty(modules.as_slice())?);
            log::info!("Scraped {} modules", modules.len());
        }

        Command::Validate => {
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
