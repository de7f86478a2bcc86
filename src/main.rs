mod config;
mod diff;
mod error;
mod logging;
mod models;
mod notify;
mod retry;
mod scrapers;
mod storage;
mod watcher;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use notify::TelegramNotifier;
use scrapers::{DivarClient, ListingFetcher};
use storage::JsonSnapshotStore;
use tokio::sync::watch;
use tracing::{error, info, warn};
use watcher::{Watcher, WatcherOptions};

/// Watch Divar rental listings and forward new ones to Telegram
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // No subscriber exists until logging is initialised
    let config = match startup(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Critical error: {e:#}");
            return ExitCode::from(1);
        }
    };

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Critical error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn startup(cli: &Cli) -> Result<Config> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    logging::init(&config.settings.log_level, config.settings.log_file.as_deref())?;
    Ok(config)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    info!("🏠 divar-watch - Divar listing notifier");
    info!(
        cities = ?config.divar.filters.city_ids,
        category = %config.divar.filters.category,
        districts = config.divar.filters.districts.len(),
        "Search filters loaded"
    );

    let client = DivarClient::new(
        config.divar.endpoint.clone(),
        config.divar.filters.clone(),
        config.divar.authorization.as_deref(),
        config.divar.request_timeout,
        config.settings.retry,
    )?;
    let source = Arc::new(ListingFetcher::new(client, config.settings.page_delay));
    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram.token,
        config.telegram.chat_id.clone(),
        config.settings.retry,
    )?);
    let store = Arc::new(JsonSnapshotStore::new(&config.settings.snapshot_path));
    info!("Snapshot file: {:?}", store.path());

    let options = WatcherOptions {
        fetch_interval: config.settings.fetch_interval,
        message_delay: config.settings.message_delay,
        post_base_url: config.divar.post_base_url.clone(),
        filter: config.filter.clone(),
    };
    let mut watcher = Watcher::new(source, notifier, store, options).await;

    if cli.once {
        let outcome = watcher.run_cycle().await;
        info!(?outcome, baseline = watcher.snapshot().len(), "Single cycle finished");
        return Ok(());
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current step...");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                // Keep the sender alive so the loop keeps its normal schedule
                std::future::pending::<()>().await;
            }
        }
    });

    watcher.run(stop_rx).await;
    Ok(())
}
