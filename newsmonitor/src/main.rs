/*
newsmonitor - main.rs
Fetches every configured feed once, prints the new stories and exits.
*/

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use common::Config;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use newsmonitor::ingestion::HttpFeedFetcher;
use newsmonitor::output::ConsoleSink;
use newsmonitor::scraping::{Enricher, ReadabilityExtractor};
use newsmonitor::translation::detect::WhatlangDetector;
use newsmonitor::translation::remote::LibreTranslateClient;
use newsmonitor::translation::TitleTranslator;
use newsmonitor::{FeedProcessor, RunContext, Runner, SeenStore};

#[derive(Parser, Debug)]
#[command(name = "newsmonitor", about = "RSS monitor: fetch, filter, de-duplicate, translate and scrape news")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the seen-links state file
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Override the log file (stdout logging is always on)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Override the recency window
    #[arg(long, value_name = "HOURS")]
    lookback_hours: Option<u64>,

    /// Keep titles as published
    #[arg(long)]
    no_translate: bool,

    /// Do not scrape article pages for excerpts
    #[arg(long)]
    no_enrich: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");
    let override_path = match args.config {
        Some(ref p) if !p.exists() => {
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(ref p) => Some(p.clone()),
        None => Some(PathBuf::from("config.toml")).filter(|p| p.exists()),
    };

    let mut config = Config::load_with_defaults(Some(default_path.as_path()), override_path.as_deref()).await?;
    apply_overrides(&mut config, &args);

    let log_file = args
        .log_file
        .clone()
        .or_else(|| config.logging.file.as_ref().map(PathBuf::from));
    init_logging(&config.logging.level, log_file.as_deref())?;
    info!(default_path = ?default_path, override_path = ?override_path, "configuration loaded");

    if let Err(e) = config.validate() {
        error!(%e, "invalid configuration");
        return Err(e);
    }
    if config.feeds.is_empty() {
        warn!("no feeds configured, nothing to do");
    }

    let store = SeenStore::load(&config.state.path)
        .await
        .context("cannot start without a readable seen-links file")?;

    let runner = build_runner(&config)?;
    let mut ctx = RunContext::new(store, Utc::now(), config.recency.lookback_hours)?;
    info!(
        feeds = runner.feeds().len(),
        threshold = %ctx.threshold,
        seen = ctx.store.len(),
        "starting run"
    );

    runner.run(&mut ctx).await?;
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(ref state) = args.state {
        config.state.path = state.to_string_lossy().to_string();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(hours) = args.lookback_hours {
        config.recency.lookback_hours = hours;
    }
    if args.no_translate {
        config.translation.enabled = false;
    }
    if args.no_enrich {
        config.enrichment.enabled = false;
    }
}

/// Stdout plus an optional append-only log file without ANSI colours.
fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match file {
        Some(path) => {
            let f = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(f)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn build_runner(config: &Config) -> Result<Runner> {
    let politeness = &config.politeness;
    let fetcher = HttpFeedFetcher::new(politeness.fetch_timeout_seconds, &politeness.user_agent)?;

    let translator = if config.translation.enabled {
        let tcfg = &config.translation;
        let api_key = tcfg.api_key_env.as_deref().and_then(|var| std::env::var(var).ok());
        let remote = LibreTranslateClient::new(tcfg.api_url.clone(), tcfg.timeout_seconds)?.with_api_key(api_key);
        info!(target_lang = %tcfg.target_lang, api = %tcfg.api_url, "title translation enabled");
        Some(TitleTranslator::from_config(tcfg, Box::new(WhatlangDetector), Box::new(remote)))
    } else {
        info!("title translation disabled");
        None
    };

    let enricher = if config.enrichment.enabled {
        let extractor = ReadabilityExtractor::new(config.enrichment.timeout_seconds, &politeness.user_agent)?;
        Some(Enricher::from_config(&config.enrichment, Box::new(extractor)))
    } else {
        info!("article scraping disabled");
        None
    };

    let processor = FeedProcessor::new(Box::new(fetcher), Arc::new(ConsoleSink))
        .with_translator(translator)
        .with_enricher(enricher)
        .with_persist_policy(config.state.on_persist_failure);

    Ok(Runner::new(
        processor,
        config.feeds.clone(),
        Duration::from_secs(politeness.delay_seconds),
    ))
}
