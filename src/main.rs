//! StraddleMonitor - Main Entry Point
//!
//! Replays a JSON-lines tick file through every configured position monitor
//! and prints the resulting summary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use straddle_monitor::config::load_config;
use straddle_monitor::{ReplayFeed, ReplaySession};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "MONITOR_CONFIG")]
    config: String,

    /// JSON-lines tick file (overrides replay.ticks_path)
    #[arg(short, long)]
    ticks: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides settings.log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = load_config(Some(&args.config))
        .with_context(|| format!("loading configuration from {}", args.config))?;

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_logging(&level, args.json_logs || config.settings.json_logs)?;

    info!("Starting StraddleMonitor replay");
    info!("Configuration file: {}", args.config);

    let ticks_path = args
        .ticks
        .clone()
        .or_else(|| config.replay.ticks_path.clone())
        .context("no tick file: pass --ticks or set replay.ticks_path")?;
    let feed = ReplayFeed::from_path(&ticks_path)
        .with_context(|| format!("reading ticks from {}", ticks_path.display()))?;
    info!(batches = feed.len(), path = %ticks_path.display(), "Tick file loaded");

    let session = ReplaySession::from_config(&config)?;

    tokio::select! {
        result = session.run(feed.into_stream()) => {
            let summary = result?;
            for exit in &summary.exits {
                info!(execution_id = %exit.execution_id, reason = %exit.reason, at = %exit.at, "Position exited");
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, replay interrupted");
        }
    }

    Ok(())
}
