//! # dongarid — club backend notification service
//!
//! Boots the notification engine: opens the store, reconciles every
//! stored notice into the in-memory job registry, then keeps the
//! scheduler alive until shutdown. The HTTP-facing CRUD layer attaches
//! to the same registry and store.
//!
//! Usage:
//!   dongarid                          # Default config (~/.dongari/config.toml)
//!   dongarid --db ./club.db           # Explicit database path
//!   dongarid --fcm-key AAAA...        # FCM server key override

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dongari_core::DongariConfig;
use dongari_notify::{Dispatcher, FcmClient, JobRegistry, Reconciler, SqliteStore};

#[derive(Parser)]
#[command(name = "dongarid", version, about = "Dongari club backend service")]
struct Cli {
    /// Config file path (default: ~/.dongari/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path (overrides config)
    #[arg(long)]
    db: Option<String>,

    /// FCM server key (overrides config)
    #[arg(long)]
    fcm_key: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "dongari_notify=debug,dongarid=debug"
    } else {
        "dongari_notify=info,dongarid=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config, apply CLI overrides
    let mut config = match &cli.config {
        Some(path) => DongariConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => DongariConfig::load()?,
    };
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Some(key) = &cli.fcm_key {
        config.fcm.server_key = key.clone();
    }

    // Open the durable store
    let db_path = expand_path(&config.database.path);
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(
        SqliteStore::open(std::path::Path::new(&db_path))
            .with_context(|| format!("failed to open store at {db_path}"))?,
    );
    tracing::info!("💾 Store opened: {db_path}");

    // Wire up the engine
    let dispatcher = Dispatcher::new(Arc::new(FcmClient::new(config.fcm.clone())));
    let registry = JobRegistry::new(dispatcher, store.clone());

    // Reconcile before accepting any traffic. A store failure here is
    // fatal — better to refuse to start than to run with a silently
    // empty schedule.
    let reconciler = Reconciler::new(store.clone(), registry.clone());
    let armed = reconciler
        .load_and_arm_all()
        .context("boot-time reconciliation failed")?;
    tracing::info!("⏰ Scheduler ready: {armed} notice(s) armed");

    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down ({} job(s) still armed)", registry.len());
    Ok(())
}
