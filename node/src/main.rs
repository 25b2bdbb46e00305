// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # ORBIT Node
//!
//! Entry point for the `orbit-node` binary. Parses CLI arguments,
//! initializes logging, opens the pool database, and runs the
//! transaction pool worker until shutdown.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the node
//! - `init`    — initialize data directory and generate keys
//! - `version` — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use orbit_protocol::crypto::keys::OrbitKeypair;
use orbit_protocol::pool::{
    spawn_pool_worker, Collator, CollatorConfig, GasPricePolicy, PoolConfig, PoolStore, Service,
};
use orbit_protocol::state::StateLedger;

use cli::{Commands, OrbitNodeCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = OrbitNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: pool storage, execution-state view, pool worker, and
/// the status reporting loop. Runs until SIGINT.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "orbit_node=info,orbit_protocol=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        data_dir = %args.data_dir.display(),
        pool_capacity = args.pool_capacity,
        "starting orbit-node"
    );

    // --- Pool storage ---
    let pool_path = args.data_dir.join("pool");
    std::fs::create_dir_all(&pool_path)
        .with_context(|| format!("failed to create pool directory: {}", pool_path.display()))?;
    let store = PoolStore::open(&pool_path)
        .with_context(|| format!("failed to open pool storage at {}", pool_path.display()))?;
    tracing::info!(path = %pool_path.display(), "pool storage opened");

    // --- Execution state ---
    // The in-memory ledger stands in for the execution engine's confirmed
    // state view. Block sync and commit notifications feed it at runtime.
    let ledger = Arc::new(StateLedger::new());

    // --- Pool worker ---
    let pool_config = PoolConfig {
        max_transactions_in_pool: args.pool_capacity,
        max_transactions_per_sender: args.pool_per_sender,
        ..PoolConfig::default()
    };
    let service = Service::new(
        pool_config,
        Arc::new(GasPricePolicy),
        Arc::clone(&ledger) as _,
        store,
    );
    let collator = Collator::new(CollatorConfig::default());
    let (pool, worker) = spawn_pool_worker(service, collator);
    tracing::info!("pool worker spawned");

    // --- Status loop ---
    let status_pool = pool.clone();
    let status_interval = args.status_interval.max(1);
    let status_loop = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(status_interval));
        loop {
            interval.tick().await;
            match status_pool.pool_size().await {
                Ok(size) => tracing::info!(pool_size = size, "pool status"),
                Err(error) => {
                    tracing::error!(%error, "pool worker unreachable");
                    break;
                }
            }
        }
    });

    // --- Run until interrupted ---
    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");

    status_loop.abort();
    worker.stop().await;
    tracing::info!("orbit-node stopped");

    Ok(())
}

/// Initializes a data directory: creates it and writes a fresh validator
/// keypair.
fn init_node(args: cli::InitArgs) -> Result<()> {
    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;

    let key_path = args.data_dir.join("validator.key");
    if key_path.exists() {
        anyhow::bail!(
            "refusing to overwrite existing key at {}",
            key_path.display()
        );
    }

    let keypair = OrbitKeypair::generate();
    std::fs::write(&key_path, hex::encode(keypair.to_bytes()))
        .with_context(|| format!("failed to write key file: {}", key_path.display()))?;

    println!("data directory: {}", args.data_dir.display());
    println!("validator key:  {}", key_path.display());
    println!("address:        {}", keypair.address());
    Ok(())
}

/// Prints version information.
fn print_version() {
    println!(
        "orbit-node {} (protocol {}.{})",
        env!("CARGO_PKG_VERSION"),
        orbit_protocol::config::PROTOCOL_VERSION_MAJOR,
        orbit_protocol::config::PROTOCOL_VERSION_MINOR,
    );
}
