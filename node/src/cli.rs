//! # CLI Interface
//!
//! Defines the command-line argument structure for `orbit-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ORBIT validator node.
///
/// A full node for the ORBIT settlement network. Runs the transaction
/// pool worker, accepts transactions, and collates block candidates for
/// the proposer.
#[derive(Parser, Debug)]
#[command(
    name = "orbit-node",
    about = "ORBIT validator node",
    version,
    propagate_version = true
)]
pub struct OrbitNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the ORBIT node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Initialize a new node — creates the data directory and generates
    /// a fresh validator keypair.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where the pool database and keys
    /// are stored. Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "ORBIT_DATA_DIR", default_value = "~/.orbit")]
    pub data_dir: PathBuf,

    /// Maximum number of transactions the pool will hold.
    #[arg(long, env = "ORBIT_POOL_CAPACITY", default_value_t = orbit_protocol::config::MAX_TRANSACTIONS_IN_POOL)]
    pub pool_capacity: usize,

    /// Maximum pending transactions per sender.
    #[arg(long, env = "ORBIT_POOL_PER_SENDER", default_value_t = orbit_protocol::config::MAX_TRANSACTIONS_PER_SENDER)]
    pub pool_per_sender: usize,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "ORBIT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Seconds between pool status reports.
    #[arg(long, default_value_t = 30)]
    pub status_interval: u64,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "ORBIT_DATA_DIR", default_value = "~/.orbit")]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        OrbitNodeCli::command().debug_assert();
    }
}
