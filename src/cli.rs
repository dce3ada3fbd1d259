//! Command-line interface definition for kube-nats-bridge
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the long-running `run` command and the `tail` diagnostic
//! subscriber.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kube-nats-bridge - Kubernetes event and namespace bridge to NATS
///
/// Watches cluster events and namespace lifecycle changes and republishes
/// each one as a flat JSON message on `{prefix}.events`.
#[derive(Parser, Debug, Clone)]
#[command(name = "kube-nats-bridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/bridge.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the bridge until SIGINT or SIGTERM
    Run {
        /// Path to a kubeconfig file (defaults to in-cluster configuration)
        #[arg(long)]
        kubeconfig: Option<String>,

        /// NATS server URL
        #[arg(long)]
        nats: Option<String>,

        /// Topic prefix; messages are published to `<PREFIX>.events`
        #[arg(long)]
        topic_prefix: Option<String>,

        /// Cluster label stamped on every message
        #[arg(long)]
        cluster: Option<String>,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,

        /// Also append logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Subscribe to bridge messages and print them
    Tail {
        /// NATS server URL
        #[arg(long)]
        nats: Option<String>,

        /// Subject to subscribe to (defaults to the bridge topic; `>` for everything)
        #[arg(short, long)]
        subject: Option<String>,

        /// Pretty-print JSON payloads
        #[arg(short, long)]
        pretty: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
