//! kube-nats-bridge - Kubernetes event and namespace bridge to NATS
//!
#![doc = "kube-nats-bridge - Kubernetes event and namespace bridge to NATS"]
#![doc = "Main entry point for the bridge application."]

use anyhow::Result;

use kube_nats_bridge::cli::{Cli, Commands};
use kube_nats_bridge::commands;
use kube_nats_bridge::config::Config;
use kube_nats_bridge::logging::{bootstrap_subscriber, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate configuration; warnings go to stderr until logging is up
    let config_path = cli.config.as_deref().unwrap_or("config/bridge.yaml");
    let config = tracing::subscriber::with_default(bootstrap_subscriber(std::io::stderr), || {
        Config::load(config_path, &cli)
    })?;

    // Initialize logging from the merged configuration
    init_logging(&config.logging)?;

    // Execute command
    match cli.command {
        Commands::Run { .. } => {
            tracing::info!(
                topic = %config.settings().topic,
                cluster = %config.bridge.cluster,
                "Starting bridge"
            );
            commands::r#run::run_bridge(config).await
        }
        Commands::Tail {
            subject, pretty, ..
        } => {
            tracing::info!("Starting tail");
            commands::tail::run_tail(config, subject, pretty).await
        }
    }
}
