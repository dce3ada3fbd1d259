//! The `run` command: connect both clients and run the bridge.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::control_plane::KubeControlPlane;
use crate::error::Result;
use crate::lifecycle::{shutdown_signal, Coordinator};
use crate::publisher::metrics::init_metrics_exporter;
use crate::publisher::nats::NatsBus;

/// Runs the bridge until SIGINT/SIGTERM or a fatal error.
///
/// The control-plane client and the bus connection are both established
/// before any watcher starts; failure of either aborts startup.
///
/// # Errors
///
/// Returns an error if either client cannot be created, or if the
/// coordinator stops on a fatal condition.
pub async fn run_bridge(config: Config) -> Result<()> {
    let settings = config.settings();

    let control_plane = KubeControlPlane::connect(&config.kube).await?;
    let bus = NatsBus::connect(&config.nats).await?;

    init_metrics_exporter();

    let coordinator = Coordinator::new(Arc::new(control_plane), Arc::new(bus), settings);
    coordinator.run(shutdown_signal()).await?;

    info!("Bridge stopped");
    Ok(())
}
