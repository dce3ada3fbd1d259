//! Bridge lifecycle
//!
//! The [`Coordinator`] owns both watchers for the life of the process:
//!
//! 1. Both watchers start concurrently and the state becomes `Running`.
//! 2. The coordinator waits for the event cache to sync (bounded by the
//!    configured timeout). Failure to sync is fatal.
//! 3. It then waits for a shutdown signal. A namespace subscription that
//!    cannot be established, or a watcher task that panics, is fatal.
//! 4. On shutdown the state becomes `ShuttingDown` and both watchers are
//!    cancelled. In-flight publishes are not drained.
//!
//! A namespace watch that the server closes is not fatal: it is logged and
//! the bridge keeps publishing events.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::BridgeSettings;
use crate::control_plane::ControlPlane;
use crate::decoder::Decoder;
use crate::error::{BridgeError, Result};
use crate::publisher::{MessageBus, Publisher};
use crate::watcher::{
    wait_for_cache_sync, EventWatcher, EventWatcherHandle, Forwarder, NamespaceWatcher,
};

/// Process lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    ShuttingDown,
}

/// Starts, supervises and stops the two watchers.
#[derive(Debug)]
pub struct Coordinator {
    control_plane: Arc<dyn ControlPlane>,
    bus: Arc<dyn MessageBus>,
    settings: BridgeSettings,
    state: watch::Sender<LifecycleState>,
}

impl Coordinator {
    /// Creates a coordinator in the `Starting` state.
    ///
    /// Both clients must already be connected.
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        bus: Arc<dyn MessageBus>,
        settings: BridgeSettings,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            control_plane,
            bus,
            settings,
            state,
        }
    }

    /// Subscribes to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Runs the bridge until `shutdown` resolves or a fatal condition occurs.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Resolves when the process should stop
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::CacheSync` if the event cache never syncs,
    /// `BridgeError::ControlPlane` if the namespace subscription cannot be
    /// established, and `BridgeError::WatcherTask` if a watcher panics.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let forwarder = Arc::new(Forwarder::new(
            Decoder::new(self.settings.cluster.clone()),
            Publisher::new(self.bus.clone()),
            self.settings.topic.clone(),
        ));

        let stop = CancellationToken::new();
        let EventWatcherHandle {
            task: mut event_task,
            synced,
        } = EventWatcher::new(self.control_plane.clone(), forwarder.clone())
            .spawn(stop.child_token());
        let mut namespace_task =
            NamespaceWatcher::new(self.control_plane.clone(), forwarder).spawn(stop.child_token());

        self.state.send_replace(LifecycleState::Running);
        info!(
            topic = %self.settings.topic,
            cluster = %self.settings.cluster,
            "Bridge running"
        );

        let readiness = wait_for_cache_sync(synced, self.settings.cache_sync_timeout);
        tokio::pin!(readiness);
        tokio::pin!(shutdown);

        let mut ready = false;
        let mut events_active = true;
        let mut namespaces_active = true;

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }

                res = &mut readiness, if !ready => match res {
                    Ok(()) => {
                        ready = true;
                        info!("Bridge ready");
                    }
                    Err(e) => break Err(e),
                },

                res = &mut event_task, if events_active => {
                    events_active = false;
                    if let Err(e) = task_outcome("event", res) {
                        break Err(e);
                    }
                }

                res = &mut namespace_task, if namespaces_active => {
                    namespaces_active = false;
                    if let Err(e) = task_outcome("namespace", res) {
                        break Err(e);
                    }
                }
            }
        };

        self.state.send_replace(LifecycleState::ShuttingDown);
        if let Err(e) = &outcome {
            error!(error = %e, "Bridge stopping on fatal error");
        }
        stop.cancel();

        outcome
    }
}

fn task_outcome(name: &str, joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(Ok(())) => {
            warn!(watcher = name, "Watcher ended");
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(e) => Err(BridgeError::WatcherTask(format!("{} watcher: {}", name, e)).into()),
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
