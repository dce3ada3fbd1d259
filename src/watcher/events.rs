//! Cluster-wide event watcher
//!
//! Runs an [`Informer`] over the control plane's list-then-watch stream of
//! `v1/Event` objects and forwards every cache delta to the bus.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::forwarder::Forwarder;
use super::informer::{Informer, ResourceEventHandler};
use crate::control_plane::{ControlPlane, WatchedObject};
use crate::error::{BridgeError, Result};
use crate::message::{ChangeKind, RecordCategory};

/// Handle to a running event watcher.
#[derive(Debug)]
pub struct EventWatcherHandle {
    /// Resolves when the informer stops
    pub task: JoinHandle<Result<()>>,
    /// Becomes `true` once the initial list has been cached
    pub synced: watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct EventWatcher {
    control_plane: Arc<dyn ControlPlane>,
    forwarder: Arc<Forwarder>,
}

impl EventWatcher {
    pub fn new(control_plane: Arc<dyn ControlPlane>, forwarder: Arc<Forwarder>) -> Self {
        Self {
            control_plane,
            forwarder,
        }
    }

    /// Spawns the informer task.
    ///
    /// The task runs until `stop` is cancelled. It fails with
    /// `BridgeError::CacheSync` if the list/watch stream ends before the
    /// initial list completes.
    pub fn spawn(self, stop: CancellationToken) -> EventWatcherHandle {
        let (synced_tx, synced_rx) = watch::channel(false);
        let stream = self.control_plane.list_watch_events();
        let handler = ForwardingHandler {
            forwarder: self.forwarder,
        };

        let task = tokio::spawn(async move {
            info!("Starting event watcher");
            let mut informer = Informer::new();
            informer.run(stream, &handler, synced_tx, stop).await
        });

        EventWatcherHandle {
            task,
            synced: synced_rx,
        }
    }
}

struct ForwardingHandler {
    forwarder: Arc<Forwarder>,
}

#[async_trait::async_trait]
impl ResourceEventHandler for ForwardingHandler {
    async fn on_add(&self, object: &WatchedObject) {
        self.forwarder
            .forward(RecordCategory::Event, ChangeKind::Added, object)
            .await;
    }

    async fn on_update(&self, _old: &WatchedObject, new: &WatchedObject) {
        self.forwarder
            .forward(RecordCategory::Event, ChangeKind::Updated, new)
            .await;
    }

    async fn on_delete(&self, object: &WatchedObject) {
        self.forwarder
            .forward(RecordCategory::Event, ChangeKind::Deleted, object)
            .await;
    }
}

/// Waits until the event cache reports synced.
///
/// # Arguments
///
/// * `synced` - Receiver from [`EventWatcherHandle`]
/// * `timeout` - Upper bound; `None` waits indefinitely
///
/// # Errors
///
/// Returns `BridgeError::CacheSync` on timeout, or if the informer stops
/// before syncing.
pub async fn wait_for_cache_sync(
    mut synced: watch::Receiver<bool>,
    timeout: Option<Duration>,
) -> Result<()> {
    let wait = async move {
        synced.wait_for(|done| *done).await.map(|_| ()).map_err(|_| {
            BridgeError::CacheSync("event watcher stopped before the initial list".to_string())
        })
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
            BridgeError::CacheSync(format!("timed out after {}s", limit.as_secs_f64()))
        })??,
        None => wait.await?,
    }

    Ok(())
}
