//! Namespace lifecycle watcher
//!
//! Holds a direct watch on `v1/Namespace` with no local cache. A watch that
//! ends on its requested timeout is re-issued from the last resourceVersion
//! seen. Any other close, or a failed resume, is logged and the watcher
//! stops.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::forwarder::Forwarder;
use crate::control_plane::{ControlPlane, Notification};
use crate::error::Result;
use crate::message::{ChangeKind, RecordCategory};

const INITIAL_RESOURCE_VERSION: &str = "0";

#[derive(Debug)]
pub struct NamespaceWatcher {
    control_plane: Arc<dyn ControlPlane>,
    forwarder: Arc<Forwarder>,
}

impl NamespaceWatcher {
    pub fn new(control_plane: Arc<dyn ControlPlane>, forwarder: Arc<Forwarder>) -> Self {
        Self {
            control_plane,
            forwarder,
        }
    }

    pub fn spawn(self, stop: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(stop).await })
    }

    /// Subscribes and forwards notifications until the watch is closed or
    /// `stop` fires.
    ///
    /// # Errors
    ///
    /// Fails only if the initial subscription cannot be established.
    pub async fn run(&self, stop: CancellationToken) -> Result<()> {
        let mut resource_version = INITIAL_RESOURCE_VERSION.to_string();
        let mut stream = self.control_plane.watch_namespaces(&resource_version).await?;
        info!("Namespace watch established");

        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    debug!("Namespace watcher stopped");
                    return Ok(());
                }

                item = stream.next() => match item {
                    Some(Ok(Notification::TimedOut)) => {
                        debug!(resource_version = %resource_version, "Namespace watch timed out, resuming");
                        match self.control_plane.watch_namespaces(&resource_version).await {
                            Ok(resumed) => stream = resumed,
                            Err(e) => {
                                warn!(error = %e, "Failed to resume namespace watch; namespace changes will no longer be published");
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(notification)) => {
                        if let Some(rv) = notification.resource_version() {
                            resource_version = rv.to_string();
                        }
                        self.handle(notification).await;
                    }
                    Some(Err(e)) => warn!(error = %e, "Namespace watch error"),
                    None => {
                        warn!("Namespace watch closed by server; namespace changes will no longer be published");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle(&self, notification: Notification) {
        let (kind, object) = match notification {
            Notification::Added(object) => (ChangeKind::Added, object),
            Notification::Modified(object) => (ChangeKind::Updated, object),
            Notification::Deleted(object) => (ChangeKind::Deleted, object),
            Notification::Bookmark(rv) => {
                debug!(resource_version = %rv, "Namespace watch bookmark");
                return;
            }
            Notification::Error(message) => {
                warn!(error = %message, "Namespace watch reported an error");
                return;
            }
            Notification::TimedOut => return,
        };

        self.forwarder
            .forward(RecordCategory::Namespace, kind, &object)
            .await;
    }
}
