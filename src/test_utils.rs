//! Test utilities for kube-nats-bridge
//!
//! This module provides in-process fakes for both collaborators of the
//! bridge, plus builders for control-plane objects.
//!
//! - [`RecordingBus`]: a [`MessageBus`] that records or rejects publishes
//! - [`FakeControlPlane`]: a [`ControlPlane`] fed by a test through its
//!   [`FakeControlPlaneHandle`]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{stream, StreamExt};
use k8s_openapi::api::core::v1::{Event, Namespace, NamespaceStatus, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::control_plane::{
    ControlPlane, ListWatchEvent, ListWatchStream, Notification, NotificationStream,
    WatchedObject,
};
use crate::error::{BridgeError, Result};
use crate::publisher::MessageBus;

/// Bus that records every publish, or fails every publish.
#[derive(Debug, Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, Bytes)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose every publish fails with a connection error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Published (subject, parsed JSON body) pairs, in publish order
    pub fn messages(&self) -> Vec<(String, serde_json::Value)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(subject, body)| {
                (
                    subject.clone(),
                    serde_json::from_slice(body).expect("published body is not JSON"),
                )
            })
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Polls until at least `count` messages were published.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` elapses first
    pub async fn wait_for_messages(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Vec<(String, serde_json::Value)> {
        let deadline = Instant::now() + timeout;
        loop {
            let messages = self.messages();
            if messages.len() >= count {
                return messages;
            }
            assert!(
                Instant::now() < deadline,
                "expected {} messages, got {}",
                count,
                messages.len()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait::async_trait]
impl MessageBus for RecordingBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BridgeError::Bus("connection closed".to_string()).into());
        }
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), payload));
        Ok(())
    }
}

/// Control plane whose streams are fed by a [`FakeControlPlaneHandle`].
///
/// The event stream can be taken once; later calls get an empty stream.
/// Namespace watches all read from the same channel, and each one ends
/// after yielding [`Notification::TimedOut`].
#[derive(Debug)]
pub struct FakeControlPlane {
    events: Mutex<Option<UnboundedReceiver<Result<ListWatchEvent>>>>,
    namespaces: Arc<tokio::sync::Mutex<UnboundedReceiver<Result<Notification>>>>,
    namespace_watches: Mutex<Vec<String>>,
    namespace_watch_error: Option<String>,
    namespace_resume_error: Option<String>,
}

/// Test-side end of a [`FakeControlPlane`].
#[derive(Debug)]
pub struct FakeControlPlaneHandle {
    events: Mutex<Option<UnboundedSender<Result<ListWatchEvent>>>>,
    namespaces: Mutex<Option<UnboundedSender<Result<Notification>>>>,
}

impl FakeControlPlane {
    pub fn new() -> (Self, FakeControlPlaneHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (namespaces_tx, namespaces_rx) = mpsc::unbounded_channel();
        (
            Self {
                events: Mutex::new(Some(events_rx)),
                namespaces: Arc::new(tokio::sync::Mutex::new(namespaces_rx)),
                namespace_watches: Mutex::new(Vec::new()),
                namespace_watch_error: None,
                namespace_resume_error: None,
            },
            FakeControlPlaneHandle {
                events: Mutex::new(Some(events_tx)),
                namespaces: Mutex::new(Some(namespaces_tx)),
            },
        )
    }

    /// Makes `watch_namespaces` fail with `message`.
    pub fn with_namespace_watch_error(mut self, message: &str) -> Self {
        self.namespace_watch_error = Some(message.to_string());
        self
    }

    /// Makes every `watch_namespaces` call after the first fail with `message`.
    pub fn with_namespace_resume_error(mut self, message: &str) -> Self {
        self.namespace_resume_error = Some(message.to_string());
        self
    }

    /// Resource versions passed to `watch_namespaces`, in call order
    pub fn namespace_watches(&self) -> Vec<String> {
        self.namespace_watches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ControlPlane for FakeControlPlane {
    fn list_watch_events(&self) -> ListWatchStream {
        match self.events.lock().unwrap().take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => stream::empty().boxed(),
        }
    }

    async fn watch_namespaces(&self, resource_version: &str) -> Result<NotificationStream> {
        let resumed = {
            let mut watches = self.namespace_watches.lock().unwrap();
            watches.push(resource_version.to_string());
            watches.len() > 1
        };
        let error = match (&self.namespace_watch_error, &self.namespace_resume_error) {
            (Some(message), _) => Some(message),
            (None, Some(message)) if resumed => Some(message),
            _ => None,
        };
        if let Some(message) = error {
            return Err(BridgeError::ControlPlane(message.clone()).into());
        }

        let rx = self.namespaces.clone();
        Ok(stream::unfold((rx, false), |(rx, timed_out)| async move {
            if timed_out {
                return None;
            }
            let item = rx.lock().await.recv().await?;
            let timed_out = matches!(item, Ok(Notification::TimedOut));
            Some((item, (rx, timed_out)))
        })
        .boxed())
    }
}

impl FakeControlPlaneHandle {
    pub fn send_event(&self, event: ListWatchEvent) {
        self.send_event_result(Ok(event));
    }

    pub fn send_event_result(&self, event: Result<ListWatchEvent>) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn send_namespace(&self, notification: Notification) {
        self.send_namespace_result(Ok(notification));
    }

    pub fn send_namespace_result(&self, notification: Result<Notification>) {
        if let Some(tx) = self.namespaces.lock().unwrap().as_ref() {
            let _ = tx.send(notification);
        }
    }

    /// Ends the event list/watch stream
    pub fn close_events(&self) {
        self.events.lock().unwrap().take();
    }

    /// Ends the namespace watch, as a server-side close would
    pub fn close_namespaces(&self) {
        self.namespaces.lock().unwrap().take();
    }
}

/// Builds an activity record about a pod.
pub fn event_object(
    namespace: &str,
    name: &str,
    reason: &str,
    resource_version: &str,
) -> WatchedObject {
    WatchedObject::Event(Box::new(Event {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            resource_version: Some(resource_version.to_string()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(name.split('.').next().unwrap_or(name).to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        reason: Some(reason.to_string()),
        message: Some(format!("{} {}", reason, name)),
        type_: Some("Normal".to_string()),
        ..Default::default()
    }))
}

/// Builds a namespace in the given phase.
pub fn namespace_object(name: &str, phase: &str, resource_version: &str) -> WatchedObject {
    WatchedObject::Namespace(Box::new(Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            resource_version: Some(resource_version.to_string()),
            ..Default::default()
        },
        status: Some(NamespaceStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }))
}

/// Builds an object of a kind the bridge does not handle.
pub fn unrecognized_object(kind: &str, name: &str) -> WatchedObject {
    WatchedObject::Unrecognized {
        kind: kind.to_string(),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
    }
}
