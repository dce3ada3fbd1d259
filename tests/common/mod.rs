use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{stream, StreamExt};
use kube::api::DynamicObject;
use tempfile::TempDir;

use kube_nats_bridge::control_plane::{
    ControlPlane, ListWatchEvent, ListWatchStream, Notification, NotificationStream,
    WatchedObject,
};
use kube_nats_bridge::error::{BridgeError, Result};
use kube_nats_bridge::publisher::MessageBus;
use kube_nats_bridge::RecordCategory;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("bridge.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Bus recording every publish; optionally rejecting them all.
#[derive(Debug, Default)]
pub struct MemoryBus {
    published: Mutex<Vec<(String, Bytes)>>,
    attempts: Mutex<usize>,
    reject: bool,
}

#[allow(dead_code)]
impl MemoryBus {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<(String, serde_json::Value)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(s, b)| (s.clone(), serde_json::from_slice(b).unwrap()))
            .collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub async fn wait_for_attempts(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.attempts() < count {
            assert!(
                Instant::now() < deadline,
                "expected {} publish attempts, got {}",
                count,
                self.attempts()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait::async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.reject {
            return Err(BridgeError::Bus("no responders".to_string()).into());
        }
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), payload));
        Ok(())
    }
}

/// Control plane replaying fixed scripts, then idling until cancelled.
///
/// A namespace watch ends after replaying a `TimedOut` notification; the
/// next watch continues the script from there.
#[derive(Debug, Default)]
pub struct ScriptedControlPlane {
    events: Mutex<Vec<ListWatchEvent>>,
    namespaces: Mutex<Vec<Notification>>,
    namespace_watches: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedControlPlane {
    pub fn new(events: Vec<ListWatchEvent>, namespaces: Vec<Notification>) -> Self {
        Self {
            events: Mutex::new(events),
            namespaces: Mutex::new(namespaces),
            namespace_watches: Mutex::new(Vec::new()),
        }
    }

    pub fn namespace_watches(&self) -> Vec<String> {
        self.namespace_watches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ControlPlane for ScriptedControlPlane {
    fn list_watch_events(&self) -> ListWatchStream {
        let events = std::mem::take(&mut *self.events.lock().unwrap());
        stream::iter(events.into_iter().map(Ok))
            .chain(stream::pending())
            .boxed()
    }

    async fn watch_namespaces(&self, resource_version: &str) -> Result<NotificationStream> {
        self.namespace_watches
            .lock()
            .unwrap()
            .push(resource_version.to_string());

        let mut script = self.namespaces.lock().unwrap();
        let end = script
            .iter()
            .position(|n| *n == Notification::TimedOut)
            .map_or(script.len(), |i| i + 1);
        let notifications: Vec<Notification> = script.drain(..end).collect();

        let replay = stream::iter(notifications.clone().into_iter().map(Ok));
        if notifications.last() == Some(&Notification::TimedOut) {
            Ok(replay.boxed())
        } else {
            Ok(replay.chain(stream::pending()).boxed())
        }
    }
}

/// Classifies a JSON object the way objects arriving from the API server are.
#[allow(dead_code)]
pub fn object(category: RecordCategory, value: serde_json::Value) -> WatchedObject {
    let dynamic: DynamicObject = serde_json::from_value(value).expect("invalid object JSON");
    WatchedObject::from_dynamic(dynamic, category)
}

#[allow(dead_code)]
pub fn event(name: &str, reason: &str, resource_version: &str) -> WatchedObject {
    object(
        RecordCategory::Event,
        serde_json::json!({
            "metadata": {
                "name": name,
                "namespace": "default",
                "resourceVersion": resource_version
            },
            "involvedObject": {"kind": "Pod", "name": "pod-x"},
            "reason": reason,
            "type": "Normal",
            "source": {"component": "kubelet"}
        }),
    )
}

#[allow(dead_code)]
pub fn namespace(name: &str, phase: &str) -> WatchedObject {
    object(
        RecordCategory::Namespace,
        serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": name},
            "status": {"phase": phase}
        }),
    )
}
