//! Control-plane boundary
//!
//! The Kubernetes API hands back generic [`DynamicObject`]s. This module
//! classifies them into [`WatchedObject`], a sum type over the two record
//! shapes the bridge understands, and exposes the two subscriptions the
//! watchers need through the [`ControlPlane`] trait:
//!
//! - [`ControlPlane::list_watch_events`]: list-then-watch of every `v1/Event`
//!   in the cluster, re-listing automatically when the watch breaks.
//! - [`ControlPlane::watch_namespaces`]: a raw watch on `v1/Namespace`,
//!   bounded by [`NAMESPACE_WATCH_TIMEOUT`] and resumable from a
//!   resourceVersion.
//!
//! [`KubeControlPlane`] implements the trait over a `kube` client. Tests use
//! the in-process fake in `test_utils`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, stream, StreamExt};
use k8s_openapi::api::core::v1::{Event, Namespace};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource as _;
use kube::api::{Api, ApiResource, DynamicObject, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::TypeMeta;
use kube::runtime::watcher;
use kube::runtime::WatchStreamExt;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ControlPlaneConfig;
use crate::error::{BridgeError, Result};
use crate::message::RecordCategory;

/// A control-plane object after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchedObject {
    /// Cluster-wide activity record
    Event(Box<Event>),
    /// Namespace lifecycle record
    Namespace(Box<Namespace>),
    /// Anything the bridge could not interpret as one of the above
    Unrecognized {
        /// Kind reported by the object, or `<unknown>`
        kind: String,
        metadata: ObjectMeta,
    },
}

impl WatchedObject {
    /// Classifies a dynamic object as the expected record category.
    ///
    /// List responses omit `apiVersion`/`kind` on their items, so a missing
    /// type is filled in from `expected`. A present but different kind, or a
    /// payload that fails to parse, yields [`WatchedObject::Unrecognized`].
    pub fn from_dynamic(mut obj: DynamicObject, expected: RecordCategory) -> Self {
        match obj.types.as_ref().map(|t| t.kind.clone()) {
            Some(kind) if kind != expected.kind() => {
                return Self::Unrecognized {
                    kind,
                    metadata: obj.metadata,
                };
            }
            Some(_) => {}
            None => {
                obj.types = Some(TypeMeta {
                    api_version: "v1".to_string(),
                    kind: expected.kind().to_string(),
                });
            }
        }

        let metadata = obj.metadata.clone();
        let parsed = match expected {
            RecordCategory::Event => obj.try_parse::<Event>().map(|e| Self::Event(Box::new(e))),
            RecordCategory::Namespace => obj
                .try_parse::<Namespace>()
                .map(|n| Self::Namespace(Box::new(n))),
        };

        parsed.unwrap_or_else(|e| {
            debug!(error = %e, kind = expected.kind(), "Object failed to parse");
            Self::Unrecognized {
                kind: format!("malformed {}", expected.kind()),
                metadata,
            }
        })
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Event(e) => &e.metadata,
            Self::Namespace(n) => &n.metadata,
            Self::Unrecognized { metadata, .. } => metadata,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Event(_) => Event::KIND,
            Self::Namespace(_) => Namespace::KIND,
            Self::Unrecognized { kind, .. } => kind,
        }
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }

    /// `namespace/name`, or just `name` for cluster-scoped objects.
    pub fn display_name(&self) -> String {
        let meta = self.metadata();
        let name = meta.name.as_deref().unwrap_or("<unnamed>");
        match meta.namespace.as_deref() {
            Some(ns) => format!("{}/{}", ns, name),
            None => name.to_string(),
        }
    }
}

/// One step of the list-then-watch protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum ListWatchEvent {
    /// A (re-)list is starting
    Restarted,
    /// One object of the list snapshot
    Listed(WatchedObject),
    /// The list snapshot is complete
    Synced,
    /// An object was created or modified after the list
    Applied(WatchedObject),
    /// An object was deleted after the list
    Deleted(WatchedObject),
}

/// One notification from a raw watch subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Added(WatchedObject),
    Modified(WatchedObject),
    Deleted(WatchedObject),
    /// Progress marker carrying the latest resourceVersion
    Bookmark(String),
    /// Error frame sent by the server, such as `410 Expired`
    Error(String),
    /// The watch reached its requested timeout; always the final item
    TimedOut,
}

impl Notification {
    /// The resourceVersion this notification advances the watch to.
    pub fn resource_version(&self) -> Option<&str> {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj.resource_version(),
            Self::Bookmark(rv) => Some(rv),
            Self::Error(_) | Self::TimedOut => None,
        }
    }
}

/// Server-side timeout requested for each namespace watch.
///
/// The API server rejects watch timeouts of 295 seconds or more.
pub const NAMESPACE_WATCH_TIMEOUT: Duration = Duration::from_secs(290);

/// A watch closing this close to its requested timeout counts as timed out.
const WATCH_TIMEOUT_TOLERANCE: Duration = Duration::from_secs(5);

/// Stream driving the event informer.
pub type ListWatchStream = BoxStream<'static, Result<ListWatchEvent>>;

/// Stream of namespace notifications; ends when the server closes the watch.
/// A close caused by the requested timeout is preceded by
/// [`Notification::TimedOut`].
pub type NotificationStream = BoxStream<'static, Result<Notification>>;

/// The two subscriptions the bridge holds against the control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync + fmt::Debug {
    /// List-then-watch over every `v1/Event` in the cluster, no selectors.
    ///
    /// The stream re-lists on its own after watch interruptions; transient
    /// errors are surfaced as `Err` items without ending the stream.
    fn list_watch_events(&self) -> ListWatchStream;

    /// Opens a direct watch on `v1/Namespace` starting after
    /// `resource_version` (`"0"` for any recent state).
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::ControlPlane` if the watch cannot be established.
    async fn watch_namespaces(&self, resource_version: &str) -> Result<NotificationStream>;
}

/// [`ControlPlane`] backed by a `kube` client.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: kube::Client,
}

impl fmt::Debug for KubeControlPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeControlPlane").finish_non_exhaustive()
    }
}

impl KubeControlPlane {
    /// Builds a client from a kubeconfig file, or from the in-cluster service
    /// account when no kubeconfig path is configured.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::ControlPlane` if the configuration cannot be
    /// resolved or the client cannot be constructed.
    pub async fn connect(config: &ControlPlaneConfig) -> Result<Self> {
        let kube_config = if config.kubeconfig.is_empty() {
            debug!("Using in-cluster control plane configuration");
            kube::Config::incluster().map_err(|e| {
                BridgeError::ControlPlane(format!("Failed to load in-cluster config: {}", e))
            })?
        } else {
            debug!(path = %config.kubeconfig, context = ?config.context, "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(&config.kubeconfig).map_err(|e| {
                BridgeError::ControlPlane(format!(
                    "Failed to read kubeconfig {}: {}",
                    config.kubeconfig, e
                ))
            })?;
            let options = KubeConfigOptions {
                context: config.context.clone(),
                ..Default::default()
            };
            kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| {
                    BridgeError::ControlPlane(format!("Failed to build kubeconfig: {}", e))
                })?
        };

        info!(cluster_url = %kube_config.cluster_url, "Connecting to control plane");

        let client = kube::Client::try_from(kube_config).map_err(|e| {
            BridgeError::ControlPlane(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client })
    }

    pub fn from_client(client: kube::Client) -> Self {
        Self { client }
    }

    fn api_for<K>(&self) -> Api<DynamicObject>
    where
        K: kube::Resource<DynamicType = ()>,
    {
        Api::all_with(self.client.clone(), &ApiResource::erase::<K>(&()))
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    fn list_watch_events(&self) -> ListWatchStream {
        watcher(self.api_for::<Event>(), watcher::Config::default())
            .default_backoff()
            .map(|item| {
                item.map(list_watch_event)
                    .map_err(|e| anyhow::Error::from(BridgeError::ControlPlane(e.to_string())))
            })
            .boxed()
    }

    async fn watch_namespaces(&self, resource_version: &str) -> Result<NotificationStream> {
        let params = WatchParams::default().timeout(NAMESPACE_WATCH_TIMEOUT.as_secs() as u32);
        let opened = Instant::now();
        let stream = self
            .api_for::<Namespace>()
            .watch(&params, resource_version)
            .await
            .map_err(|e| {
                BridgeError::ControlPlane(format!("Failed to create namespace watch: {}", e))
            })?;

        let notifications = stream.map(|item| {
            item.map(notification)
                .map_err(|e| anyhow::Error::from(BridgeError::ControlPlane(e.to_string())))
        });
        let closing = stream::once(async move {
            ended_on_timeout(opened.elapsed())
                .then_some(Ok::<_, anyhow::Error>(Notification::TimedOut))
        })
        .filter_map(future::ready);

        Ok(notifications.chain(closing).boxed())
    }
}

fn list_watch_event(event: watcher::Event<DynamicObject>) -> ListWatchEvent {
    let classify = |obj| WatchedObject::from_dynamic(obj, RecordCategory::Event);
    match event {
        watcher::Event::Init => ListWatchEvent::Restarted,
        watcher::Event::InitApply(obj) => ListWatchEvent::Listed(classify(obj)),
        watcher::Event::InitDone => ListWatchEvent::Synced,
        watcher::Event::Apply(obj) => ListWatchEvent::Applied(classify(obj)),
        watcher::Event::Delete(obj) => ListWatchEvent::Deleted(classify(obj)),
    }
}

fn notification(event: WatchEvent<DynamicObject>) -> Notification {
    let classify = |obj| WatchedObject::from_dynamic(obj, RecordCategory::Namespace);
    match event {
        WatchEvent::Added(obj) => Notification::Added(classify(obj)),
        WatchEvent::Modified(obj) => Notification::Modified(classify(obj)),
        WatchEvent::Deleted(obj) => Notification::Deleted(classify(obj)),
        WatchEvent::Bookmark(b) => Notification::Bookmark(b.metadata.resource_version),
        WatchEvent::Error(e) => Notification::Error(e.to_string()),
    }
}

fn ended_on_timeout(elapsed: Duration) -> bool {
    elapsed + WATCH_TIMEOUT_TOLERANCE >= NAMESPACE_WATCH_TIMEOUT
}
