//! Local object cache fed by list-then-watch
//!
//! The [`Informer`] keeps the last known state of every object keyed by
//! namespace and name. Each [`ListWatchEvent`] is folded into the cache and
//! turned into zero or more [`Delta`]s, which are dispatched in order to a
//! [`ResourceEventHandler`].
//!
//! A completed list replaces the cache wholesale. Objects whose
//! `resourceVersion` did not change are not re-delivered; objects missing
//! from the new snapshot are delivered as deletions with their cached state.

use std::collections::BTreeMap;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control_plane::{ListWatchEvent, ListWatchStream, WatchedObject};
use crate::error::{BridgeError, Result};

/// Cache key: namespace (empty for cluster-scoped objects) and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn of(object: &WatchedObject) -> Self {
        let meta = object.metadata();
        Self {
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

/// A change to the cache, as delivered to handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Added(WatchedObject),
    Updated {
        old: WatchedObject,
        new: WatchedObject,
    },
    /// Carries the last known state of the object
    Deleted(WatchedObject),
}

/// Receives cache deltas, one at a time and in order.
#[async_trait::async_trait]
pub trait ResourceEventHandler: Send + Sync {
    async fn on_add(&self, object: &WatchedObject);
    async fn on_update(&self, old: &WatchedObject, new: &WatchedObject);
    async fn on_delete(&self, object: &WatchedObject);
}

#[derive(Debug, Default)]
pub struct Informer {
    store: BTreeMap<ObjectKey, WatchedObject>,
    relist: Option<BTreeMap<ObjectKey, WatchedObject>>,
    synced: bool,
}

impl Informer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an initial list has completed.
    pub fn has_synced(&self) -> bool {
        self.synced
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&WatchedObject> {
        self.store.get(key)
    }

    /// Folds one list/watch step into the cache.
    ///
    /// List items are buffered until [`ListWatchEvent::Synced`]; nothing is
    /// emitted for them until the snapshot is complete.
    pub fn apply(&mut self, event: ListWatchEvent) -> Vec<Delta> {
        match event {
            ListWatchEvent::Restarted => {
                self.relist = Some(BTreeMap::new());
                Vec::new()
            }
            ListWatchEvent::Listed(object) => {
                self.relist
                    .get_or_insert_with(BTreeMap::new)
                    .insert(ObjectKey::of(&object), object);
                Vec::new()
            }
            ListWatchEvent::Synced => {
                let snapshot = self.relist.take().unwrap_or_default();
                let deltas = self.replace(snapshot);
                self.synced = true;
                deltas
            }
            ListWatchEvent::Applied(object) => {
                let key = ObjectKey::of(&object);
                let delta = match self.store.insert(key, object.clone()) {
                    Some(old) => Delta::Updated { old, new: object },
                    None => Delta::Added(object),
                };
                vec![delta]
            }
            ListWatchEvent::Deleted(object) => {
                self.store.remove(&ObjectKey::of(&object));
                vec![Delta::Deleted(object)]
            }
        }
    }

    fn replace(&mut self, snapshot: BTreeMap<ObjectKey, WatchedObject>) -> Vec<Delta> {
        let mut previous = std::mem::take(&mut self.store);
        let mut deltas = Vec::new();

        for (key, object) in snapshot {
            match previous.remove(&key) {
                None => deltas.push(Delta::Added(object.clone())),
                Some(old) if same_version(&old, &object) => {}
                Some(old) => deltas.push(Delta::Updated {
                    old,
                    new: object.clone(),
                }),
            }
            self.store.insert(key, object);
        }

        deltas.extend(previous.into_values().map(Delta::Deleted));
        deltas
    }

    /// Drives the cache from `stream` until `stop` fires or the stream ends.
    ///
    /// `synced` flips to `true` once the first list completes. Stream errors
    /// are logged; the stream is expected to recover on its own.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::CacheSync` if the stream ends before the first
    /// list completed.
    pub async fn run<H>(
        &mut self,
        mut stream: ListWatchStream,
        handler: &H,
        synced: watch::Sender<bool>,
        stop: CancellationToken,
    ) -> Result<()>
    where
        H: ResourceEventHandler + ?Sized,
    {
        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    debug!("Informer stopped");
                    return Ok(());
                }

                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        for delta in self.apply(event) {
                            dispatch(handler, delta).await;
                        }
                        if self.synced && !*synced.borrow() {
                            info!(cached = self.store.len(), "Event cache synced");
                            synced.send_replace(true);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "List/watch error; retrying");
                    }
                    None if !self.synced => {
                        return Err(BridgeError::CacheSync(
                            "list/watch stream ended before the initial list completed"
                                .to_string(),
                        )
                        .into());
                    }
                    None => {
                        warn!("List/watch stream ended");
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn same_version(old: &WatchedObject, new: &WatchedObject) -> bool {
    match (old.resource_version(), new.resource_version()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

async fn dispatch<H>(handler: &H, delta: Delta)
where
    H: ResourceEventHandler + ?Sized,
{
    match delta {
        Delta::Added(object) => handler.on_add(&object).await,
        Delta::Updated { old, new } => handler.on_update(&old, &new).await,
        Delta::Deleted(object) => handler.on_delete(&object).await,
    }
}
