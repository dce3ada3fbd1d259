//! Control-plane watchers
//!
//! Two independent watchers feed the bridge topic:
//!
//! - [`events::EventWatcher`]: cached list-then-watch over cluster events,
//!   with a readiness signal once the initial list is cached.
//! - [`namespaces::NamespaceWatcher`]: a single direct namespace watch.
//!
//! Both hand every change to a shared [`forwarder::Forwarder`], which
//! decodes it and publishes the result.

pub mod events;
pub mod forwarder;
pub mod informer;
pub mod namespaces;

pub use events::{wait_for_cache_sync, EventWatcher, EventWatcherHandle};
pub use forwarder::Forwarder;
pub use informer::{Delta, Informer, ObjectKey, ResourceEventHandler};
pub use namespaces::NamespaceWatcher;
