//! kube-nats-bridge library
//!
//! Watches a Kubernetes cluster's events and namespaces and republishes
//! every observed change as a flat JSON message on a single NATS topic,
//! `{prefix}.events`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `control_plane`: Kubernetes client boundary and object classification
//! - `watcher`: Event informer, namespace watcher and the shared forwarder
//! - `decoder`: Conversion of observed changes into canonical messages
//! - `message`: Canonical message model and topic naming
//! - `publisher`: Message bus abstraction, NATS client and metrics
//! - `lifecycle`: Startup ordering, readiness and shutdown
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging setup
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```
//! use kube_nats_bridge::decoder::Decoder;
//! use kube_nats_bridge::Config;
//!
//! let config = Config::default();
//! config.validate().unwrap();
//!
//! let settings = config.settings();
//! assert_eq!(settings.topic.as_str(), "k8s.events");
//! let _decoder = Decoder::new(settings.cluster);
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod control_plane;
pub mod decoder;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod message;
pub mod publisher;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use error::{BridgeError, DecodeError, Result};
pub use lifecycle::{Coordinator, LifecycleState};
pub use message::{CanonicalMessage, ChangeKind, RecordCategory, Topic};

#[cfg(test)]
pub mod test_utils;
