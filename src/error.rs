//! Error types for kube-nats-bridge
//!
//! This module defines the error types used throughout the bridge,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::message::RecordCategory;

/// Main error type for bridge operations
///
/// Covers configuration loading, control-plane access, bus connectivity,
/// informer cache synchronization, and serialization.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Control-plane client construction or watch establishment errors
    #[error("Control plane error: {0}")]
    ControlPlane(String),

    /// Message bus connection or publish errors
    #[error("Bus error: {0}")]
    Bus(String),

    /// The event informer never completed its initial list
    #[error("Cache sync failed: {0}")]
    CacheSync(String),

    /// A watcher task ended abnormally
    #[error("Watcher task failed: {0}")]
    WatcherTask(String),

    /// Object could not be decoded into a canonical message
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Decoding failures raised by the change decoder.
///
/// These are contract violations between a watcher and the objects the
/// control plane handed it; they are logged and the notification dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The object's shape does not match the declared record category
    #[error("Unexpected object type: expected {expected}, found {found}")]
    UnexpectedObject {
        /// Category the watcher declared
        expected: RecordCategory,
        /// Kind of the object actually received
        found: String,
    },
}

/// Result type alias for bridge operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
