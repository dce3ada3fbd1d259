//! Message bus publishing
//!
//! This module defines the [`MessageBus`] trait that bus clients must
//! satisfy, and the [`Publisher`] that serializes canonical messages and
//! sends them through a bus. Concrete implementations live in submodules:
//!
//! - [`nats::NatsBus`] -- NATS core publish over an `async-nats` client.
//!
//! Tests substitute an in-memory recording bus.
//!
//! # Design
//!
//! Publishing is fire-and-forget: [`Publisher::publish`] never returns an
//! error. Failures are logged and counted, and the notification is lost.
//! No retry or buffering happens here.

pub mod metrics;
pub mod nats;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{error, info};

use self::metrics::record_publish;

use crate::error::Result;
use crate::message::{CanonicalMessage, Topic};

/// Abstraction over bus clients.
///
/// Implementations must be safe to call concurrently from both watcher
/// tasks through `Arc<dyn MessageBus>`.
#[async_trait::async_trait]
pub trait MessageBus: Send + Sync + std::fmt::Debug {
    /// Publish a payload on `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BridgeError::Bus`] if the client rejects
    /// the publish.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()>;
}

/// Result of one publish attempt, as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published { elapsed: Duration },
    Failed { reason: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Serializes canonical messages and hands them to a [`MessageBus`].
#[derive(Debug, Clone)]
pub struct Publisher {
    bus: Arc<dyn MessageBus>,
}

impl Publisher {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Publish one message on `topic`.
    ///
    /// Serialization and bus failures are logged at error level and
    /// reported through the returned outcome; they never propagate.
    ///
    /// # Arguments
    ///
    /// * `topic` - Destination topic
    /// * `message` - Message to serialize and send
    ///
    /// # Returns
    ///
    /// The outcome, including the elapsed publish time on success
    pub async fn publish(&self, topic: &Topic, message: &CanonicalMessage) -> PublishOutcome {
        let start = Instant::now();

        let body = match message.to_body() {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                error!(
                    topic = %topic,
                    category = %message.category,
                    error = %e,
                    "Failed to serialize message"
                );
                record_publish(message.category, "serialize_error", start.elapsed());
                return PublishOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let result = self.bus.publish(topic.as_str(), body).await;
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                info!(
                    topic = %topic,
                    category = %message.category,
                    event_type = %message.event_type,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Published message"
                );
                record_publish(message.category, "success", elapsed);
                PublishOutcome::Published { elapsed }
            }
            Err(e) => {
                error!(
                    topic = %topic,
                    category = %message.category,
                    event_type = %message.event_type,
                    error = %e,
                    "Failed to publish message"
                );
                record_publish(message.category, "error", elapsed);
                PublishOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChangeKind, NamespaceFields};
    use crate::test_utils::RecordingBus;

    fn namespace_message() -> CanonicalMessage {
        CanonicalMessage::namespace(
            ChangeKind::Added,
            "prod",
            NamespaceFields {
                name: "team-a".to_string(),
                status: "Active".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_publish_sends_json_body_on_topic() {
        let bus = Arc::new(RecordingBus::new());
        let publisher = Publisher::new(bus.clone());
        let topic = Topic::from_prefix("mycluster");

        let outcome = publisher.publish(&topic, &namespace_message()).await;

        assert!(outcome.is_published());
        let published = bus.messages();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "mycluster.events");
        assert_eq!(published[0].1["eventType"], "created");
        assert_eq!(published[0].1["name"], "team-a");
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported_not_raised() {
        let bus = Arc::new(RecordingBus::failing());
        let publisher = Publisher::new(bus.clone());

        let outcome = publisher
            .publish(&Topic::from_prefix("k8s"), &namespace_message())
            .await;

        match outcome {
            PublishOutcome::Failed { reason } => assert!(reason.contains("connection closed")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(bus.messages().is_empty());
        assert_eq!(bus.attempts(), 1);
    }
}
