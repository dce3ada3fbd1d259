//! Decode-then-publish step shared by both watchers

use tracing::warn;

use crate::control_plane::WatchedObject;
use crate::decoder::Decoder;
use crate::message::{ChangeKind, RecordCategory, Topic};
use crate::publisher::metrics::record_dropped;
use crate::publisher::{PublishOutcome, Publisher};

/// Turns observed changes into published messages on the bridge topic.
#[derive(Debug, Clone)]
pub struct Forwarder {
    decoder: Decoder,
    publisher: Publisher,
    topic: Topic,
}

impl Forwarder {
    pub fn new(decoder: Decoder, publisher: Publisher, topic: Topic) -> Self {
        Self {
            decoder,
            publisher,
            topic,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Decodes and publishes one change.
    ///
    /// Returns `None` when the object could not be decoded; the notification
    /// is logged and dropped.
    pub async fn forward(
        &self,
        category: RecordCategory,
        kind: ChangeKind,
        object: &WatchedObject,
    ) -> Option<PublishOutcome> {
        match self.decoder.decode(category, kind, object) {
            Ok(message) => Some(self.publisher.publish(&self.topic, &message).await),
            Err(e) => {
                warn!(
                    error = %e,
                    category = %category,
                    change = %kind,
                    object = %object.display_name(),
                    "Dropping notification"
                );
                record_dropped(category, "unexpected_object");
                None
            }
        }
    }
}
