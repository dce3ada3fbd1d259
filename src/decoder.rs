//! Change decoding
//!
//! Turns a classified control-plane object plus the change that surfaced it
//! into a [`CanonicalMessage`]. Decoding is pure: missing optional fields
//! become empty strings, never errors. The only failure is a shape mismatch
//! between the object and the category its watcher declared.

use chrono::SecondsFormat;
use k8s_openapi::api::core::v1::{Event, Namespace};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::control_plane::WatchedObject;
use crate::error::DecodeError;
use crate::message::{CanonicalMessage, ChangeKind, EventFields, NamespaceFields, RecordCategory};

/// Stateless decoder stamping every message with a cluster label.
#[derive(Debug, Clone)]
pub struct Decoder {
    cluster: String,
}

impl Decoder {
    /// Creates a decoder for the given cluster label.
    ///
    /// # Examples
    ///
    /// ```
    /// use kube_nats_bridge::decoder::Decoder;
    ///
    /// let decoder = Decoder::new("prod");
    /// assert_eq!(decoder.cluster(), "prod");
    /// ```
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Decodes one observed change.
    ///
    /// # Arguments
    ///
    /// * `category` - Category the originating watcher handles
    /// * `kind` - Why the object was surfaced
    /// * `object` - The object state (last known state for deletions)
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedObject`] when `object` is not of the
    /// shape `category` requires.
    pub fn decode(
        &self,
        category: RecordCategory,
        kind: ChangeKind,
        object: &WatchedObject,
    ) -> Result<CanonicalMessage, DecodeError> {
        match (category, object) {
            (RecordCategory::Event, WatchedObject::Event(event)) => Ok(CanonicalMessage::event(
                kind,
                &self.cluster,
                event_fields(event),
            )),
            (RecordCategory::Namespace, WatchedObject::Namespace(namespace)) => Ok(
                CanonicalMessage::namespace(kind, &self.cluster, namespace_fields(namespace)),
            ),
            (expected, other) => Err(DecodeError::UnexpectedObject {
                expected,
                found: other.kind().to_string(),
            }),
        }
    }
}

fn event_fields(event: &Event) -> EventFields {
    let source = event
        .source
        .as_ref()
        .and_then(|s| s.component.clone())
        .filter(|c| !c.is_empty())
        .or_else(|| event.reporting_component.clone())
        .unwrap_or_default();

    EventFields {
        namespace: event.metadata.namespace.clone().unwrap_or_default(),
        name: event.metadata.name.clone().unwrap_or_default(),
        reason: event.reason.clone().unwrap_or_default(),
        message: event.message.clone().unwrap_or_default(),
        involved_object_kind: event.involved_object.kind.clone().unwrap_or_default(),
        involved_object_name: event.involved_object.name.clone().unwrap_or_default(),
        severity: event.type_.clone().unwrap_or_default(),
        source,
        first_timestamp: format_time(event.first_timestamp.as_ref()),
        last_timestamp: format_time(event.last_timestamp.as_ref()),
    }
}

fn namespace_fields(namespace: &Namespace) -> NamespaceFields {
    NamespaceFields {
        name: namespace.metadata.name.clone().unwrap_or_default(),
        status: namespace
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default(),
    }
}

/// RFC 3339 in UTC with second precision, or empty when unset.
fn format_time(time: Option<&Time>) -> String {
    time.map(|t| t.0.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}
