//! Canonical message types published on the bus.
//!
//! Every observed change, whichever stream it came from, is normalized into a
//! [`CanonicalMessage`]: a flat JSON object whose values are all strings.
//!
//! # Example
//!
//! ```
//! use kube_nats_bridge::message::{ChangeKind, RecordCategory, Topic};
//!
//! assert_eq!(ChangeKind::Added.label(RecordCategory::Event), "added");
//! assert_eq!(ChangeKind::Added.label(RecordCategory::Namespace), "created");
//! assert_eq!(Topic::from_prefix("mycluster").as_str(), "mycluster.events");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix appended to the configured prefix to form the bridge topic.
pub const TOPIC_SUFFIX: &str = "events";

/// Which kind of control-plane record a message was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordCategory {
    /// Cluster-wide activity record (`v1/Event`)
    Event,
    /// Namespace lifecycle record (`v1/Namespace`)
    Namespace,
}

impl RecordCategory {
    /// Wire value of the `type` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Namespace => "namespace",
        }
    }

    /// Kubernetes kind backing this category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Namespace => "Namespace",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a record was surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Textual form used for the `eventType` key.
    ///
    /// Namespace additions are reported as `created`; everything else uses
    /// the plain verb.
    pub fn label(self, category: RecordCategory) -> &'static str {
        match (self, category) {
            (Self::Added, RecordCategory::Namespace) => "created",
            (Self::Added, RecordCategory::Event) => "added",
            (Self::Updated, _) => "updated",
            (Self::Deleted, _) => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Category-specific fields of an activity record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    pub namespace: String,
    pub name: String,
    pub reason: String,
    pub message: String,
    pub involved_object_kind: String,
    pub involved_object_name: String,
    /// The record's own type (Normal, Warning)
    pub severity: String,
    /// Reporting component
    pub source: String,
    pub first_timestamp: String,
    pub last_timestamp: String,
}

/// Category-specific fields of a namespace record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFields {
    pub name: String,
    /// Lifecycle phase (Active, Terminating)
    pub status: String,
}

/// Fields that vary by record category, flattened into the message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecordFields {
    Event(EventFields),
    Namespace(NamespaceFields),
}

/// The normalized, bus-ready representation of one observed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalMessage {
    /// Record category (`event` or `namespace`)
    #[serde(rename = "type")]
    pub category: RecordCategory,

    /// Change kind in its category-specific textual form
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// Cluster identifier label
    pub cluster: String,

    #[serde(flatten)]
    pub fields: RecordFields,
}

impl CanonicalMessage {
    /// Builds a message for an activity record.
    pub fn event(kind: ChangeKind, cluster: &str, fields: EventFields) -> Self {
        Self {
            category: RecordCategory::Event,
            event_type: kind.label(RecordCategory::Event).to_string(),
            cluster: cluster.to_string(),
            fields: RecordFields::Event(fields),
        }
    }

    /// Builds a message for a namespace record.
    pub fn namespace(kind: ChangeKind, cluster: &str, fields: NamespaceFields) -> Self {
        Self {
            category: RecordCategory::Namespace,
            event_type: kind.label(RecordCategory::Namespace).to_string(),
            cluster: cluster.to_string(),
            fields: RecordFields::Namespace(fields),
        }
    }

    /// Serializes the message into its UTF-8 JSON wire body.
    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// The single topic every message is published to: `{prefix}.events`.
///
/// Computed once at startup and shared read-only by both watchers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn from_prefix(prefix: &str) -> Self {
        Self(format!("{}.{}", prefix, TOPIC_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
