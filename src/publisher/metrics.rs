//! Bridge metrics
//!
//! Counters and histograms recorded through the `metrics` facade. Nothing
//! is exported unless a recorder is installed; with the `prometheus`
//! feature, [`init_metrics_exporter`] installs one.
//!
//! # Metrics
//!
//! - `bridge_publish_total{category,outcome}`: Counter of publish attempts
//! - `bridge_publish_duration_seconds{outcome}`: Histogram of publish latency
//! - `bridge_notifications_dropped_total{category,reason}`: Counter of
//!   notifications that never reached the publisher
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use kube_nats_bridge::message::RecordCategory;
//! use kube_nats_bridge::publisher::metrics::record_publish;
//!
//! record_publish(RecordCategory::Event, "success", Duration::from_millis(3));
//! ```

use std::time::Duration;

use metrics::{histogram, increment_counter};

use crate::message::RecordCategory;

/// Records one publish attempt.
///
/// # Arguments
///
/// * `category` - Record category of the message
/// * `outcome` - `success`, `error` or `serialize_error`
/// * `elapsed` - Time spent serializing and publishing
pub fn record_publish(category: RecordCategory, outcome: &'static str, elapsed: Duration) {
    increment_counter!(
        "bridge_publish_total",
        "category" => category.as_str(),
        "outcome" => outcome
    );
    histogram!(
        "bridge_publish_duration_seconds",
        elapsed.as_secs_f64(),
        "outcome" => outcome
    );
}

/// Records a notification dropped before publishing.
pub fn record_dropped(category: RecordCategory, reason: &'static str) {
    increment_counter!(
        "bridge_notifications_dropped_total",
        "category" => category.as_str(),
        "reason" => reason
    );
}

/// Initialize metrics exporter
///
/// When the `prometheus` feature is enabled, this installs a Prometheus
/// exporter listening on the builder's default address. Without the
/// feature it does nothing.
///
/// # Examples
///
/// ```
/// use kube_nats_bridge::publisher::metrics::init_metrics_exporter;
///
/// // Initialize metrics (only does something with prometheus feature)
/// init_metrics_exporter();
/// ```
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
