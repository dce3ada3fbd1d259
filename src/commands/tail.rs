//! The `tail` command: print messages published on the bridge topic.

use colored::Colorize;
use futures::StreamExt;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::lifecycle::shutdown_signal;
use crate::publisher::nats::connect_client;

/// Subscribes to `subject` (the bridge topic by default) and prints every
/// message until interrupted or the connection closes.
///
/// # Arguments
///
/// * `config` - Loaded configuration; provides the server and default topic
/// * `subject` - Subject override; `>` receives everything
/// * `pretty` - Pretty-print JSON payloads
///
/// # Errors
///
/// Returns `BridgeError::Bus` if the connection or subscription fails
pub async fn run_tail(config: Config, subject: Option<String>, pretty: bool) -> Result<()> {
    let subject = subject.unwrap_or_else(|| config.settings().topic.to_string());

    let client = connect_client(&config.nats).await?;
    let mut subscriber = client
        .subscribe(subject.clone())
        .await
        .map_err(|e| BridgeError::Bus(format!("Failed to subscribe to {}: {}", subject, e)))?;
    info!(subject = %subject, "Listening for messages");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            message = subscriber.next() => match message {
                Some(message) => {
                    println!("{}", format_message(&message.subject.to_string(), &message.payload, pretty));
                }
                None => {
                    warn!("Subscription closed");
                    break;
                }
            }
        }
    }

    if let Err(e) = subscriber.unsubscribe().await {
        warn!(error = %e, "Failed to unsubscribe");
    }
    Ok(())
}

/// Formats one received message for display.
///
/// Payloads that are not JSON are printed as (lossy) UTF-8.
///
/// # Examples
///
/// ```
/// use kube_nats_bridge::commands::tail::format_message;
///
/// colored::control::set_override(false);
/// let line = format_message("k8s.events", br#"{"type":"namespace"}"#, false);
/// assert_eq!(line, r#"Received message on subject 'k8s.events': {"type":"namespace"}"#);
/// ```
pub fn format_message(subject: &str, payload: &[u8], pretty: bool) -> String {
    let body = if pretty {
        serde_json::from_slice::<serde_json::Value>(payload)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
            .unwrap_or_else(|| String::from_utf8_lossy(payload).into_owned())
    } else {
        String::from_utf8_lossy(payload).into_owned()
    };

    format!("Received message on subject '{}': {}", subject.cyan(), body)
}
