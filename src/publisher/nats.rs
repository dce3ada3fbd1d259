//! NATS bus client

use async_nats::ConnectOptions;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::NatsConfig;
use crate::error::{BridgeError, Result};
use crate::publisher::MessageBus;

/// Connects an `async-nats` client using the configured URL, connection
/// name and optional user/password credentials.
///
/// # Errors
///
/// Returns `BridgeError::Bus` if the server cannot be reached or rejects
/// the credentials.
pub async fn connect_client(config: &NatsConfig) -> Result<async_nats::Client> {
    let options = match (&config.user, &config.password) {
        (Some(user), Some(password)) => {
            ConnectOptions::with_user_and_password(user.clone(), password.clone())
        }
        (Some(user), None) => ConnectOptions::with_user_and_password(user.clone(), String::new()),
        _ => ConnectOptions::new(),
    }
    .name(config.connection_name.clone());

    debug!(url = %config.url, name = %config.connection_name, "Connecting to NATS");

    let client = options
        .connect(config.url.as_str())
        .await
        .map_err(|e| BridgeError::Bus(format!("Failed to connect to {}: {}", config.url, e)))?;

    info!(url = %config.url, "Connected to NATS");
    Ok(client)
}

/// [`MessageBus`] over NATS core publish.
#[derive(Debug, Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connects to the configured server.
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        Ok(Self {
            client: connect_client(config).await?,
        })
    }

    pub fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BridgeError::Bus(format!("Publish to {} failed: {}", subject, e)))?;
        Ok(())
    }
}
