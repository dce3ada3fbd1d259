//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file
//! output. `RUST_LOG`, when set, takes precedence over the configured level.

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::BridgeError;

/// Builds the level filter from `RUST_LOG` or the configured level.
///
/// # Errors
///
/// Returns an error if neither source yields a valid directive
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| BridgeError::Config(format!("Invalid log level '{}': {}", config.level, e)).into())
}

/// Warning-level subscriber for the window before configuration is loaded.
///
/// Used with `tracing::subscriber::with_default` around config loading so
/// its warnings are not lost.
pub fn bootstrap_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .finish()
}

/// Initialize process-wide logging based on configuration.
///
/// Sets up structured logging with support for both JSON and human-readable
/// formats, with optional file output in addition to STDOUT.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Returns
///
/// Returns success or error if logging initialization fails
///
/// # Examples
///
/// ```no_run
/// use kube_nats_bridge::config::LoggingConfig;
/// use kube_nats_bridge::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// let result = init_logging(&config);
/// assert!(result.is_ok());
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let initialized = if config.json_format {
        let stdout_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);
        let file_layer = file.map(|file| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(file)
        });

        registry.with(stdout_layer).with(file_layer).try_init()
    } else {
        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true);
        let file_layer = file.map(|file| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(file)
        });

        registry.with(stdout_layer).with(file_layer).try_init()
    };

    initialized.map_err(|e| BridgeError::Config(format!("Failed to initialize logging: {}", e)))?;
    Ok(())
}
