//! Configuration management for kube-nats-bridge
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Precedence, lowest to highest: built-in defaults, YAML file,
//! `BRIDGE_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::message::Topic;

/// Main configuration structure for the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Control-plane connection settings
    #[serde(default)]
    pub kube: ControlPlaneConfig,
    /// Message bus connection settings
    #[serde(default)]
    pub nats: NatsConfig,
    /// Bridge behavior (topic, cluster label, readiness)
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control-plane connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlPlaneConfig {
    /// Path to a kubeconfig file; empty selects in-cluster configuration
    #[serde(default)]
    pub kubeconfig: String,

    /// Kubeconfig context to use instead of the current one
    #[serde(default)]
    pub context: Option<String>,
}

/// Message bus connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NatsConfig {
    /// Server URL
    #[serde(default = "default_nats_url")]
    pub url: String,

    /// Connection name reported to the server
    #[serde(default = "default_connection_name")]
    pub connection_name: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_connection_name() -> String {
    "kube-nats-bridge".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_nats_url(),
            connection_name: default_connection_name(),
            user: None,
            password: None,
        }
    }
}

/// Bridge behavior settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Prefix of the publish topic; messages go to `{topic_prefix}.events`
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// Cluster identifier stamped on every message
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Seconds to wait for the event cache to sync; 0 waits indefinitely
    #[serde(default = "default_cache_sync_timeout")]
    pub cache_sync_timeout_secs: u64,
}

fn default_topic_prefix() -> String {
    "k8s".to_string()
}

fn default_cluster() -> String {
    "default".to_string()
}

fn default_cache_sync_timeout() -> u64 {
    120
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            topic_prefix: default_topic_prefix(),
            cluster: default_cluster(),
            cache_sync_timeout_secs: default_cache_sync_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive (overridden by `RUST_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Also append logs to this file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

/// Resolved, immutable settings handed to the running bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub topic: Topic,
    pub cluster: String,
    /// `None` waits indefinitely
    pub cache_sync_timeout: Option<Duration>,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Dot-separated bus subject tokens, no wildcards or whitespace.
const TOPIC_PREFIX_PATTERN: &str = r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$";

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. The merged result is validated before it is returned.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if the merged
    /// configuration is invalid
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| BridgeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(kubeconfig) = std::env::var("BRIDGE_KUBECONFIG") {
            self.kube.kubeconfig = kubeconfig;
        }

        if let Ok(context) = std::env::var("BRIDGE_KUBE_CONTEXT") {
            self.kube.context = Some(context).filter(|c| !c.is_empty());
        }

        if let Ok(url) = std::env::var("BRIDGE_NATS_URL") {
            self.nats.url = url;
        }

        if let Ok(user) = std::env::var("BRIDGE_NATS_USER") {
            self.nats.user = Some(user);
        }

        if let Ok(password) =
            std::env::var("BRIDGE_NATS_PASSWORD").or_else(|_| std::env::var("NATS_PASSWORD"))
        {
            self.nats.password = Some(password);
        }

        if let Ok(prefix) = std::env::var("BRIDGE_TOPIC_PREFIX") {
            self.bridge.topic_prefix = prefix;
        }

        if let Ok(cluster) = std::env::var("BRIDGE_CLUSTER") {
            self.bridge.cluster = cluster;
        }

        if let Ok(timeout) = std::env::var("BRIDGE_CACHE_SYNC_TIMEOUT") {
            if let Ok(value) = timeout.parse() {
                self.bridge.cache_sync_timeout_secs = value;
            } else {
                tracing::warn!("Invalid BRIDGE_CACHE_SYNC_TIMEOUT: {}", timeout);
            }
        }

        if let Ok(level) = std::env::var("BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("BRIDGE_JSON_LOGS") {
            match json.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid BRIDGE_JSON_LOGS: {}", json),
            }
        }

        if let Ok(file) = std::env::var("BRIDGE_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(file));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }

        match &cli.command {
            crate::cli::Commands::Run {
                kubeconfig,
                nats,
                topic_prefix,
                cluster,
                json_logs,
                log_file,
            } => {
                if let Some(path) = kubeconfig {
                    self.kube.kubeconfig = path.clone();
                }
                if let Some(url) = nats {
                    self.nats.url = url.clone();
                }
                if let Some(prefix) = topic_prefix {
                    self.bridge.topic_prefix = prefix.clone();
                }
                if let Some(cluster) = cluster {
                    self.bridge.cluster = cluster.clone();
                }
                if *json_logs {
                    self.logging.json_format = true;
                }
                if let Some(path) = log_file {
                    self.logging.file_path = Some(path.clone());
                }
            }
            crate::cli::Commands::Tail { nats, .. } => {
                if let Some(url) = nats {
                    self.nats.url = url.clone();
                }
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let prefix_pattern = Regex::new(TOPIC_PREFIX_PATTERN)
            .map_err(|e| BridgeError::Config(format!("Invalid prefix pattern: {}", e)))?;
        if !prefix_pattern.is_match(&self.bridge.topic_prefix) {
            return Err(BridgeError::Config(format!(
                "Invalid topic prefix '{}': must be dot-separated tokens of letters, digits, '-' or '_'",
                self.bridge.topic_prefix
            ))
            .into());
        }

        if self.bridge.cluster.trim().is_empty() {
            return Err(BridgeError::Config("bridge.cluster cannot be empty".to_string()).into());
        }

        url::Url::parse(&self.nats.url).map_err(|e| {
            BridgeError::Config(format!("Invalid NATS URL '{}': {}", self.nats.url, e))
        })?;

        if self.nats.password.is_some() && self.nats.user.is_none() {
            return Err(BridgeError::Config(
                "nats.password requires nats.user to be set".to_string(),
            )
            .into());
        }

        let level = self.logging.level.as_str();
        let is_directive = level.contains('=') || level.contains(',');
        let valid_level = if is_directive {
            tracing_subscriber::EnvFilter::try_new(level).is_ok()
        } else {
            LOG_LEVELS.contains(&level.to_lowercase().as_str())
        };
        if !valid_level {
            return Err(BridgeError::Config(format!(
                "Invalid log level: {}. Must be one of: {} (or an EnvFilter directive)",
                level,
                LOG_LEVELS.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Resolves the settings the running bridge needs.
    pub fn settings(&self) -> BridgeSettings {
        BridgeSettings {
            topic: Topic::from_prefix(&self.bridge.topic_prefix),
            cluster: self.bridge.cluster.clone(),
            cache_sync_timeout: match self.bridge.cache_sync_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}
