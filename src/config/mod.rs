//! # Worker Configuration
//!
//! The worker is driven by a small JSON file naming the exchange and topic to
//! listen on:
//!
//! ```json
//! { "exchange": "exchange/treeherder/v1/job-actions", "topic": "buildbot.#" }
//! ```
//!
//! An optional `broker` object overrides the Pulse connection defaults, and any
//! key can be overridden from the environment with the `PULSE_ACTIONS__`
//! prefix (`PULSE_ACTIONS__BROKER__HOST=localhost`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pulse_actions::config::{ConfigLoader, RuntimeConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let worker_config = ConfigLoader::discover(None)?.load()?;
//! let runtime = RuntimeConfig::from(&worker_config);
//! assert!(runtime.dry_run);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::constants::{broker_defaults, APP_LABEL};
use crate::registry::TopicPrefix;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Contents of the runtime configuration file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Exchange to subscribe to
    pub exchange: String,
    /// Full topic (routing key pattern) to bind with
    pub topic: String,
    /// Pulse connection settings
    #[serde(default)]
    pub broker: BrokerConfig,
}

impl WorkerConfig {
    /// Reject configurations that can never route
    pub fn validate(&self) -> ConfigResult<()> {
        if self.exchange.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "exchange",
                "runtime configuration",
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "topic",
                "runtime configuration",
            ));
        }
        if self.broker.host.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "broker.host",
                &self.broker.host,
                "broker host must not be empty",
            ));
        }
        if self.broker.port == 0 {
            return Err(ConfigurationError::invalid_value(
                "broker.port",
                "0",
                "broker port must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Pulse connection settings; defaults point at the public Pulse service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub use_tls: bool,
    /// Unacknowledged deliveries the broker may push ahead of the handler
    pub prefetch_count: u16,
    pub connection_name: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: broker_defaults::HOST.to_string(),
            port: broker_defaults::PORT,
            vhost: broker_defaults::VHOST.to_string(),
            use_tls: broker_defaults::USE_TLS,
            prefetch_count: broker_defaults::PREFETCH_COUNT,
            connection_name: APP_LABEL.to_string(),
        }
    }
}

/// The resolved `(exchange, topic, dry_run)` triple driving one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub exchange: String,
    pub topic: String,
    pub dry_run: bool,
}

impl RuntimeConfig {
    /// Runtime configuration for a binding; dry-run is always on
    pub fn new(exchange: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            topic: topic.into(),
            dry_run: true,
        }
    }

    /// Routing granularity of the configured topic
    pub fn topic_prefix(&self) -> TopicPrefix {
        TopicPrefix::of(&self.topic)
    }
}

impl From<&WorkerConfig> for RuntimeConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self::new(&config.exchange, &config.topic)
    }
}
