//! # Worker Constants
//!
//! Fixed names shared by the configuration loader, the broker providers and
//! the binary.

/// Label identifying this worker type to the broker
pub const APP_LABEL: &str = "pulse_actions";

/// Environment variable holding the broker user
pub const PULSE_USER_ENV: &str = "PULSE_USER";

/// Environment variable holding the broker password
pub const PULSE_PASSWORD_ENV: &str = "PULSE_PW";

/// Delimiter between topic segments
pub const TOPIC_DELIMITER: char = '.';

/// Configuration file looked up next to the worker executable
pub const RUNTIME_CONFIG_FILE: &str = "run_time_config.json";

/// Environment variable overriding the configuration file path
pub const RUNTIME_CONFIG_PATH_ENV: &str = "PULSE_ACTIONS_CONFIG";

/// Prefix for environment overrides of configuration keys
pub const CONFIG_ENV_PREFIX: &str = "PULSE_ACTIONS";

/// Default tracing filter; the AMQP client is too noisy at info
pub const DEFAULT_LOG_FILTER: &str = "info,lapin=warn,amq_protocol=warn";

/// Defaults of the public Pulse service
pub mod broker_defaults {
    pub const HOST: &str = "pulse.mozilla.org";
    pub const PORT: u16 = 5671;
    pub const VHOST: &str = "/";
    pub const USE_TLS: bool = true;
    pub const PREFETCH_COUNT: u16 = 1;
}

/// Process exit statuses
pub mod exit_codes {
    /// No handler is registered for the configured exchange and topic
    pub const NO_HANDLER: i32 = 1;
    /// Configuration file missing or malformed (EX_CONFIG)
    pub const CONFIGURATION: i32 = 78;
    /// Broker unreachable, authentication refused or connection lost (EX_UNAVAILABLE)
    pub const BROKER_UNAVAILABLE: i32 = 69;
    /// A handler failed (EX_SOFTWARE)
    pub const HANDLER_FAILURE: i32 = 70;
}
