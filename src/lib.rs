#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Pulse Actions
//!
//! Long-running worker that subscribes to one Mozilla Pulse exchange/topic
//! binding and hands every message to the handler registered for that
//! binding.
//!
//! ## Overview
//!
//! A run is configured by a JSON file naming an `exchange` and a `topic`. The
//! worker takes the topic's first segment as its *prefix*, looks up the
//! handler registered for `(exchange, prefix)`, binds it to the run's
//! dry-run flag and opens a durable subscription. From then on it processes
//! deliveries strictly one at a time until something fails; it never exits
//! successfully and relies on an external supervisor for restarts.
//!
//! ## Module Organization
//!
//! - [`config`] - Runtime configuration file and broker settings
//! - [`registry`] - Static `(exchange, topic prefix) -> handler` registry
//! - [`handlers`] - Handler contract and built-in handlers
//! - [`dispatch`] - Handler bound to the dry-run flag
//! - [`messaging`] - Broker capability with AMQP and in-memory providers
//! - [`consumer`] / [`consume_loop`] - Subscription and the receive loop
//! - [`bootstrap`] - Wires configuration, registry and broker together
//! - [`error`] - Top-level error and exit statuses
//! - [`logging`] - `LEVEL:\t message` log records
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pulse_actions::config::{ConfigLoader, RuntimeConfig};
//! use pulse_actions::handlers::default_registry;
//! use pulse_actions::messaging::service::PulseBroker;
//! use pulse_actions::WorkerBootstrap;
//!
//! # async fn example() -> Result<(), pulse_actions::WorkerError> {
//! let worker_config = ConfigLoader::discover(None)?.load()?;
//! let broker = PulseBroker::new(worker_config.broker.clone());
//! let bootstrap = WorkerBootstrap::new(Arc::new(default_registry()?), Arc::new(broker));
//!
//! // Only returns on failure
//! bootstrap.run(&RuntimeConfig::from(&worker_config)).await
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod consume_loop;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod registry;

pub use bootstrap::WorkerBootstrap;
pub use config::{BrokerConfig, ConfigLoader, ConfigurationError, RuntimeConfig, WorkerConfig};
pub use consume_loop::{ConsumeLoop, LoopState};
pub use consumer::Consumer;
pub use dispatch::BoundHandler;
pub use error::{WorkerError, WorkerResult};
pub use handlers::{EventHandler, HandlerError, HandlerResult};
pub use messaging::{Broker, Message, MessageHandle, MessagingError, PulseCredentials};
pub use registry::{HandlerRegistry, RoutingError, TopicPrefix};
