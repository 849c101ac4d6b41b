//! # Worker Bootstrap
//!
//! Turns a [`RuntimeConfig`] into a running consume loop:
//!
//! ```text
//! topic ──TopicPrefix──> prefix ──registry.lookup──> handler
//!       ──bind(dry_run)──> BoundHandler ──subscribe──> ConsumeLoop::run
//! ```
//!
//! An unrouted configuration is logged and rejected before the broker is
//! contacted.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::RuntimeConfig;
use crate::consume_loop::ConsumeLoop;
use crate::consumer::Consumer;
use crate::dispatch::BoundHandler;
use crate::error::WorkerResult;
use crate::messaging::{Broker, PulseCredentials};
use crate::registry::{HandlerRegistry, RoutingError};

pub struct WorkerBootstrap {
    registry: Arc<HandlerRegistry>,
    broker: Arc<dyn Broker>,
    credentials: Option<PulseCredentials>,
}

impl WorkerBootstrap {
    pub fn new(registry: Arc<HandlerRegistry>, broker: Arc<dyn Broker>) -> Self {
        Self {
            registry,
            broker,
            credentials: None,
        }
    }

    /// Use these credentials instead of reading `PULSE_USER` / `PULSE_PW`
    pub fn with_credentials(mut self, credentials: PulseCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Find and bind the handler for the configured binding
    pub fn resolve(&self, config: &RuntimeConfig) -> Result<BoundHandler, RoutingError> {
        let prefix = config.topic_prefix();
        let handler = self.registry.lookup(&config.exchange, prefix.as_str())?;
        debug!(
            exchange = %config.exchange,
            topic_prefix = %prefix,
            handler = handler.name(),
            "Resolved event handler"
        );
        Ok(BoundHandler::bind(handler, config.dry_run))
    }

    /// Resolve the handler and subscribe
    pub async fn start(&self, config: &RuntimeConfig) -> WorkerResult<ConsumeLoop> {
        let bound = self.resolve(config).map_err(|e| {
            error!(
                "We don't have an event handler for {} with topic {}.",
                config.exchange, config.topic
            );
            e
        })?;

        let consumer = match &self.credentials {
            Some(credentials) => {
                Consumer::subscribe_with_credentials(
                    self.broker.as_ref(),
                    &config.exchange,
                    &config.topic,
                    credentials.clone(),
                    bound,
                )
                .await?
            }
            None => {
                Consumer::subscribe(self.broker.as_ref(), &config.exchange, &config.topic, bound)
                    .await?
            }
        };

        Ok(ConsumeLoop::new(consumer))
    }

    /// Start and consume until the first failure
    pub async fn run(&self, config: &RuntimeConfig) -> WorkerResult<()> {
        let mut consume_loop = self.start(config).await?;
        consume_loop.run().await
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for WorkerBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerBootstrap")
            .field("registry", &self.registry)
            .field("broker", &self.broker.provider_name())
            .field("credentials", &self.credentials)
            .finish()
    }
}
