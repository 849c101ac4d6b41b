//! # Handler Registry
//!
//! Static two-level mapping `exchange -> topic prefix -> handler`.
//!
//! The registry is built once from an explicit registration list and is
//! read-only afterwards, so lookups need no locking. Lookup is an exact match
//! on both levels: no wildcard expansion, no nearest match, no default handler.
//!
//! ## Usage
//!
//! ```rust
//! use pulse_actions::handlers::LogEventHandler;
//! use pulse_actions::registry::HandlerRegistry;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = HandlerRegistry::builder()
//!     .register("exchange/jobs", "build", Arc::new(LogEventHandler::new()))?
//!     .build();
//!
//! assert!(registry.lookup("exchange/jobs", "build").is_ok());
//! assert!(registry.lookup("exchange/jobs", "deploy").is_err());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::error::{RegistrationError, RoutingError};
use crate::handlers::EventHandler;

type TopicHandlers = BTreeMap<String, Arc<dyn EventHandler>>;

/// Read-only registry of handlers keyed by `(exchange, topic prefix)`
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    exchanges: BTreeMap<String, TopicHandlers>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Exact lookup of the handler registered for the pair
    pub fn lookup(
        &self,
        exchange: &str,
        topic_prefix: &str,
    ) -> Result<Arc<dyn EventHandler>, RoutingError> {
        let topics = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| RoutingError::ExchangeNotFound {
                exchange: exchange.to_string(),
            })?;

        topics
            .get(topic_prefix)
            .cloned()
            .ok_or_else(|| RoutingError::TopicNotFound {
                exchange: exchange.to_string(),
                topic_prefix: topic_prefix.to_string(),
            })
    }

    /// Check if a handler is registered for the pair
    pub fn contains(&self, exchange: &str, topic_prefix: &str) -> bool {
        self.exchanges
            .get(exchange)
            .is_some_and(|topics| topics.contains_key(topic_prefix))
    }

    /// Number of registered `(exchange, prefix)` pairs
    pub fn len(&self) -> usize {
        self.exchanges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Registered exchanges, sorted
    pub fn exchanges(&self) -> Vec<&str> {
        self.exchanges.keys().map(String::as_str).collect()
    }

    /// All registered pairs, sorted by exchange then prefix
    pub fn routes(&self) -> Vec<(&str, &str)> {
        self.exchanges
            .iter()
            .flat_map(|(exchange, topics)| {
                topics
                    .keys()
                    .map(move |prefix| (exchange.as_str(), prefix.as_str()))
            })
            .collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .exchanges
            .iter()
            .flat_map(|(exchange, topics)| {
                topics
                    .iter()
                    .map(move |(prefix, handler)| format!("{exchange}/{prefix} -> {}", handler.name()))
            })
            .collect();

        f.debug_struct("HandlerRegistry")
            .field("handler_count", &self.len())
            .field("routes", &routes)
            .finish()
    }
}

/// Collects registrations and rejects duplicate keys
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    exchanges: BTreeMap<String, TopicHandlers>,
}

impl HandlerRegistryBuilder {
    /// Register a handler for an exchange and topic prefix
    pub fn register(
        mut self,
        exchange: impl Into<String>,
        topic_prefix: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self, RegistrationError> {
        let exchange = exchange.into();
        let topic_prefix = topic_prefix.into();

        if exchange.is_empty() {
            return Err(RegistrationError::EmptyKey { field: "exchange" });
        }
        if topic_prefix.is_empty() {
            return Err(RegistrationError::EmptyKey {
                field: "topic prefix",
            });
        }

        let topics = self.exchanges.entry(exchange.clone()).or_default();
        if topics.contains_key(&topic_prefix) {
            return Err(RegistrationError::DuplicateHandler {
                exchange,
                topic_prefix,
            });
        }

        debug!(
            exchange = %exchange,
            topic_prefix = %topic_prefix,
            handler = handler.name(),
            "Registered event handler"
        );
        topics.insert(topic_prefix, handler);
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            exchanges: self.exchanges,
        }
    }
}
