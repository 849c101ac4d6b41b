//! Registry error types

use thiserror::Error;

/// No handler is registered for an exchange/topic-prefix pair
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No handlers registered for exchange {exchange}")]
    ExchangeNotFound { exchange: String },

    #[error("No handler registered for exchange {exchange} with topic prefix '{topic_prefix}'")]
    TopicNotFound {
        exchange: String,
        topic_prefix: String,
    },
}

impl RoutingError {
    pub fn exchange(&self) -> &str {
        match self {
            Self::ExchangeNotFound { exchange } | Self::TopicNotFound { exchange, .. } => exchange,
        }
    }
}

/// Invalid registration while building a registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Handler already registered for exchange {exchange} with topic prefix '{topic_prefix}'")]
    DuplicateHandler {
        exchange: String,
        topic_prefix: String,
    },

    #[error("Cannot register a handler with an empty {field}")]
    EmptyKey { field: &'static str },
}
