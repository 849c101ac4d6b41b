//! # Messaging Error Types
//!
//! Structured errors for broker connections, subscriptions and message
//! handles, using thiserror instead of `Box<dyn Error>` patterns.

use thiserror::Error;

/// Errors raised by the broker capability and by message handles
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Subscription to {exchange} with topic {topic} failed: {message}")]
    Subscription {
        exchange: String,
        topic: String,
        message: String,
    },

    #[error("Subscription to {exchange} with topic {topic} was closed by the broker")]
    SubscriptionClosed { exchange: String, topic: String },

    #[error("Exchange not found: {exchange}")]
    ExchangeNotFound { exchange: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Acknowledgement failed for delivery {delivery_tag}: {message}")]
    Acknowledgement { delivery_tag: u64, message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl MessagingError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a subscription setup error
    pub fn subscription(
        exchange: impl Into<String>,
        topic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Subscription {
            exchange: exchange.into(),
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create an error for a delivery stream that ended
    pub fn subscription_closed(exchange: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::SubscriptionClosed {
            exchange: exchange.into(),
            topic: topic.into(),
        }
    }

    /// Create an exchange not found error
    pub fn exchange_not_found(exchange: impl Into<String>) -> Self {
        Self::ExchangeNotFound {
            exchange: exchange.into(),
        }
    }

    /// Create a deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Create an ack/reject error
    pub fn acknowledgement(delivery_tag: u64, message: impl Into<String>) -> Self {
        Self::Acknowledgement {
            delivery_tag,
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        Self::deserialization(err.to_string())
    }
}

impl From<lapin::Error> for MessagingError {
    fn from(err: lapin::Error) -> Self {
        match err {
            lapin::Error::ProtocolError(e) => Self::protocol(e.to_string()),
            other => Self::connection(other.to_string()),
        }
    }
}

/// Convenience alias for messaging results
pub type MessagingResult<T> = Result<T, MessagingError>;
