//! # Broker Traits
//!
//! Core trait definitions for the subscribe-and-receive capability.

use async_trait::async_trait;

use super::types::SubscriptionRequest;
use crate::messaging::{Message, MessagingError};

/// Publish/subscribe broker able to open durable subscriptions
///
/// Implementations own connection negotiation, authentication and wire
/// decoding. Errors are returned as-is; no implementation retries.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Open a durable, named subscription for the requested binding
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<Box<dyn Subscription>, MessagingError>;

    /// Provider name for logging (e.g., "amqp", "in_memory")
    fn provider_name(&self) -> &'static str;
}

/// A live binding between this process and one exchange/topic
#[async_trait]
pub trait Subscription: Send {
    /// Wait until the next delivery arrives
    ///
    /// Returns `Ok(None)` when the broker ends the delivery stream.
    async fn next_message(&mut self) -> Result<Option<Message>, MessagingError>;

    /// Broker-side queue name backing the subscription
    fn queue_name(&self) -> &str;
}
