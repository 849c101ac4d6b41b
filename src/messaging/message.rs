//! # Delivered Messages
//!
//! A [`Message`] pairs the decoded payload with an opaque [`MessageHandle`].
//! The handle is how a handler acknowledges or rejects the delivery; the
//! consume loop itself never does.

use async_trait::async_trait;
use serde_json::Value;

use super::errors::MessagingResult;

/// Acknowledgeable reference to one delivery, provided by the broker
#[async_trait]
pub trait MessageHandle: Send + Sync + std::fmt::Debug {
    /// Broker-assigned delivery tag, unique per subscription
    fn delivery_tag(&self) -> u64;

    /// Exchange the message was published to
    fn exchange(&self) -> &str;

    /// Routing key (full topic) the message was published with
    fn routing_key(&self) -> &str;

    /// Whether the broker has delivered this message before
    fn redelivered(&self) -> bool;

    /// Acknowledge the delivery so the broker drops it
    async fn ack(&self) -> MessagingResult<()>;

    /// Reject the delivery, optionally asking the broker to requeue it
    async fn reject(&self, requeue: bool) -> MessagingResult<()>;
}

/// One delivery from a subscription
#[derive(Debug)]
pub struct Message {
    /// JSON body of the message
    pub payload: Value,
    /// Handle used to ack or reject the delivery
    pub handle: Box<dyn MessageHandle>,
}

impl Message {
    pub fn new(payload: Value, handle: Box<dyn MessageHandle>) -> Self {
        Self { payload, handle }
    }

    /// Split into payload and handle, as passed to a handler
    pub fn into_parts(self) -> (Value, Box<dyn MessageHandle>) {
        (self.payload, self.handle)
    }
}
