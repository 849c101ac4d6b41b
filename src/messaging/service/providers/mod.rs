//! # Broker Providers
//!
//! Concrete implementations of the `Broker` trait.
//!
//! - [`PulseBroker`] - Pulse over AMQP 0.9.1 via the lapin crate
//! - [`InMemoryBroker`] - process-local durable queues for testing

mod amqp;
mod in_memory;

pub use amqp::{AmqpMessageHandle, PulseBroker};
pub use in_memory::{topic_matches, InMemoryBroker, InMemoryMessageHandle};
