//! # Broker Capability
//!
//! Provider-agnostic abstraction over the publish/subscribe broker.
//!
//! ## Architecture
//!
//! ```text
//! Broker (trait)              <- subscribe(exchange, topic, credentials)
//!   ├── PulseBroker           <- AMQP 0.9.1 via lapin
//!   └── InMemoryBroker        <- durable queues in process, for tests
//!
//! Subscription (trait)        <- next_message(): waits for one delivery
//! ```
//!
//! Every subscription is durable and named after the worker's applabel, so
//! messages published while the worker is briefly disconnected are retained
//! by the broker.

pub mod providers;
mod traits;
mod types;

pub use providers::{InMemoryBroker, PulseBroker};
pub use traits::{Broker, Subscription};
pub use types::{PulseCredentials, SubscriptionRequest};
