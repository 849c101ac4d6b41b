//! # Messaging Module
//!
//! Broker-facing side of the worker: the capability to subscribe to an
//! exchange/topic binding and receive `(payload, handle)` pairs from it.
//!
//! The core only depends on the [`service::Broker`] and
//! [`service::Subscription`] traits; concrete providers live in
//! [`service::providers`].

pub mod errors;
pub mod message;
pub mod service;

pub use errors::{MessagingError, MessagingResult};
pub use message::{Message, MessageHandle};
pub use service::{Broker, PulseCredentials, Subscription, SubscriptionRequest};
