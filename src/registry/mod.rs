//! # Handler Routing
//!
//! Maps a configured `(exchange, topic)` to the handler that processes its
//! messages.
//!
//! ```text
//! "build.linux.success" ──TopicPrefix──> "build"
//! ("exchange/jobs", "build") ──HandlerRegistry::lookup──> Arc<dyn EventHandler>
//! ```

pub mod error;
pub mod handler_registry;
pub mod topic;

pub use error::{RegistrationError, RoutingError};
pub use handler_registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use topic::TopicPrefix;
