//! # Event Handlers
//!
//! The contract every pluggable handler satisfies, plus the worker's built-in
//! handlers and their registration list.
//!
//! A handler receives the decoded payload, ownership of the message handle and
//! the run's dry-run flag. It decides whether and when to acknowledge; the
//! consume loop never does. Any error it returns propagates out of the loop
//! and ends the process.

mod log_event;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::messaging::{MessageHandle, MessagingError};
use crate::registry::{HandlerRegistry, RegistrationError};

pub use log_event::LogEventHandler;

/// Errors raised inside a handler
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Handler {handler} failed: {message}")]
    Failed { handler: String, message: String },

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

impl HandlerError {
    pub fn failed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Business logic invoked for each message on a routed binding
#[async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Name used in logs and registry listings
    fn name(&self) -> &str;

    /// Process one message
    ///
    /// When `dry_run` is true the handler must only simulate side effects.
    async fn handle(
        &self,
        payload: Value,
        handle: Box<dyn MessageHandle>,
        dry_run: bool,
    ) -> HandlerResult;
}

/// Routes served by the built-in handlers
pub const BUILTIN_ROUTES: &[(&str, &str)] = &[
    ("exchange/treeherder/v1/job-actions", "buildbot"),
    ("exchange/taskcluster-queue/v1/task-completed", "primary"),
];

/// Registry with every built-in route registered
pub fn default_registry() -> Result<HandlerRegistry, RegistrationError> {
    let log_handler: Arc<dyn EventHandler> = Arc::new(LogEventHandler::new());

    BUILTIN_ROUTES
        .iter()
        .try_fold(HandlerRegistry::builder(), |builder, (exchange, prefix)| {
            builder.register(*exchange, *prefix, Arc::clone(&log_handler))
        })
        .map(|builder| builder.build())
}
