//! # Worker Errors
//!
//! Top-level error aggregating every failure a run can end with, and the
//! process exit status each one maps to.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::constants::exit_codes;
use crate::handlers::HandlerError;
use crate::messaging::MessagingError;
use crate::registry::{RegistrationError, RoutingError};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl WorkerError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Routing(_) => exit_codes::NO_HANDLER,
            Self::Configuration(_) => exit_codes::CONFIGURATION,
            Self::Messaging(_) => exit_codes::BROKER_UNAVAILABLE,
            Self::Handler(_) | Self::Registration(_) => exit_codes::HANDLER_FAILURE,
        }
    }

    /// Whether the failure was already logged where it was detected
    ///
    /// Routing failures are reported by the bootstrap with the exchange and
    /// full topic; everything else is left to the process edge.
    pub fn logged_at_source(&self) -> bool {
        matches!(self, Self::Routing(_))
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
