//! # Broker Service Types
//!
//! Parameters handed to a [`Broker`](super::Broker) when subscribing.

use std::env;
use std::fmt;

use crate::constants::{APP_LABEL, PULSE_PASSWORD_ENV, PULSE_USER_ENV};
use crate::messaging::MessagingError;

/// Broker credentials taken from the process environment
#[derive(Clone, PartialEq, Eq)]
pub struct PulseCredentials {
    pub user: String,
    pub password: String,
}

impl PulseCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Read `PULSE_USER` and `PULSE_PW`
    pub fn from_env() -> Result<Self, MessagingError> {
        Self::from_values(env::var(PULSE_USER_ENV).ok(), env::var(PULSE_PASSWORD_ENV).ok())
    }

    /// Build credentials from optional values, failing on missing or empty ones
    pub fn from_values(
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self, MessagingError> {
        let user = user.filter(|u| !u.is_empty()).ok_or_else(|| {
            MessagingError::authentication(format!("{PULSE_USER_ENV} is not set"))
        })?;
        let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
            MessagingError::authentication(format!("{PULSE_PASSWORD_ENV} is not set"))
        })?;

        Ok(Self { user, password })
    }
}

impl fmt::Debug for PulseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulseCredentials")
            .field("user", &self.user)
            .field("password", &"[MASKED]")
            .finish()
    }
}

/// Everything a broker needs to open the worker's subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Fixed label naming this worker type; part of the durable queue name
    pub applabel: String,
    pub exchange: String,
    pub topic: String,
    pub durable: bool,
    pub credentials: PulseCredentials,
}

impl SubscriptionRequest {
    /// Durable request under the worker's applabel
    pub fn durable(
        exchange: impl Into<String>,
        topic: impl Into<String>,
        credentials: PulseCredentials,
    ) -> Self {
        Self {
            applabel: APP_LABEL.to_string(),
            exchange: exchange.into(),
            topic: topic.into(),
            durable: true,
            credentials,
        }
    }

    /// Broker-side queue name: `queue/<user>/<applabel>`
    pub fn queue_name(&self) -> String {
        format!("queue/{}/{}", self.credentials.user, self.applabel)
    }
}
