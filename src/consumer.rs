//! # Consumer
//!
//! Owns the single broker subscription of a run and feeds each delivery to
//! the bound handler, one at a time and in delivery order.
//!
//! The consumer never acknowledges on its own and never reconnects: a lost
//! connection surfaces as an error from [`Consumer::receive_next`].
//!
//! ```rust
//! use std::sync::Arc;
//! use pulse_actions::handlers::LogEventHandler;
//! use pulse_actions::messaging::service::InMemoryBroker;
//! use pulse_actions::{BoundHandler, Consumer, PulseCredentials};
//!
//! # tokio_test::block_on(async {
//! let broker = InMemoryBroker::with_exchanges(&["exchange/jobs"]);
//! let bound = BoundHandler::bind(Arc::new(LogEventHandler::new()), true);
//! let mut consumer = Consumer::subscribe_with_credentials(
//!     &broker,
//!     "exchange/jobs",
//!     "build.#",
//!     PulseCredentials::new("worker", "pw"),
//!     bound,
//! )
//! .await?;
//!
//! broker.publish("exchange/jobs", "build.success", serde_json::json!({"id": 42}));
//! consumer.receive_next().await?;
//! assert_eq!(broker.acked("queue/worker/pulse_actions"), vec![1]);
//! # Ok::<(), pulse_actions::WorkerError>(())
//! # }).unwrap();
//! ```

use tracing::{debug, info};

use crate::dispatch::BoundHandler;
use crate::error::WorkerResult;
use crate::messaging::{Broker, MessagingError, PulseCredentials, Subscription, SubscriptionRequest};

/// An active subscription bound to one handler
pub struct Consumer {
    subscription: Box<dyn Subscription>,
    bound: BoundHandler,
    exchange: String,
    topic: String,
}

impl Consumer {
    /// Subscribe with credentials read from `PULSE_USER` / `PULSE_PW`
    pub async fn subscribe(
        broker: &dyn Broker,
        exchange: &str,
        topic: &str,
        bound: BoundHandler,
    ) -> WorkerResult<Self> {
        let credentials = PulseCredentials::from_env()?;
        Self::subscribe_with_credentials(broker, exchange, topic, credentials, bound).await
    }

    /// Subscribe with explicit credentials
    pub async fn subscribe_with_credentials(
        broker: &dyn Broker,
        exchange: &str,
        topic: &str,
        credentials: PulseCredentials,
        bound: BoundHandler,
    ) -> WorkerResult<Self> {
        let request = SubscriptionRequest::durable(exchange, topic, credentials);
        debug!(
            provider = broker.provider_name(),
            queue = %request.queue_name(),
            "Opening durable subscription"
        );

        let subscription = broker.subscribe(request).await?;
        info!("Listening on {}, with topic {}", exchange, topic);

        Ok(Self {
            subscription,
            bound,
            exchange: exchange.to_string(),
            topic: topic.to_string(),
        })
    }

    /// Wait for one delivery and hand it to the bound handler
    ///
    /// Returns once the handler has returned. A subscription stream that ends
    /// is reported as [`MessagingError::SubscriptionClosed`].
    pub async fn receive_next(&mut self) -> WorkerResult<()> {
        let message = self
            .subscription
            .next_message()
            .await?
            .ok_or_else(|| MessagingError::subscription_closed(&self.exchange, &self.topic))?;

        let (payload, handle) = message.into_parts();
        self.bound.dispatch(payload, handle).await?;
        Ok(())
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn queue_name(&self) -> &str {
        self.subscription.queue_name()
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("exchange", &self.exchange)
            .field("topic", &self.topic)
            .field("queue", &self.subscription.queue_name())
            .field("handler", &self.bound.handler_name())
            .finish()
    }
}
