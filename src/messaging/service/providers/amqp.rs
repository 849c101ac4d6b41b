//! # Pulse AMQP Broker
//!
//! `Broker` implementation for Pulse using the `lapin` crate (AMQP 0.9.1).
//!
//! ## Subscription setup
//!
//! 1. Connect with the request's credentials (TLS by default).
//! 2. Declare the durable queue `queue/<user>/<applabel>`; it survives
//!    consumer disconnects so messages published meanwhile are retained.
//! 3. Passively declare the topic exchange: it belongs to the publisher and
//!    must already exist.
//! 4. Bind the queue to the exchange with the topic as routing key.
//! 5. Start a consumer tagged with the applabel.
//!
//! Deliveries are never auto-acknowledged; the handle returned with each
//! message wraps the lapin acker.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::BrokerConfig;
use crate::messaging::service::traits::{Broker, Subscription};
use crate::messaging::service::types::SubscriptionRequest;
use crate::messaging::{Message, MessageHandle, MessagingError, MessagingResult};

/// Pulse broker reached over AMQP
#[derive(Debug, Clone)]
pub struct PulseBroker {
    config: BrokerConfig,
}

impl PulseBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    /// Connection URI for the request's credentials
    fn connection_uri(&self, request: &SubscriptionRequest) -> AMQPUri {
        AMQPUri {
            scheme: if self.config.use_tls {
                AMQPScheme::AMQPS
            } else {
                AMQPScheme::AMQP
            },
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: request.credentials.user.clone(),
                    password: request.credentials.password.clone(),
                },
                host: self.config.host.clone(),
                port: self.config.port,
            },
            vhost: self.config.vhost.clone(),
            query: Default::default(),
        }
    }

    /// Connection endpoint without credentials, for logging
    pub fn endpoint(&self) -> String {
        let scheme = if self.config.use_tls { "amqps" } else { "amqp" };
        format!(
            "{scheme}://{}:{}{}",
            self.config.host, self.config.port, self.config.vhost
        )
    }

    async fn open_channel(
        &self,
        request: &SubscriptionRequest,
    ) -> MessagingResult<(Connection, Channel)> {
        // Instance suffix keeps restarted workers apart in the broker's connection list
        let connection_name = format!("{}-{}", self.config.connection_name, Uuid::new_v4());
        debug!(connection_name = %connection_name, endpoint = %self.endpoint(), "Connecting to Pulse");

        let connection = Connection::connect_uri(
            self.connection_uri(request),
            ConnectionProperties::default().with_connection_name(connection_name.into()),
        )
        .await
        .map_err(|e| {
            let error_str = e.to_string();
            if error_str.contains("ACCESS_REFUSED") || error_str.contains("403") {
                MessagingError::authentication(format!(
                    "Pulse refused credentials for {}: {}",
                    request.credentials.user, error_str
                ))
            } else {
                MessagingError::connection(format!(
                    "Pulse connection to {} failed: {}",
                    self.endpoint(),
                    error_str
                ))
            }
        })?;

        let channel = connection.create_channel().await.map_err(|e| {
            MessagingError::connection(format!("Pulse channel creation failed: {}", e))
        })?;

        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| MessagingError::connection(format!("Failed to set QoS: {}", e)))?;

        Ok((connection, channel))
    }
}

#[async_trait]
impl Broker for PulseBroker {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<Box<dyn Subscription>, MessagingError> {
        let (connection, channel) = self.open_channel(&request).await?;
        let queue_name = request.queue_name();

        channel
            .exchange_declare(
                &request.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    passive: true,
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                let error_str = e.to_string();
                if error_str.contains("NOT_FOUND") || error_str.contains("404") {
                    MessagingError::exchange_not_found(&request.exchange)
                } else {
                    MessagingError::subscription(&request.exchange, &request.topic, error_str)
                }
            })?;

        channel
            .queue_declare(
                &queue_name,
                QueueDeclareOptions {
                    durable: request.durable,
                    auto_delete: !request.durable,
                    exclusive: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::subscription(
                    &request.exchange,
                    &request.topic,
                    format!("Queue {} declaration failed: {}", queue_name, e),
                )
            })?;

        channel
            .queue_bind(
                &queue_name,
                &request.exchange,
                &request.topic,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::subscription(
                    &request.exchange,
                    &request.topic,
                    format!("Queue binding failed: {}", e),
                )
            })?;

        let consumer = channel
            .basic_consume(
                &queue_name,
                &request.applabel,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::subscription(
                    &request.exchange,
                    &request.topic,
                    format!("basic_consume failed: {}", e),
                )
            })?;

        info!(
            endpoint = %self.endpoint(),
            queue = %queue_name,
            "Pulse subscription established"
        );

        Ok(Box::new(PulseSubscription {
            _connection: connection,
            _channel: channel,
            consumer,
            queue_name,
        }))
    }

    fn provider_name(&self) -> &'static str {
        "amqp"
    }
}

/// Live Pulse subscription; owns its connection for the process lifetime
struct PulseSubscription {
    _connection: Connection,
    _channel: Channel,
    consumer: lapin::Consumer,
    queue_name: String,
}

#[async_trait]
impl Subscription for PulseSubscription {
    async fn next_message(&mut self) -> Result<Option<Message>, MessagingError> {
        let delivery = match self.consumer.next().await {
            Some(delivery) => delivery?,
            None => return Ok(None),
        };

        debug!(
            delivery_tag = delivery.delivery_tag,
            routing_key = delivery.routing_key.as_str(),
            redelivered = delivery.redelivered,
            "Received Pulse delivery"
        );

        let payload = serde_json::from_slice(&delivery.data)?;
        Ok(Some(Message::new(
            payload,
            Box::new(AmqpMessageHandle::from_delivery(delivery)),
        )))
    }

    fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

/// Handle over one AMQP delivery
pub struct AmqpMessageHandle {
    delivery_tag: u64,
    exchange: String,
    routing_key: String,
    redelivered: bool,
    acker: Acker,
}

impl AmqpMessageHandle {
    fn from_delivery(delivery: Delivery) -> Self {
        Self {
            delivery_tag: delivery.delivery_tag,
            exchange: delivery.exchange.as_str().to_string(),
            routing_key: delivery.routing_key.as_str().to_string(),
            redelivered: delivery.redelivered,
            acker: delivery.acker,
        }
    }
}

impl std::fmt::Debug for AmqpMessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpMessageHandle")
            .field("delivery_tag", &self.delivery_tag)
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

#[async_trait]
impl MessageHandle for AmqpMessageHandle {
    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn exchange(&self) -> &str {
        &self.exchange
    }

    fn routing_key(&self) -> &str {
        &self.routing_key
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    async fn ack(&self) -> MessagingResult<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| MessagingError::acknowledgement(self.delivery_tag, e.to_string()))
    }

    async fn reject(&self, requeue: bool) -> MessagingResult<()> {
        self.acker
            .reject(BasicRejectOptions { requeue })
            .await
            .map_err(|e| MessagingError::acknowledgement(self.delivery_tag, e.to_string()))
    }
}
