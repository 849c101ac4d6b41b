//! # In-Memory Broker
//!
//! Process-local broker for tests and development runs.
//!
//! ## Features
//!
//! - **Durable Queues**: one queue per `queue/<user>/<applabel>` name, kept
//!   across subscriptions so messages published meanwhile are retained
//! - **Topic Bindings**: AMQP topic-pattern matching (`*` matches one word,
//!   `#` matches zero or more)
//! - **Ack Bookkeeping**: unacked, acked and rejected deliveries per queue,
//!   with requeue on reject; deliveries left unacked when a new subscription
//!   opens on the queue are redelivered first, as a broker does when a
//!   consumer's channel closes
//! - **Failure Injection**: the next receive can be made to fail with any
//!   `MessagingError`
//!
//! `next_message` waits on an empty queue until something is published, as a
//! broker-backed subscription does. [`InMemoryBroker::close`] ends every
//! delivery stream once its queue is drained (`next_message` returns
//! `Ok(None)`), standing in for the broker cancelling the consumer.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::debug;

use crate::constants::TOPIC_DELIMITER;
use crate::messaging::service::traits::{Broker, Subscription};
use crate::messaging::service::types::{PulseCredentials, SubscriptionRequest};
use crate::messaging::{Message, MessageHandle, MessagingError, MessagingResult};

/// Message waiting in a queue
#[derive(Debug, Clone)]
struct PendingMessage {
    exchange: String,
    routing_key: String,
    payload: Value,
    redelivered: bool,
    enqueued_at: DateTime<Utc>,
}

/// Durable queue bound to one exchange/topic pattern
#[derive(Debug)]
struct InMemoryQueue {
    exchange: String,
    binding: String,
    pending: VecDeque<PendingMessage>,
    unacked: HashMap<u64, PendingMessage>,
    acked: Vec<u64>,
    rejected: Vec<u64>,
    next_delivery_tag: u64,
}

impl InMemoryQueue {
    fn new(exchange: &str, binding: &str) -> Self {
        Self {
            exchange: exchange.to_string(),
            binding: binding.to_string(),
            pending: VecDeque::new(),
            unacked: HashMap::new(),
            acked: Vec::new(),
            rejected: Vec::new(),
            next_delivery_tag: 1,
        }
    }

    /// Return unsettled deliveries to the head of the queue, oldest first
    fn requeue_unacked(&mut self) -> usize {
        let mut tags: Vec<u64> = self.unacked.keys().copied().collect();
        tags.sort_unstable_by(|a, b| b.cmp(a));
        for tag in &tags {
            if let Some(mut message) = self.unacked.remove(tag) {
                message.redelivered = true;
                self.pending.push_front(message);
            }
        }
        tags.len()
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    exchanges: HashSet<String>,
    queues: HashMap<String, InMemoryQueue>,
    subscribe_calls: usize,
    required_credentials: Option<PulseCredentials>,
    fail_next_receive: Option<MessagingError>,
    closed: bool,
}

/// In-memory broker for testing
///
/// # Example
///
/// ```rust
/// use pulse_actions::messaging::service::InMemoryBroker;
///
/// let broker = InMemoryBroker::with_exchanges(&["exchange/jobs"]);
/// broker.publish("exchange/jobs", "build.success", serde_json::json!({"id": 42}));
/// assert_eq!(broker.subscribe_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    /// Wakes subscriptions waiting on an empty queue
    wakeup: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-declared exchanges
    pub fn with_exchanges(exchanges: &[&str]) -> Self {
        let broker = Self::new();
        for exchange in exchanges {
            broker.declare_exchange(exchange);
        }
        broker
    }

    /// Declare an exchange so subscriptions to it succeed
    pub fn declare_exchange(&self, exchange: &str) {
        self.state.lock().exchanges.insert(exchange.to_string());
    }

    /// Only accept subscriptions carrying these credentials
    pub fn require_credentials(&self, credentials: PulseCredentials) {
        self.state.lock().required_credentials = Some(credentials);
    }

    /// Make the next receive on any subscription fail with `error`
    pub fn fail_next_receive(&self, error: MessagingError) {
        self.state.lock().fail_next_receive = Some(error);
        self.wakeup.notify_waiters();
    }

    /// End every delivery stream once its queue is drained
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.wakeup.notify_waiters();
    }

    /// Publish to an exchange; returns the number of queues the message was routed to
    pub fn publish(&self, exchange: &str, routing_key: &str, payload: Value) -> usize {
        let mut state = self.state.lock();
        let mut routed = 0;
        for queue in state.queues.values_mut() {
            if queue.exchange == exchange && topic_matches(&queue.binding, routing_key) {
                queue.pending.push_back(PendingMessage {
                    exchange: exchange.to_string(),
                    routing_key: routing_key.to_string(),
                    payload: payload.clone(),
                    redelivered: false,
                    enqueued_at: Utc::now(),
                });
                routed += 1;
            }
        }
        drop(state);

        if routed > 0 {
            self.wakeup.notify_waiters();
        }
        routed
    }

    /// Number of `subscribe` calls made, successful or not
    pub fn subscribe_count(&self) -> usize {
        self.state.lock().subscribe_calls
    }

    /// Messages waiting in a queue (for testing)
    pub fn queue_length(&self, queue_name: &str) -> usize {
        self.state
            .lock()
            .queues
            .get(queue_name)
            .map(|q| q.pending.len())
            .unwrap_or(0)
    }

    /// Delivery tags acknowledged on a queue
    pub fn acked(&self, queue_name: &str) -> Vec<u64> {
        self.state
            .lock()
            .queues
            .get(queue_name)
            .map(|q| q.acked.clone())
            .unwrap_or_default()
    }

    /// Delivery tags rejected without requeue on a queue
    pub fn rejected(&self, queue_name: &str) -> Vec<u64> {
        self.state
            .lock()
            .queues
            .get(queue_name)
            .map(|q| q.rejected.clone())
            .unwrap_or_default()
    }

    /// Deliveries handed out but neither acked nor rejected
    pub fn unacked_count(&self, queue_name: &str) -> usize {
        self.state
            .lock()
            .queues
            .get(queue_name)
            .map(|q| q.unacked.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<Box<dyn Subscription>, MessagingError> {
        let queue_name = request.queue_name();
        let mut state = self.state.lock();
        state.subscribe_calls += 1;

        if let Some(required) = &state.required_credentials {
            if *required != request.credentials {
                return Err(MessagingError::authentication(format!(
                    "Access refused for user {}",
                    request.credentials.user
                )));
            }
        }

        if !state.exchanges.contains(&request.exchange) {
            return Err(MessagingError::exchange_not_found(&request.exchange));
        }

        let queue = state
            .queues
            .entry(queue_name.clone())
            .or_insert_with(|| InMemoryQueue::new(&request.exchange, &request.topic));
        queue.exchange = request.exchange.clone();
        queue.binding = request.topic.clone();
        let requeued = queue.requeue_unacked();

        debug!(
            queue = %queue_name,
            durable = request.durable,
            requeued,
            "In-memory subscription opened"
        );

        Ok(Box::new(InMemorySubscription {
            state: Arc::clone(&self.state),
            wakeup: Arc::clone(&self.wakeup),
            queue_name,
        }))
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

struct InMemorySubscription {
    state: Arc<Mutex<BrokerState>>,
    wakeup: Arc<Notify>,
    queue_name: String,
}

impl InMemorySubscription {
    /// Take the next delivery without waiting; `None` when the queue is empty
    fn poll_delivery(&self) -> MessagingResult<Option<Option<Message>>> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next_receive.take() {
            return Err(error);
        }
        let closed = state.closed;

        let queue = state.queues.get_mut(&self.queue_name).ok_or_else(|| {
            MessagingError::connection(format!("Queue {} no longer exists", self.queue_name))
        })?;

        let Some(pending) = queue.pending.pop_front() else {
            return Ok(closed.then_some(None));
        };

        let delivery_tag = queue.next_delivery_tag;
        queue.next_delivery_tag += 1;
        queue.unacked.insert(delivery_tag, pending.clone());

        debug!(
            delivery_tag,
            queued_ms = (Utc::now() - pending.enqueued_at).num_milliseconds(),
            "In-memory delivery"
        );

        let handle = InMemoryMessageHandle {
            state: Arc::clone(&self.state),
            wakeup: Arc::clone(&self.wakeup),
            queue_name: self.queue_name.clone(),
            delivery_tag,
            exchange: pending.exchange,
            routing_key: pending.routing_key,
            redelivered: pending.redelivered,
        };

        Ok(Some(Some(Message::new(pending.payload, Box::new(handle)))))
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next_message(&mut self) -> Result<Option<Message>, MessagingError> {
        loop {
            // Register before checking so a publish in between is not missed
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivery) = self.poll_delivery()? {
                return Ok(delivery);
            }
            notified.await;
        }
    }

    fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

/// Handle over one in-memory delivery
pub struct InMemoryMessageHandle {
    state: Arc<Mutex<BrokerState>>,
    wakeup: Arc<Notify>,
    queue_name: String,
    delivery_tag: u64,
    exchange: String,
    routing_key: String,
    redelivered: bool,
}

impl InMemoryMessageHandle {
    fn settle(&self, outcome: impl FnOnce(&mut InMemoryQueue, PendingMessage)) -> MessagingResult<()> {
        let mut state = self.state.lock();
        let queue = state.queues.get_mut(&self.queue_name).ok_or_else(|| {
            MessagingError::acknowledgement(self.delivery_tag, "queue no longer exists")
        })?;
        let message = queue.unacked.remove(&self.delivery_tag).ok_or_else(|| {
            MessagingError::acknowledgement(self.delivery_tag, "unknown or already settled delivery tag")
        })?;
        outcome(queue, message);
        drop(state);

        self.wakeup.notify_waiters();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryMessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageHandle")
            .field("queue_name", &self.queue_name)
            .field("delivery_tag", &self.delivery_tag)
            .field("routing_key", &self.routing_key)
            .finish()
    }
}

#[async_trait]
impl MessageHandle for InMemoryMessageHandle {
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
        let tag = self.delivery_tag;
        self.settle(|queue, _| queue.acked.push(tag))
    }

    async fn reject(&self, requeue: bool) -> MessagingResult<()> {
        let tag = self.delivery_tag;
        self.settle(|queue, mut message| {
            if requeue {
                message.redelivered = true;
                queue.pending.push_front(message);
            } else {
                queue.rejected.push(tag);
            }
        })
    }
}

/// AMQP topic matching: `*` matches exactly one word, `#` zero or more
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split(TOPIC_DELIMITER).collect();
    let key: Vec<&str> = routing_key.split(TOPIC_DELIMITER).collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match (pattern.first(), key.first()) {
        (None, None) => true,
        (Some(&"#"), _) => {
            match_words(&pattern[1..], key) || (!key.is_empty() && match_words(pattern, &key[1..]))
        }
        (Some(&"*"), Some(_)) => match_words(&pattern[1..], &key[1..]),
        (Some(p), Some(k)) if p == k => match_words(&pattern[1..], &key[1..]),
        _ => false,
    }
}
