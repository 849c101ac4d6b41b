//! End-to-end runs of the worker against the in-memory broker.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

use common::{CapturedLogs, RecordingHandler};
use pulse_actions::handlers::EventHandler;
use pulse_actions::logging;
use pulse_actions::messaging::service::InMemoryBroker;
use pulse_actions::{
    HandlerError, HandlerRegistry, LoopState, MessagingError, PulseCredentials, RoutingError,
    RuntimeConfig, WorkerBootstrap, WorkerError,
};

const EXCHANGE: &str = "exchange/jobs";
const QUEUE: &str = "queue/worker/pulse_actions";

fn bootstrap(broker: &InMemoryBroker, handler: Arc<dyn EventHandler>) -> WorkerBootstrap {
    let registry = HandlerRegistry::builder()
        .register(EXCHANGE, "build", handler)
        .unwrap()
        .build();
    WorkerBootstrap::new(Arc::new(registry), Arc::new(broker.clone()))
        .with_credentials(PulseCredentials::new("worker", "secret"))
}

#[tokio::test]
async fn test_routed_message_reaches_handler_in_dry_run() {
    let captured = CapturedLogs::default();
    let filter = logging::env_filter(Some("info")).unwrap();
    let _guard = tracing::subscriber::set_default(logging::subscriber(filter, captured.clone()));

    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);
    let handler = RecordingHandler::acking();
    let mut consume_loop = assert_ok!(
        bootstrap(&broker, handler.clone())
            .start(&RuntimeConfig::new(EXCHANGE, "build.success"))
            .await
    );

    assert!(captured
        .lines()
        .contains(&"INFO:\t Listening on exchange/jobs, with topic build.success".to_string()));

    broker.publish(EXCHANGE, "build.success", json!({"id": 42}));
    let running = timeout(Duration::from_millis(200), consume_loop.run()).await;

    assert!(running.is_err(), "the loop keeps waiting for the next delivery");
    assert_eq!(consume_loop.state(), LoopState::Connected);
    let calls = handler.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payload, json!({"id": 42}));
    assert!(calls[0].dry_run);
    assert_eq!(consume_loop.processed(), 1);
    assert_eq!(broker.acked(QUEUE), vec![1]);
}

#[tokio::test]
async fn test_unrouted_topic_exits_without_subscribing() {
    let captured = CapturedLogs::default();
    let filter = logging::env_filter(Some("info")).unwrap();
    let _guard = tracing::subscriber::set_default(logging::subscriber(filter, captured.clone()));

    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);
    let handler = RecordingHandler::acking();
    let err = assert_err!(
        bootstrap(&broker, handler.clone())
            .run(&RuntimeConfig::new(EXCHANGE, "unknown.topic"))
            .await
    );

    assert!(matches!(
        err,
        WorkerError::Routing(RoutingError::TopicNotFound { ref topic_prefix, .. })
            if topic_prefix == "unknown"
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(broker.subscribe_count(), 0);
    assert!(handler.calls().is_empty());
    assert_eq!(
        captured.lines(),
        vec!["ERROR:\t We don't have an event handler for exchange/jobs with topic unknown.topic."]
    );
}

#[tokio::test]
async fn test_network_error_during_receive_propagates_unchanged() {
    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);
    let handler = RecordingHandler::acking();
    let mut consume_loop = assert_ok!(
        bootstrap(&broker, handler.clone())
            .start(&RuntimeConfig::new(EXCHANGE, "build.#"))
            .await
    );

    broker.publish(EXCHANGE, "build.linux.success", json!({"id": 1}));
    broker.publish(EXCHANGE, "build.linux.failure", json!({"id": 2}));
    broker.fail_next_receive(MessagingError::connection("connection reset by peer"));

    let err = consume_loop.run().await.unwrap_err();

    assert!(matches!(
        err,
        WorkerError::Messaging(MessagingError::Connection { ref message })
            if message == "connection reset by peer"
    ));
    assert_eq!(err.exit_code(), 69);
    assert_eq!(consume_loop.state(), LoopState::Terminated);
    assert_eq!(broker.subscribe_count(), 1, "no reconnect attempt");
    assert!(handler.calls().is_empty());
    assert_eq!(broker.queue_length(QUEUE), 2);
}

#[tokio::test]
async fn test_messages_are_processed_in_delivery_order() {
    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);
    let handler = RecordingHandler::acking();
    let mut consume_loop = assert_ok!(
        bootstrap(&broker, handler.clone())
            .start(&RuntimeConfig::new(EXCHANGE, "build.*"))
            .await
    );

    broker.publish(EXCHANGE, "build.success", json!({"seq": 1}));
    broker.publish(EXCHANGE, "deploy.success", json!({"seq": 99}));
    broker.publish(EXCHANGE, "build.failure", json!({"seq": 2}));
    broker.publish(EXCHANGE, "build.linux.success", json!({"seq": 98}));
    broker.publish(EXCHANGE, "build.retry", json!({"seq": 3}));
    broker.close();

    assert_err!(consume_loop.run().await);

    let seqs: Vec<_> = handler.calls().iter().map(|c| c.payload["seq"].clone()).collect();
    assert_eq!(seqs, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(broker.acked(QUEUE), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_handler_failure_terminates_loop() {
    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);
    let handler = RecordingHandler::failing("treeherder unavailable");
    let mut consume_loop = assert_ok!(
        bootstrap(&broker, handler.clone())
            .start(&RuntimeConfig::new(EXCHANGE, "build.#"))
            .await
    );

    broker.publish(EXCHANGE, "build.success", json!({"id": 1}));
    broker.publish(EXCHANGE, "build.success", json!({"id": 2}));

    let err = consume_loop.run().await.unwrap_err();
    assert!(matches!(err, WorkerError::Handler(HandlerError::Failed { .. })));
    assert_eq!(err.exit_code(), 70);
    assert_eq!(handler.calls().len(), 1);
    assert_eq!(consume_loop.state(), LoopState::Terminated);
    // The failed delivery stays unacknowledged for redelivery after restart
    assert_eq!(broker.unacked_count(QUEUE), 1);
    assert_eq!(broker.queue_length(QUEUE), 1);
}

#[tokio::test]
async fn test_unacked_messages_are_redelivered_to_next_run() {
    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);

    let first_run = RecordingHandler::silent();
    let mut consume_loop = assert_ok!(
        bootstrap(&broker, first_run.clone())
            .start(&RuntimeConfig::new(EXCHANGE, "build.#"))
            .await
    );
    broker.publish(EXCHANGE, "build.success", json!({"id": 7}));
    broker.close();
    assert_err!(consume_loop.run().await);
    assert_eq!(first_run.calls().len(), 1);
    assert!(broker.acked(QUEUE).is_empty());
    drop(consume_loop);

    // Messages published between runs wait in the durable queue
    broker.publish(EXCHANGE, "build.success", json!({"id": 8}));
    let second_run = RecordingHandler::acking();
    let mut consume_loop = assert_ok!(
        bootstrap(&broker, second_run.clone())
            .start(&RuntimeConfig::new(EXCHANGE, "build.#"))
            .await
    );
    assert_err!(consume_loop.run().await);

    let calls = second_run.calls();
    let ids: Vec<_> = calls.iter().map(|c| c.payload["id"].clone()).collect();
    assert_eq!(ids, vec![json!(7), json!(8)]);
    assert_eq!(broker.acked(QUEUE).len(), 2);
    assert_eq!(broker.unacked_count(QUEUE), 0);
}

#[tokio::test]
async fn test_wrong_credentials_fail_subscription() {
    let broker = InMemoryBroker::with_exchanges(&[EXCHANGE]);
    broker.require_credentials(PulseCredentials::new("worker", "correct"));

    let err = assert_err!(
        bootstrap(&broker, RecordingHandler::acking())
            .start(&RuntimeConfig::new(EXCHANGE, "build.#"))
            .await
    );

    assert!(matches!(
        err,
        WorkerError::Messaging(MessagingError::Authentication { .. })
    ));
    assert_eq!(err.exit_code(), 69);
    assert_eq!(broker.subscribe_count(), 1);
}
