//! Credentials are read from `PULSE_USER` / `PULSE_PW` when the consumer
//! subscribes. Kept in its own test binary because it mutates the process
//! environment.

use std::env;
use std::sync::Arc;

use pulse_actions::constants::{PULSE_PASSWORD_ENV, PULSE_USER_ENV};
use pulse_actions::handlers::LogEventHandler;
use pulse_actions::messaging::service::InMemoryBroker;
use pulse_actions::{
    BoundHandler, Consumer, HandlerRegistry, MessagingError, PulseCredentials, RuntimeConfig,
    WorkerBootstrap, WorkerError,
};

#[tokio::test]
async fn test_subscribe_reads_credentials_from_environment() {
    let broker = InMemoryBroker::with_exchanges(&["exchange/jobs"]);
    broker.require_credentials(PulseCredentials::new("ci-bot", "hunter2"));
    let bound = || BoundHandler::bind(Arc::new(LogEventHandler::new()), true);

    env::remove_var(PULSE_USER_ENV);
    env::remove_var(PULSE_PASSWORD_ENV);
    let err = Consumer::subscribe(&broker, "exchange/jobs", "build.#", bound())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkerError::Messaging(MessagingError::Authentication { ref message })
            if message.contains(PULSE_USER_ENV)
    ));
    assert_eq!(broker.subscribe_count(), 0, "missing credentials fail before subscribing");

    env::set_var(PULSE_USER_ENV, "ci-bot");
    let err = Consumer::subscribe(&broker, "exchange/jobs", "build.#", bound())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkerError::Messaging(MessagingError::Authentication { ref message })
            if message.contains(PULSE_PASSWORD_ENV)
    ));

    env::set_var(PULSE_PASSWORD_ENV, "hunter2");
    let consumer = Consumer::subscribe(&broker, "exchange/jobs", "build.#", bound())
        .await
        .unwrap();
    assert_eq!(consumer.queue_name(), "queue/ci-bot/pulse_actions");

    // Bootstrap without explicit credentials takes the same path
    let registry = HandlerRegistry::builder()
        .register("exchange/jobs", "build", Arc::new(LogEventHandler::new()))
        .unwrap()
        .build();
    let bootstrap = WorkerBootstrap::new(Arc::new(registry), Arc::new(broker.clone()));
    let consume_loop = bootstrap
        .start(&RuntimeConfig::new("exchange/jobs", "build.success"))
        .await
        .unwrap();
    assert_eq!(consume_loop.consumer().queue_name(), "queue/ci-bot/pulse_actions");
    assert_eq!(broker.subscribe_count(), 2);
}
