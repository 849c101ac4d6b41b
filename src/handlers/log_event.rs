//! Built-in handler that records each event and acknowledges it.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{EventHandler, HandlerResult};
use crate::messaging::MessageHandle;

/// Logs the event, then acks it
///
/// Acknowledging is not a business side effect, so it happens in dry-run mode
/// too; otherwise the durable queue would redeliver every event on restart.
#[derive(Debug, Default, Clone)]
pub struct LogEventHandler;

impl LogEventHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for LogEventHandler {
    fn name(&self) -> &str {
        "log_event"
    }

    async fn handle(
        &self,
        payload: Value,
        handle: Box<dyn MessageHandle>,
        dry_run: bool,
    ) -> HandlerResult {
        info!(
            "Event {} on {} (delivery {}{}){}: {}",
            handle.routing_key(),
            handle.exchange(),
            handle.delivery_tag(),
            if handle.redelivered() { ", redelivered" } else { "" },
            if dry_run { " [dry run]" } else { "" },
            payload
        );

        handle.ack().await?;
        Ok(())
    }
}
