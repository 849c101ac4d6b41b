//! Shared fixtures for the worker integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use pulse_actions::handlers::{EventHandler, HandlerError, HandlerResult};
use pulse_actions::messaging::MessageHandle;

/// One observed handler invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub payload: Value,
    pub routing_key: String,
    pub delivery_tag: u64,
    pub dry_run: bool,
}

/// Handler that records every call, optionally acks, optionally fails
#[derive(Debug, Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<RecordedCall>>,
    ack: bool,
    fail_with: Option<String>,
}

impl RecordingHandler {
    pub fn acking() -> Arc<Self> {
        Arc::new(Self {
            ack: true,
            ..Default::default()
        })
    }

    pub fn silent() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    async fn handle(
        &self,
        payload: Value,
        handle: Box<dyn MessageHandle>,
        dry_run: bool,
    ) -> HandlerResult {
        self.calls.lock().push(RecordedCall {
            payload,
            routing_key: handle.routing_key().to_string(),
            delivery_tag: handle.delivery_tag(),
            dry_run,
        });

        if let Some(message) = &self.fail_with {
            return Err(HandlerError::failed("recording", message.clone()));
        }
        if self.ack {
            handle.ack().await?;
        }
        Ok(())
    }
}

/// In-memory log sink for `pulse_actions::logging::subscriber`
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
