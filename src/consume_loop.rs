//! # Consume Loop
//!
//! Drives a [`Consumer`] until something fails. There is no success exit:
//! the loop either runs forever or terminates with the first error, which is
//! handed back unchanged so the process can exit non-zero and be restarted
//! by its supervisor.

use std::fmt;

use tracing::debug;

use crate::consumer::Consumer;
use crate::error::{WorkerError, WorkerResult};
use crate::messaging::MessagingError;

/// Lifecycle of the consume loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Subscribed and processing deliveries
    Connected,
    /// Stopped by an error; terminal
    Terminated,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug)]
pub struct ConsumeLoop {
    consumer: Consumer,
    state: LoopState,
    processed: u64,
}

impl ConsumeLoop {
    pub fn new(consumer: Consumer) -> Self {
        Self {
            consumer,
            state: LoopState::Connected,
            processed: 0,
        }
    }

    /// Process deliveries until the first error, which is returned as-is
    pub async fn run(&mut self) -> WorkerResult<()> {
        if self.state == LoopState::Terminated {
            return Err(MessagingError::subscription_closed(
                self.consumer.exchange(),
                self.consumer.topic(),
            )
            .into());
        }

        loop {
            if let Err(e) = self.consumer.receive_next().await {
                self.terminate(&e);
                return Err(e);
            }
            self.processed += 1;
            debug!(processed = self.processed, "Message processed");
        }
    }

    fn terminate(&mut self, cause: &WorkerError) {
        self.state = LoopState::Terminated;
        debug!(
            exchange = %self.consumer.exchange(),
            topic = %self.consumer.topic(),
            processed = self.processed,
            cause = %cause,
            "Consume loop terminated"
        );
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Messages handled successfully so far
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }
}
