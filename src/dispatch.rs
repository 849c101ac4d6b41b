//! # Dispatch
//!
//! Binds a resolved handler to the run's dry-run flag. The bound context is
//! a plain struct so the flag is visible to anything inspecting it.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::handlers::{EventHandler, HandlerResult};
use crate::messaging::MessageHandle;

/// A handler paired with the dry-run flag it will always be called with
#[derive(Debug, Clone)]
pub struct BoundHandler {
    handler: Arc<dyn EventHandler>,
    dry_run: bool,
}

impl BoundHandler {
    pub fn bind(handler: Arc<dyn EventHandler>, dry_run: bool) -> Self {
        Self { handler, dry_run }
    }

    /// Invoke the handler exactly once; its error is returned unchanged
    pub async fn dispatch(&self, payload: Value, handle: Box<dyn MessageHandle>) -> HandlerResult {
        debug!(
            handler = self.handler.name(),
            delivery_tag = handle.delivery_tag(),
            dry_run = self.dry_run,
            "Dispatching message"
        );
        self.handler.handle(payload, handle, self.dry_run).await
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }
}
