//! Named channels over a messenger

use crate::messenger::{BinaryMessenger, EventStream};
use app_events_core::{MethodCall, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Request/response channel identified by a fixed name
#[derive(Clone)]
pub struct MethodChannel {
    name: &'static str,
    messenger: Arc<dyn BinaryMessenger>,
}

impl MethodChannel {
    pub fn new(name: &'static str, messenger: Arc<dyn BinaryMessenger>) -> Self {
        Self { name, messenger }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke `call` and wait for its reply.
    ///
    /// Failures are returned exactly as the messenger reported them.
    pub async fn invoke_method(&self, call: MethodCall) -> Result<Value> {
        debug!("{} <- {}", self.name, call.method);
        self.messenger.invoke(self.name, call).await
    }
}

/// Subscription channel identified by a fixed name
#[derive(Clone)]
pub struct EventChannel {
    name: &'static str,
    messenger: Arc<dyn BinaryMessenger>,
}

impl EventChannel {
    pub fn new(name: &'static str, messenger: Arc<dyn BinaryMessenger>) -> Self {
        Self { name, messenger }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Open one native subscription. Every call opens a new one.
    pub async fn receive_stream(&self) -> Result<EventStream> {
        debug!("{} listen", self.name);
        self.messenger.subscribe(self.name).await
    }
}
