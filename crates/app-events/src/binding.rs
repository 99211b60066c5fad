//! Process-wide binding to the native endpoint
//!
//! The native side attaches its messenger once. The singleton handle resolves
//! the binding on every call, so it can be obtained before attachment; calls
//! made too early fail with `NotAttached`.

use app_events_bridge::{BinaryMessenger, EventStream};
use app_events_core::{BridgeError, MethodCall, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::info;

static BINDING: OnceLock<Arc<dyn BinaryMessenger>> = OnceLock::new();

/// Attach the native endpoint for this process. Only the first attach wins.
pub fn attach(messenger: Arc<dyn BinaryMessenger>) -> Result<()> {
    BINDING
        .set(messenger)
        .map_err(|_| BridgeError::AlreadyAttached)?;
    info!("Native endpoint attached");
    Ok(())
}

/// True once a native endpoint has been attached
pub fn is_attached() -> bool {
    BINDING.get().is_some()
}

fn bound() -> Result<&'static Arc<dyn BinaryMessenger>> {
    BINDING.get().ok_or(BridgeError::NotAttached)
}

/// Messenger forwarding to whatever endpoint is attached at call time
pub(crate) struct AttachedMessenger;

#[async_trait]
impl BinaryMessenger for AttachedMessenger {
    async fn invoke(&self, channel: &str, call: MethodCall) -> Result<Value> {
        bound()?.invoke(channel, call).await
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream> {
        bound()?.subscribe(channel).await
    }
}
