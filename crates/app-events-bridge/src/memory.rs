//! In-memory messenger
//!
//! Plays the native endpoint inside the process: every call is recorded and
//! answered by a handler closure, and events can be pushed to subscribers.
//! Used for tests and for hosts that implement the native side in Rust.

use crate::messenger::{BinaryMessenger, EventStream};
use crate::transport::EventSink;
use app_events_core::{BridgeError, MethodCall, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

type Handler = Box<dyn Fn(&str, &MethodCall) -> Result<Value> + Send + Sync>;

/// A call as it reached the endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub channel: String,
    pub call: MethodCall,
}

/// In-process native endpoint
pub struct MemoryMessenger {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
    sinks: Mutex<HashMap<String, Vec<EventSink>>>,
    subscriptions: Mutex<HashMap<String, usize>>,
}

impl MemoryMessenger {
    /// Endpoint answering every call with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &MethodCall) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            sinks: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Endpoint answering every call with the same value
    pub fn replying(value: Value) -> Self {
        Self::new(move |_, _| Ok(value.clone()))
    }

    /// Endpoint failing every call with a native error
    pub fn failing(code: &str, message: &str) -> Self {
        let err = BridgeError::native(code, message);
        Self::new(move |_, _| Err(err.clone()))
    }

    /// Every call received so far, in arrival order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Most recent call
    pub async fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().await.last().cloned()
    }

    /// How many subscriptions were ever opened on `channel`
    pub async fn subscription_count(&self, channel: &str) -> usize {
        self.subscriptions
            .lock()
            .await
            .get(channel)
            .copied()
            .unwrap_or(0)
    }

    /// Push an element to every live subscriber of `channel`.
    /// Returns the number of subscribers reached.
    pub async fn emit(&self, channel: &str, payload: Value) -> usize {
        self.push(channel, Ok(payload)).await
    }

    /// Push a native error to every live subscriber of `channel`
    pub async fn emit_error(&self, channel: &str, code: &str, message: &str) -> usize {
        self.push(channel, Err(BridgeError::native(code, message)))
            .await
    }

    /// End every subscription on `channel`
    pub async fn end_stream(&self, channel: &str) {
        self.sinks.lock().await.remove(channel);
    }

    async fn push(&self, channel: &str, item: Result<Value>) -> usize {
        let mut sinks = self.sinks.lock().await;
        let Some(subscribers) = sinks.get_mut(channel) else {
            return 0;
        };
        subscribers.retain(|sink| sink.send(item.clone()).is_ok());
        subscribers.len()
    }
}

#[async_trait]
impl BinaryMessenger for MemoryMessenger {
    async fn invoke(&self, channel: &str, call: MethodCall) -> Result<Value> {
        self.calls.lock().await.push(RecordedCall {
            channel: channel.to_string(),
            call: call.clone(),
        });
        (self.handler)(channel, &call)
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream> {
        let (sink, events) = mpsc::unbounded_channel();
        self.sinks
            .lock()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(sink);
        *self
            .subscriptions
            .lock()
            .await
            .entry(channel.to_string())
            .or_insert(0) += 1;

        Ok(Box::pin(UnboundedReceiverStream::new(events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{EventChannel, MethodChannel};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_records_calls() {
        let messenger = Arc::new(MemoryMessenger::replying(json!(true)));
        let channel = MethodChannel::new("methods", messenger.clone());

        let reply = channel
            .invoke_method(MethodCall::new("logActivateApp"))
            .await
            .unwrap();

        assert_eq!(reply, json!(true));
        assert_eq!(
            messenger.last_call().await,
            Some(RecordedCall {
                channel: "methods".into(),
                call: MethodCall::new("logActivateApp"),
            })
        );
    }

    #[tokio::test]
    async fn test_failing_endpoint() {
        let messenger = Arc::new(MemoryMessenger::failing("E", "nope"));
        let channel = MethodChannel::new("methods", messenger);
        let err = channel
            .invoke_method(MethodCall::new("flush"))
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::native("E", "nope"));
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let messenger = Arc::new(MemoryMessenger::replying(Value::Null));
        let channel = EventChannel::new("links", messenger.clone());

        let mut stream = channel.receive_stream().await.unwrap();
        assert_eq!(messenger.subscription_count("links").await, 1);
        assert_eq!(messenger.emit("other", json!("x")).await, 0);
        assert_eq!(messenger.emit("links", json!("myapp://1")).await, 1);
        messenger.end_stream("links").await;

        assert_eq!(stream.next().await.unwrap().unwrap(), json!("myapp://1"));
        assert!(stream.next().await.is_none());
    }
}
