//! Transport abstractions for the socket messenger
//!
//! Provides AsyncReader/AsyncWriter traits that can be implemented
//! for different transport mechanisms (Unix sockets, TCP), the shared
//! length-prefixed framing, the background writer task that owns the write
//! half, and the background reader task that routes replies and pushed events.

use crate::protocol::{BridgeMessage, deserialize};
use app_events_core::{BridgeError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, warn};

/// Largest frame accepted from the native endpoint (64MB)
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read a complete message from the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn read_message(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send + Sync {
    /// Write a complete message to the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// Read one length-prefixed frame
pub async fn read_frame<R>(reader: &mut R, label: &str) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + Send,
{
    // Read 4-byte length prefix (little-endian)
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} read length failed: {}", label, e)))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_FRAME_LEN {
        return Err(BridgeError::IpcError(format!(
            "Message too large: {} bytes",
            len
        )));
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} read data failed: {}", label, e)))?;

    Ok(data)
}

/// Write one length-prefixed frame and flush
pub async fn write_frame<W>(writer: &mut W, data: &[u8], label: &str) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let len = u32::try_from(data.len())
        .map_err(|_| BridgeError::IpcError(format!("Message too large: {} bytes", data.len())))?;
    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} write length failed: {}", label, e)))?;
    writer
        .write_all(data)
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} write data failed: {}", label, e)))?;
    writer
        .flush()
        .await
        .map_err(|e| BridgeError::IpcError(format!("{} flush failed: {}", label, e)))?;
    Ok(())
}

/// Sink receiving the elements of one event channel
pub type EventSink = mpsc::UnboundedSender<Result<Value>>;

struct PendingCall {
    method: String,
    reply: oneshot::Sender<Result<Value>>,
}

/// Routing table shared by the messenger and its reader task
///
/// Replies are matched to calls by request id, so any number of calls can be
/// in flight at once and the native side may answer them in any order.
#[derive(Default)]
pub struct Router {
    pending: HashMap<u64, PendingCall>,
    streams: HashMap<String, EventSink>,
    closed: Option<String>,
}

pub type SharedRouter = Arc<Mutex<Router>>;

impl Router {
    pub fn shared() -> SharedRouter {
        Arc::new(Mutex::new(Router::default()))
    }

    /// Register a reply slot for an outgoing call
    pub fn register_call(
        &mut self,
        id: u64,
        method: &str,
        reply: oneshot::Sender<Result<Value>>,
    ) -> Result<()> {
        if let Some(reason) = &self.closed {
            return Err(BridgeError::IpcError(reason.clone()));
        }
        // Sweep slots whose callers stopped waiting
        self.pending.retain(|_, call| !call.reply.is_closed());
        self.pending.insert(
            id,
            PendingCall {
                method: method.to_string(),
                reply,
            },
        );
        Ok(())
    }

    /// Drop the reply slot of a call nobody waits for anymore
    pub fn forget_call(&mut self, id: u64) {
        self.pending.remove(&id);
    }

    /// Register the sink for an event channel
    pub fn register_stream(&mut self, channel: &str, sink: EventSink) -> Result<()> {
        if let Some(reason) = &self.closed {
            return Err(BridgeError::IpcError(reason.clone()));
        }
        if self.streams.insert(channel.to_string(), sink).is_some() {
            warn!("Replacing existing subscription on {}", channel);
        }
        Ok(())
    }

    /// Number of calls still waiting for a reply
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    fn reply(&mut self, id: u64, result: Result<Value>) {
        match self.pending.remove(&id) {
            Some(call) => {
                if call.reply.send(result).is_err() {
                    debug!("Caller of {} (id={}) stopped waiting", call.method, id);
                }
            }
            None => warn!("Received reply for unknown request id={}", id),
        }
    }

    fn not_implemented(&mut self, id: u64) {
        match self.pending.remove(&id) {
            Some(call) => {
                let _ = call
                    .reply
                    .send(Err(BridgeError::NotImplemented(call.method)));
            }
            None => warn!("Received NotImplemented for unknown request id={}", id),
        }
    }

    fn push(&mut self, channel: &str, item: Result<Value>) {
        match self.streams.get(channel) {
            Some(sink) => {
                if sink.send(item).is_err() {
                    debug!("Subscriber of {} went away, dropping stream", channel);
                    self.streams.remove(channel);
                }
            }
            None => warn!("Event on {} with no subscription", channel),
        }
    }

    /// Route one decoded message from the native endpoint
    pub fn route(&mut self, msg: BridgeMessage) {
        match msg {
            BridgeMessage::Success { id, result } => self.reply(id, Ok(result)),
            BridgeMessage::Error {
                id,
                code,
                message,
                details,
            } => self.reply(
                id,
                Err(BridgeError::Native {
                    code,
                    message,
                    details,
                }),
            ),
            BridgeMessage::NotImplemented { id } => self.not_implemented(id),
            BridgeMessage::Event { channel, payload } => self.push(&channel, Ok(payload)),
            BridgeMessage::StreamError {
                channel,
                code,
                message,
            } => self.push(&channel, Err(BridgeError::native(code, message))),
            BridgeMessage::EndOfStream { channel } => {
                // Dropping the sink ends the subscriber's stream
                if self.streams.remove(&channel).is_none() {
                    warn!("EndOfStream on {} with no subscription", channel);
                }
            }
            other => warn!("Unexpected message from native endpoint: {:?}", other),
        }
    }

    /// Fail every pending call and end every stream
    pub fn close(&mut self, reason: &str) {
        self.closed = Some(reason.to_string());
        for (_, call) in self.pending.drain() {
            let _ = call
                .reply
                .send(Err(BridgeError::IpcError(reason.to_string())));
        }
        for (_, sink) in self.streams.drain() {
            let _ = sink.send(Err(BridgeError::IpcError(reason.to_string())));
        }
    }
}

/// Background reader task that handles incoming messages
///
/// This task:
/// - Receives messages from the native endpoint via the transport
/// - Routes replies to the pending call with the matching id
/// - Routes pushed events to the subscribed event channel
///
/// When the transport fails every pending call is failed with
/// `IpcError("Connection lost")` and every stream is ended.
pub async fn reader_task<R: AsyncReader>(mut reader: R, router: SharedRouter) {
    loop {
        match reader.read_message().await {
            Ok(data) => {
                let json_preview: String =
                    String::from_utf8_lossy(&data).chars().take(200).collect();
                debug!("[Native→Rust] len={} json={}", data.len(), json_preview);

                match deserialize(&data) {
                    Ok(msg) => router.lock().await.route(msg),
                    Err(e) => {
                        error!("Failed to deserialize message: {}", e);
                        // Fail the call the frame was meant for, if it names one
                        let id = serde_json::from_slice::<Value>(&data)
                            .ok()
                            .and_then(|v| v.get("Id").and_then(Value::as_u64));
                        if let Some(id) = id {
                            router.lock().await.reply(
                                id,
                                Err(BridgeError::ProtocolError(format!(
                                    "Undecodable reply: {}",
                                    e
                                ))),
                            );
                        }
                    }
                }
            }
            Err(e) => {
                error!("Reader task failed: {}", e);
                router.lock().await.close("Connection lost");
                break;
            }
        }
    }
}

/// Background writer task that owns the write half of the transport
///
/// Frames are written whole and in queue order, independently of the callers
/// that queued them. A write failure fails every pending call and ends every
/// stream.
pub async fn writer_task<W: AsyncWriter>(
    mut writer: W,
    mut outgoing: mpsc::Receiver<Vec<u8>>,
    router: SharedRouter,
) {
    while let Some(data) = outgoing.recv().await {
        if let Err(e) = writer.write_message(&data).await {
            error!("Writer task failed: {}", e);
            router.lock().await.close("Connection lost");
            return;
        }
    }
    debug!("Outgoing queue closed, writer task exiting");
}
