//! Messenger abstraction and the socket-backed implementation
//!
//! A messenger carries named operations to the native endpoint and opens
//! event-channel subscriptions. Channels are thin typed wrappers over it.

use crate::config::{BridgeConfig, Endpoint};
use crate::protocol::{BridgeMessage, serialize};
use crate::transport::{
    AsyncReader, AsyncWriter, Router, SharedRouter, reader_task, writer_task,
};
use app_events_core::{BridgeError, MethodCall, Result};
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

/// Raw element stream of one event channel
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// Carrier between the Rust bridge and the native endpoint
#[async_trait]
pub trait BinaryMessenger: Send + Sync {
    /// Invoke a named operation on `channel` and wait for its single reply
    async fn invoke(&self, channel: &str, call: MethodCall) -> Result<Value>;

    /// Open the subscription on an event channel
    async fn subscribe(&self, channel: &str) -> Result<EventStream>;
}

/// Capacity of the queue feeding the writer task
const OUTGOING_CAPACITY: usize = 64;

/// Messenger talking to a native endpoint over a framed socket
pub struct SocketMessenger {
    /// Queue feeding the writer task; `None` once closed
    outgoing: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    /// Routing table shared with the reader and writer tasks
    router: SharedRouter,
    next_id: AtomicU64,
    writer_handle: Mutex<Option<JoinHandle<()>>>,
    /// Background reader task handle
    _reader_handle: JoinHandle<()>,
}

/// Reply slot of one in-flight call, removed from the router when dropped
struct ReplySlot<'a> {
    router: &'a SharedRouter,
    id: u64,
}

impl Drop for ReplySlot<'_> {
    fn drop(&mut self) {
        // Under contention the next registration sweeps the slot instead
        if let Ok(mut router) = self.router.try_lock() {
            router.forget_call(self.id);
        }
    }
}

impl SocketMessenger {
    /// Connect to the native endpoint described by `config`
    pub async fn connect(config: &BridgeConfig) -> Result<Self> {
        info!("Connecting to native endpoint at {}", config.endpoint);

        match &config.endpoint {
            Endpoint::Tcp { host, port } => {
                let addr = format!("{}:{}", host, port);
                let stream =
                    tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
                        .await
                        .map_err(|_| {
                            BridgeError::IpcError(format!("Connection timeout to {}", addr))
                        })?
                        .map_err(|e| {
                            BridgeError::IpcError(format!("Failed to connect to {}: {}", addr, e))
                        })?;

                // Disable Nagle's algorithm for low latency
                stream.set_nodelay(true).map_err(|e| {
                    BridgeError::IpcError(format!("Failed to set TCP_NODELAY: {}", e))
                })?;

                let (read_half, write_half) = stream.into_split();
                Ok(Self::from_parts(
                    crate::tcp::TcpReadWrapper(read_half),
                    crate::tcp::TcpWriteWrapper(write_half),
                ))
            }

            #[cfg(unix)]
            Endpoint::Unix(path) => {
                use tokio::net::UnixStream;
                let stream =
                    tokio::time::timeout(config.connect_timeout, UnixStream::connect(path))
                        .await
                        .map_err(|_| {
                            BridgeError::IpcError(format!(
                                "Connection timeout to {}",
                                path.display()
                            ))
                        })?
                        .map_err(|e| BridgeError::IpcError(format!("Failed to connect: {}", e)))?;

                let (read_half, write_half) = stream.into_split();
                Ok(Self::from_parts(
                    crate::unix::UnixReadWrapper(read_half),
                    crate::unix::UnixWriteWrapper(write_half),
                ))
            }

            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(BridgeError::IpcError(
                "Unix sockets are not available on this platform".into(),
            )),
        }
    }

    /// Build a messenger over an already established transport
    pub fn from_parts<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncReader + 'static,
        W: AsyncWriter + 'static,
    {
        let router = Router::shared();
        let (outgoing, queue) = mpsc::channel(OUTGOING_CAPACITY);
        let reader_handle = tokio::spawn(reader_task(reader, router.clone()));
        let writer_handle = tokio::spawn(writer_task(writer, queue, router.clone()));

        Self {
            outgoing: Mutex::new(Some(outgoing)),
            router,
            next_id: AtomicU64::new(1),
            writer_handle: Mutex::new(Some(writer_handle)),
            _reader_handle: reader_handle,
        }
    }

    /// Queue one message for the writer task
    async fn send(&self, msg: &BridgeMessage) -> Result<()> {
        let data = serialize(msg)?;

        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[Rust→Native] len={} json={}", data.len(), json_preview);

        let outgoing = self
            .outgoing
            .lock()
            .await
            .clone()
            .ok_or_else(|| BridgeError::IpcError("Not connected".into()))?;
        outgoing
            .send(data)
            .await
            .map_err(|_| BridgeError::IpcError("Connection lost".into()))
    }

    /// Close an event channel subscription on the native side
    pub async fn cancel(&self, channel: &str) -> Result<()> {
        self.send(&BridgeMessage::Cancel {
            channel: channel.to_string(),
        })
        .await
    }

    /// Close the connection; pending and later calls fail with an IPC error.
    ///
    /// Messages queued before the close, such as a `Cancel`, are still written.
    pub async fn close(&self) {
        self.router.lock().await.close("Connection closed");
        self.outgoing.lock().await.take();
        if let Some(handle) = self.writer_handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl BinaryMessenger for SocketMessenger {
    async fn invoke(&self, channel: &str, call: MethodCall) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Register before writing so a fast reply cannot overtake the slot
        let (reply_tx, reply_rx) = oneshot::channel();
        self.router
            .lock()
            .await
            .register_call(id, &call.method, reply_tx)?;
        let _slot = ReplySlot {
            router: &self.router,
            id,
        };

        let msg = BridgeMessage::Invoke {
            id,
            channel: channel.to_string(),
            method: call.method,
            arguments: call.arguments,
        };
        self.send(&msg).await?;

        reply_rx
            .await
            .map_err(|_| BridgeError::IpcError("Reader task died waiting for response".into()))?
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream> {
        let (sink, events) = mpsc::unbounded_channel();
        self.router.lock().await.register_stream(channel, sink)?;

        self.send(&BridgeMessage::Listen {
            channel: channel.to_string(),
        })
        .await?;

        Ok(Box::pin(UnboundedReceiverStream::new(events)))
    }
}
