//! Deep-link feed
//!
//! One native subscription fanned out to any number of listeners through a
//! broadcast channel. Listeners only see links that arrive after they started
//! listening; nothing is replayed.

use app_events_bridge::EventStream;
use app_events_core::args::kind;
use app_events_core::{BridgeError, Result};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, info, warn};

/// Links buffered per listener before a slow listener starts skipping
pub const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum Signal {
    Link(Result<String>),
    Closed,
}

/// Shared feed of incoming deep-link URLs
pub struct DeepLinkFeed {
    sender: broadcast::Sender<Signal>,
    closed: Arc<AtomicBool>,
    _pump: tokio::task::JoinHandle<()>,
}

impl DeepLinkFeed {
    /// Wrap an upstream subscription. Must be called inside a Tokio runtime.
    pub(crate) fn spawn(upstream: EventStream, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let closed = Arc::new(AtomicBool::new(false));
        let closer = Closer {
            sender: sender.clone(),
            closed: closed.clone(),
        };
        let pump = tokio::spawn(pump(upstream, closer));

        Self {
            sender,
            closed,
            _pump: pump,
        }
    }

    /// Start listening. The listener sees every link that arrives from now on.
    pub fn listen(&self) -> DeepLinkListener {
        let receiver = self.sender.subscribe();
        DeepLinkListener {
            inner: BroadcastStream::new(receiver),
            done: self.closed.load(Ordering::Acquire),
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// True once the subscription ended, either from the native side or
    /// because the runtime driving the feed shut down
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Ends the feed for every listener when the pump stops, however it stops
struct Closer {
    sender: broadcast::Sender<Signal>,
    closed: Arc<AtomicBool>,
}

impl Drop for Closer {
    fn drop(&mut self) {
        // Store before sending; `listen` subscribes before loading
        self.closed.store(true, Ordering::Release);
        let _ = self.sender.send(Signal::Closed);
    }
}

/// Forward upstream elements to every listener, checking their type
async fn pump(mut upstream: EventStream, closer: Closer) {
    while let Some(item) = upstream.next().await {
        let link = item.and_then(|value| match value {
            Value::String(url) => Ok(url),
            other => Err(BridgeError::TypeMismatch(format!(
                "deep link must be a string, got {}",
                kind(&other)
            ))),
        });

        match &link {
            Ok(url) => debug!("Deep link received: {}", url),
            Err(e) => warn!("Deep-link feed error: {}", e),
        }

        // Ignore send errors (no listeners)
        let _ = closer.sender.send(Signal::Link(link));
    }

    info!("Deep-link subscription ended by native endpoint");
}

/// One listener on the deep-link feed
///
/// Yields `Ok(url)` per link, `Err` for upstream failures or non-string
/// elements, and `None` once the native side ends the subscription.
pub struct DeepLinkListener {
    inner: BroadcastStream<Signal>,
    done: bool,
}

impl DeepLinkListener {
    /// Wait for the next link
    pub async fn recv(&mut self) -> Option<Result<String>> {
        self.next().await
    }
}

impl Stream for DeepLinkListener {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(Signal::Link(link)))) => return Poll::Ready(Some(link)),
                Poll::Ready(Some(Ok(Signal::Closed))) | Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!("Deep-link listener lagged, skipped {} links", skipped);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
