//! TCP transport implementation
//!
//! Used when the native endpoint listens on a loopback TCP port (e.g. Android
//! emulators forwarding a port to the host).

use crate::transport::{AsyncReader, AsyncWriter, read_frame, write_frame};
use app_events_core::Result;
use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// TCP read wrapper
pub struct TcpReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl AsyncReader for TcpReadWrapper {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.0, "TCP").await
    }
}

/// TCP write wrapper
pub struct TcpWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl AsyncWriter for TcpWriteWrapper {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.0, data, "TCP").await
    }
}
