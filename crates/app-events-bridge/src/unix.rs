//! Unix socket transport implementation
//!
//! Used when the native endpoint hosts a Unix domain socket (desktop hosts,
//! iOS simulators).

use crate::transport::{AsyncReader, AsyncWriter, read_frame, write_frame};
use app_events_core::Result;
use async_trait::async_trait;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Unix socket read wrapper
pub struct UnixReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl AsyncReader for UnixReadWrapper {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.0, "Unix").await
    }
}

/// Unix socket write wrapper
pub struct UnixWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl AsyncWriter for UnixWriteWrapper {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.0, data, "Unix").await
    }
}
