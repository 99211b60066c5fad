//! Channel layer for the app-events bridge
//!
//! This crate provides:
//! - The `BinaryMessenger` abstraction and named method/event channels
//! - Wire protocol for operation and event exchange with the native endpoint
//! - Transport abstractions (AsyncReader/AsyncWriter traits)
//! - TCP and Unix socket transports with background reader and writer tasks
//! - An in-memory messenger standing in for the native endpoint

pub mod channel;
pub mod config;
pub mod memory;
pub mod messenger;
pub mod protocol;
pub mod tcp;
pub mod transport;
#[cfg(unix)]
pub mod unix;

pub use channel::{EventChannel, MethodChannel};
pub use config::{BridgeConfig, Endpoint};
pub use memory::{MemoryMessenger, RecordedCall};
pub use messenger::{BinaryMessenger, EventStream, SocketMessenger};
pub use protocol::{BridgeMessage, deserialize, serialize};
pub use transport::{AsyncReader, AsyncWriter, reader_task, writer_task};
