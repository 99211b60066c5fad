//! Error types for the app-events bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
///
/// Errors are `Clone` so a single upstream failure can be fanned out to every
/// listener of a broadcast feed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    /// No native endpoint has been attached to this process yet
    #[error("Native endpoint not attached")]
    NotAttached,

    /// A native endpoint is already attached
    #[error("Native endpoint already attached")]
    AlreadyAttached,

    /// IPC communication error
    #[error("IPC error: {0}")]
    IpcError(String),

    /// The native endpoint recognized the operation but failed it
    #[error("Native error {code}: {message}")]
    Native {
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The native endpoint does not implement the operation
    #[error("Operation not implemented by native endpoint: {0}")]
    NotImplemented(String),

    /// A reply or stream element had an unexpected type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A reply frame from the native endpoint named a request but did not decode
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

impl BridgeError {
    /// Build a native failure from a code/message pair
    pub fn native(code: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Native {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// True if the bridge could not reach the native endpoint at all
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::NotAttached | BridgeError::IpcError(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationError(err.to_string())
    }
}
