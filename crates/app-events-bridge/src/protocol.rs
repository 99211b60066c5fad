//! Wire protocol for Rust <-> native endpoint communication
//!
//! Messages are serialized as JSON with internally-tagged enums.
//! Format: {"Type": "MessageType", ...fields}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages exchanged between the Rust bridge and the native endpoint
///
/// Note: `rename_all` on enums only affects variant names, not field names inside variants.
/// Each field must be explicitly renamed using `#[serde(rename = "...")]` for PascalCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum BridgeMessage {
    // === Rust -> Native ===
    /// Invoke a named operation on a method channel
    Invoke {
        #[serde(rename = "Id")]
        id: u64,
        #[serde(rename = "Channel")]
        channel: String,
        #[serde(rename = "Method")]
        method: String,
        #[serde(rename = "Arguments", default)]
        arguments: Value,
    },

    /// Open the subscription on an event channel
    Listen {
        #[serde(rename = "Channel")]
        channel: String,
    },

    /// Close the subscription on an event channel
    Cancel {
        #[serde(rename = "Channel")]
        channel: String,
    },

    // === Native -> Rust ===
    /// Successful reply to an Invoke
    Success {
        #[serde(rename = "Id")]
        id: u64,
        #[serde(rename = "Result", default)]
        result: Value,
    },

    /// Failed reply to an Invoke
    Error {
        #[serde(rename = "Id")]
        id: u64,
        #[serde(rename = "Code")]
        code: String,
        #[serde(rename = "Message")]
        message: String,
        #[serde(rename = "Details", default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    /// The native endpoint has no handler for the invoked method
    NotImplemented {
        #[serde(rename = "Id")]
        id: u64,
    },

    /// Element pushed on an event channel
    Event {
        #[serde(rename = "Channel")]
        channel: String,
        #[serde(rename = "Payload")]
        payload: Value,
    },

    /// Error pushed on an event channel
    StreamError {
        #[serde(rename = "Channel")]
        channel: String,
        #[serde(rename = "Code")]
        code: String,
        #[serde(rename = "Message")]
        message: String,
    },

    /// The native side closed an event channel
    EndOfStream {
        #[serde(rename = "Channel")]
        channel: String,
    },
}

/// Serialize a message to JSON bytes
pub fn serialize(msg: &BridgeMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(msg)
}

/// Deserialize a message from JSON bytes
pub fn deserialize(bytes: &[u8]) -> Result<BridgeMessage, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invoke_format() {
        let msg = BridgeMessage::Invoke {
            id: 7,
            channel: "app_events_bridge/methodChannel".into(),
            method: "setUserID".into(),
            arguments: json!({"id": "user-42"}),
        };
        let bytes = serialize(&msg).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["Type"], "Invoke");
        assert_eq!(json["Id"], 7);
        assert_eq!(json["Method"], "setUserID");
        assert_eq!(json["Arguments"]["id"], "user-42");
    }

    #[test]
    fn test_replies_from_native() {
        // Exact JSON format expected from native endpoints
        let ok = r#"{"Type":"Success","Id":3,"Result":true}"#;
        assert_eq!(
            deserialize(ok.as_bytes()).unwrap(),
            BridgeMessage::Success {
                id: 3,
                result: json!(true)
            }
        );

        // Void operations may omit the result entirely
        let void = r#"{"Type":"Success","Id":4}"#;
        assert_eq!(
            deserialize(void.as_bytes()).unwrap(),
            BridgeMessage::Success {
                id: 4,
                result: Value::Null
            }
        );

        let err = r#"{"Type":"Error","Id":5,"Code":"SDK_NOT_READY","Message":"call initializeSDK first"}"#;
        match deserialize(err.as_bytes()).unwrap() {
            BridgeMessage::Error {
                id,
                code,
                message,
                details,
            } => {
                assert_eq!(id, 5);
                assert_eq!(code, "SDK_NOT_READY");
                assert_eq!(message, "call initializeSDK first");
                assert!(details.is_none());
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_event_format() {
        let json = r#"{"Type":"Event","Channel":"links","Payload":"myapp://promo/1"}"#;
        match deserialize(json.as_bytes()).unwrap() {
            BridgeMessage::Event { channel, payload } => {
                assert_eq!(channel, "links");
                assert_eq!(payload, json!("myapp://promo/1"));
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(deserialize(br#"{"Type":"Shutdown"}"#).is_err());
    }
}
