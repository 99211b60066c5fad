//! Argument bags and reply coercion

use crate::error::{BridgeError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Key/value argument bag sent with an operation
pub type Arguments = Map<String, Value>;

/// Open-ended event parameters forwarded to the native SDK untouched
pub type Parameters = Map<String, Value>;

/// A named operation plus its argument bag
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    /// `Value::Null` for operations without a payload, otherwise an object
    pub arguments: Value,
}

impl MethodCall {
    /// Operation without any payload
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }

    /// Operation with an explicit argument bag
    pub fn with_arguments(method: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Object(arguments),
        }
    }

    /// Operation whose argument bag is the serialized form of `params`.
    ///
    /// `None` fields serialize as `null`, so every declared key is present.
    pub fn from_params<P: Serialize>(method: impl Into<String>, params: &P) -> Result<Self> {
        match serde_json::to_value(params)? {
            Value::Object(arguments) => Ok(Self::with_arguments(method, arguments)),
            other => Err(BridgeError::SerializationError(format!(
                "argument bag must be an object, got {}",
                kind(&other)
            ))),
        }
    }

    /// Look up a single argument
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.as_object().and_then(|args| args.get(key))
    }
}

/// Coerce a reply to `bool`.
///
/// A `null` reply is the no-op answer of platforms where an operation does
/// not apply, and reads as `false`.
pub fn expect_bool(method: &str, reply: Value) -> Result<bool> {
    match reply {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(BridgeError::TypeMismatch(format!(
            "{} expected bool reply, got {}",
            method,
            kind(&other)
        ))),
    }
}

/// Coerce a reply to an optional string
pub fn expect_optional_string(method: &str, reply: Value) -> Result<Option<String>> {
    match reply {
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => Err(BridgeError::TypeMismatch(format!(
            "{} expected string reply, got {}",
            method,
            kind(&other)
        ))),
    }
}

/// Short JSON type name used in mismatch messages
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_params_keeps_nulls() {
        #[derive(Serialize)]
        struct P {
            a: Option<u32>,
            b: &'static str,
        }
        let call = MethodCall::from_params("op", &P { a: None, b: "x" }).unwrap();
        assert_eq!(call.arguments, json!({"a": null, "b": "x"}));
        assert_eq!(call.argument("a"), Some(&Value::Null));
        assert_eq!(call.argument("missing"), None);
    }

    #[test]
    fn test_from_params_rejects_scalars() {
        let err = MethodCall::from_params("op", &5).unwrap_err();
        assert!(matches!(err, BridgeError::SerializationError(_)));
    }

    #[test]
    fn test_expect_bool() {
        assert!(expect_bool("op", json!(true)).unwrap());
        assert!(!expect_bool("op", Value::Null).unwrap());
        let err = expect_bool("op", json!("yes")).unwrap_err();
        assert_eq!(
            err,
            BridgeError::TypeMismatch("op expected bool reply, got string".into())
        );
    }

    #[test]
    fn test_expect_optional_string() {
        assert_eq!(
            expect_optional_string("op", json!("14.2")).unwrap(),
            Some("14.2".to_string())
        );
        assert_eq!(expect_optional_string("op", Value::Null).unwrap(), None);
        assert!(expect_optional_string("op", json!(1)).is_err());
    }
}
