//! Method channel between the host application and a plugin
//!
//! A call names a method and carries loosely typed arguments; the attached
//! handler answers with a value, a coded error, or "not implemented".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Required arguments missing or of the wrong type
pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";

/// The platform refused to start playback
pub const PLAYBACK_FAILED: &str = "PLAYBACK_FAILED";

/// The transport could not decode a request
pub const PARSE_ERROR: &str = "PARSE_ERROR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error {
        code: String,
        message: String,
        details: Option<Value>,
    },
    NotImplemented,
}

impl MethodResponse {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Wire form used by the line transport, tagged with the request id.
    pub fn to_reply(&self, id: &Value) -> Value {
        match self {
            MethodResponse::Success(result) => json!({ "id": id, "result": result }),
            MethodResponse::Error { code, message, details } => json!({
                "id": id,
                "error": { "code": code, "message": message, "details": details },
            }),
            MethodResponse::NotImplemented => json!({ "id": id, "notImplemented": true }),
        }
    }
}

/// A request as it arrives on the line transport
#[derive(Debug, Clone, Deserialize)]
pub struct MethodRequest {
    #[serde(default)]
    pub id: Value,
    #[serde(flatten)]
    pub call: MethodCall,
}

#[async_trait]
pub trait MethodCallHandler: Send + Sync {
    async fn on_method_call(&self, call: MethodCall) -> MethodResponse;
}

/// Named channel with at most one attached handler
pub struct MethodChannel {
    name: String,
    handler: RwLock<Option<Arc<dyn MethodCallHandler>>>,
}

impl MethodChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a handler, or detach with `None`.
    pub async fn set_method_call_handler(&self, handler: Option<Arc<dyn MethodCallHandler>>) {
        debug!(
            "{} handler on channel {}",
            if handler.is_some() { "Attaching" } else { "Detaching" },
            self.name
        );
        *self.handler.write().await = handler;
    }

    pub async fn invoke(&self, call: MethodCall) -> MethodResponse {
        let handler = self.handler.read().await.clone();
        match handler {
            Some(handler) => handler.on_method_call(call).await,
            None => {
                warn!("No handler attached to channel {} for {}", self.name, call.method);
                MethodResponse::NotImplemented
            }
        }
    }

    /// Decode one transport line, dispatch it and encode the reply.
    pub async fn handle_line(&self, line: &str) -> Value {
        match decode(line) {
            Ok(request) => self.invoke(request.call).await.to_reply(&request.id),
            Err(e) => {
                warn!("Unparseable request on channel {}: {}", self.name, e);
                MethodResponse::error(PARSE_ERROR, e.to_string()).to_reply(&Value::Null)
            }
        }
    }
}

fn decode(line: &str) -> crate::Result<MethodRequest> {
    let request = serde_json::from_str(line)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl MethodCallHandler for EchoHandler {
        async fn on_method_call(&self, call: MethodCall) -> MethodResponse {
            match call.method.as_str() {
                "echo" => MethodResponse::Success(call.arguments),
                _ => MethodResponse::NotImplemented,
            }
        }
    }

    #[tokio::test]
    async fn test_detached_channel_is_not_implemented() {
        let channel = MethodChannel::new("dtmf");
        let response = channel.invoke(MethodCall::new("echo", json!(1))).await;
        assert_eq!(response, MethodResponse::NotImplemented);
    }

    #[tokio::test]
    async fn test_attach_and_detach() {
        let channel = MethodChannel::new("dtmf");
        channel.set_method_call_handler(Some(Arc::new(EchoHandler))).await;

        let response = channel.invoke(MethodCall::new("echo", json!({"a": 1}))).await;
        assert_eq!(response, MethodResponse::Success(json!({"a": 1})));

        channel.set_method_call_handler(None).await;
        let response = channel.invoke(MethodCall::new("echo", json!(null))).await;
        assert_eq!(response, MethodResponse::NotImplemented);
    }

    #[tokio::test]
    async fn test_handle_line_replies() {
        let channel = MethodChannel::new("dtmf");
        channel.set_method_call_handler(Some(Arc::new(EchoHandler))).await;

        let reply = channel.handle_line(r#"{"id": 4, "method": "echo", "arguments": "hi"}"#).await;
        assert_eq!(reply, json!({"id": 4, "result": "hi"}));

        let reply = channel.handle_line(r#"{"id": "x", "method": "nope"}"#).await;
        assert_eq!(reply, json!({"id": "x", "notImplemented": true}));

        let reply = channel.handle_line("not json").await;
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn test_decode_failure_is_serialization_error() {
        let err = decode(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error: "));

        let request = decode(r#"{"method": "getPlatformVersion"}"#).unwrap();
        assert_eq!(request.id, Value::Null);
        assert_eq!(request.call.method, "getPlatformVersion");
        assert_eq!(request.call.arguments, Value::Null);
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = MethodResponse::error(INVALID_ARGUMENTS, "Missing").to_reply(&json!(7));
        assert_eq!(
            reply,
            json!({
                "id": 7,
                "error": { "code": "INVALID_ARGUMENTS", "message": "Missing", "details": null },
            })
        );
    }
}
