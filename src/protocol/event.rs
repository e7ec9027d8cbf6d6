//! Chat event names and payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Outbound user message event.
pub const CHAT_MESSAGE_EVENT: &str = "chat:message";

/// Inbound bot reply event.
pub const CHAT_RESPONSE_EVENT: &str = "chat:response";

/// Auth payload sent with the Socket.IO CONNECT packet.
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload<'a> {
    /// Guest credential.
    pub token: &'a str,
}

/// Payload of [`CHAT_MESSAGE_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User-authored text.
    pub message: String,
}

/// Payload of [`CHAT_RESPONSE_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Bot-authored text.
    pub message: String,
}

impl ChatResponse {
    /// Extracts the response from event arguments (after the event name).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the first argument is missing or has
    /// no string `message` field.
    pub fn from_args(args: &[Value]) -> Result<Self> {
        let first = args
            .first()
            .ok_or_else(|| Error::protocol("chat response without payload"))?;
        Self::deserialize(first)
            .map_err(|e| Error::protocol(format!("invalid chat response: {e}")))
    }
}

/// Interprets the arguments of an acknowledgement.
///
/// The backend signals failure with an object carrying a non-null `error`
/// field as first argument; anything else counts as success.
///
/// # Errors
///
/// Returns [`Error::Backend`] with the error text.
pub fn check_ack(args: &[Value]) -> Result<()> {
    let error = args
        .first()
        .and_then(|first| first.get("error"))
        .filter(|error| !error.is_null());

    match error {
        None => Ok(()),
        Some(Value::String(message)) => Err(Error::backend(message.clone())),
        Some(Value::Object(fields)) => {
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| Value::Object(fields.clone()).to_string(), str::to_string);
            Err(Error::backend(message))
        }
        Some(other) => Err(Error::backend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_check_ack_success() {
        assert!(check_ack(&[]).is_ok());
        assert!(check_ack(&[json!({ "success": true })]).is_ok());
        assert!(check_ack(&[json!({ "error": null })]).is_ok());
        assert!(check_ack(&[json!("ok")]).is_ok());
    }

    #[test]
    fn test_check_ack_error_string() {
        let err = check_ack(&[json!({ "error": "Session expired" })]).unwrap_err();
        assert_eq!(err.to_string(), "Backend error: Session expired");
    }

    #[test]
    fn test_check_ack_error_object() {
        let err = check_ack(&[json!({ "error": { "message": "quota" } })]).unwrap_err();
        assert!(matches!(err, Error::Backend { message } if message == "quota"));

        let err = check_ack(&[json!({ "error": 42 })]).unwrap_err();
        assert!(matches!(err, Error::Backend { message } if message == "42"));
    }

    #[test]
    fn test_chat_response_from_args() {
        let response = ChatResponse::from_args(&[json!({ "message": "Hi there" })]).unwrap();
        assert_eq!(response.message, "Hi there");

        assert!(ChatResponse::from_args(&[]).is_err());
        assert!(ChatResponse::from_args(&[json!({ "text": "x" })]).is_err());
    }

    #[test]
    fn test_chat_request_json() {
        let request = ChatRequest {
            message: "hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "message": "hello" })
        );
    }
}
