//! Engine.IO / Socket.IO text packet codec.
//!
//! Engine.IO packet: `<type>[payload]`.
//!
//! Socket.IO packet (carried inside an Engine.IO `message`):
//! `<type>[<namespace>,][<ack id>][<JSON payload>]`.
//!
//! Binary packets (types 5 and 6) are not supported.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// The default (root) namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

// ============================================================================
// OpenHandshake
// ============================================================================

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine.IO session id.
    pub sid: String,

    /// Transports the server would upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,

    /// Milliseconds between server pings.
    pub ping_interval: u64,

    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,

    /// Largest accepted payload in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// Longest silence tolerated before the link counts as lost.
    #[inline]
    #[must_use]
    pub const fn heartbeat_window_ms(&self) -> u64 {
        self.ping_interval.saturating_add(self.ping_timeout)
    }
}

// ============================================================================
// EnginePacket
// ============================================================================

/// An Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// `0`: session opened.
    Open(OpenHandshake),
    /// `1`: transport closing.
    Close,
    /// `2`: heartbeat request (optional payload, e.g. `probe`).
    Ping(String),
    /// `3`: heartbeat response.
    Pong(String),
    /// `4`: carries a Socket.IO packet.
    Message(String),
    /// `5`: transport upgrade.
    Upgrade,
    /// `6`: no-op.
    Noop,
}

impl EnginePacket {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for empty frames, unknown packet types,
    /// or a malformed open handshake.
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let Some(kind) = chars.next() else {
            return Err(Error::protocol("empty Engine.IO packet"));
        };
        let payload = chars.as_str();

        match kind {
            '0' => {
                let handshake = serde_json::from_str(payload).map_err(|e| {
                    Error::protocol(format!("invalid open handshake: {e}"))
                })?;
                Ok(Self::Open(handshake))
            }
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(payload.to_string())),
            '3' => Ok(Self::Pong(payload.to_string())),
            '4' => Ok(Self::Message(payload.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(Error::protocol(format!(
                "unknown Engine.IO packet type: {other:?}"
            ))),
        }
    }

    /// Encodes into a text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            // Serializing a struct of strings and integers cannot fail
            Self::Open(handshake) => format!(
                "0{}",
                serde_json::to_string(handshake).unwrap_or_default()
            ),
            Self::Close => "1".to_string(),
            Self::Ping(payload) => format!("2{payload}"),
            Self::Pong(payload) => format!("3{payload}"),
            Self::Message(payload) => format!("4{payload}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

// ============================================================================
// SocketPacket
// ============================================================================

/// A Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connect, with optional auth (client) or sid (server).
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    /// `1`: namespace disconnect.
    Disconnect { namespace: String },
    /// `2`: event; `data[0]` is the event name.
    Event {
        namespace: String,
        id: Option<u64>,
        data: Vec<Value>,
    },
    /// `3`: acknowledgement of an event.
    Ack {
        namespace: String,
        id: u64,
        data: Vec<Value>,
    },
    /// `4`: namespace connect refused.
    ConnectError { namespace: String, data: Value },
}

impl SocketPacket {
    /// Creates a connect packet for the default namespace.
    #[inline]
    #[must_use]
    pub fn connect(auth: Option<Value>) -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: auth,
        }
    }

    /// Creates a disconnect packet for the default namespace.
    #[inline]
    #[must_use]
    pub fn disconnect() -> Self {
        Self::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Creates an event packet for the default namespace.
    #[must_use]
    pub fn event(name: &str, payload: Value, id: Option<u64>) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id,
            data: vec![Value::String(name.to_string()), payload],
        }
    }

    /// Creates an ack packet for the default namespace.
    #[must_use]
    pub fn ack(id: u64, data: Vec<Value>) -> Self {
        Self::Ack {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id,
            data,
        }
    }

    /// Returns the packet's namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Returns the event name for [`SocketPacket::Event`].
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Event { data, .. } => data.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Decodes the payload of an Engine.IO `message`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on malformed input or binary packets.
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let Some(kind) = chars.next() else {
            return Err(Error::protocol("empty Socket.IO packet"));
        };
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(Error::protocol("binary Socket.IO packets are not supported"));
        }

        // Namespace
        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(idx) => {
                    let ns = &rest[..idx];
                    rest = &rest[idx + 1..];
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        // Ack id
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            let parsed = rest[..digits]
                .parse::<u64>()
                .map_err(|e| Error::protocol(format!("invalid ack id: {e}")))?;
            rest = &rest[digits..];
            Some(parsed)
        } else {
            None
        };

        // Payload
        let payload: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| Error::protocol(format!("invalid packet payload: {e}")))?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect {
                namespace,
                data: payload,
            }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let data = expect_array(payload, "event")?;
                if data.first().and_then(Value::as_str).is_none() {
                    return Err(Error::protocol("event packet without a name"));
                }
                Ok(Self::Event {
                    namespace,
                    id,
                    data,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| Error::protocol("ack packet without an id"))?;
                let data = expect_array(payload, "ack")?;
                Ok(Self::Ack {
                    namespace,
                    id,
                    data,
                })
            }
            '4' => Ok(Self::ConnectError {
                namespace,
                data: payload.unwrap_or(Value::Null),
            }),
            other => Err(Error::protocol(format!(
                "unknown Socket.IO packet type: {other:?}"
            ))),
        }
    }

    /// Encodes into the payload of an Engine.IO `message`.
    #[must_use]
    pub fn encode(&self) -> String {
        let (kind, id, payload) = match self {
            Self::Connect { data, .. } => ('0', None, data.clone()),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event { id, data, .. } => ('2', *id, Some(Value::Array(data.clone()))),
            Self::Ack { id, data, .. } => ('3', Some(*id), Some(Value::Array(data.clone()))),
            Self::ConnectError { data, .. } => ('4', None, Some(data.clone())),
        };

        let mut out = String::new();
        out.push(kind);

        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        if let Some(id) = id {
            out.push_str(&id.to_string());
        }

        if let Some(payload) = payload {
            out.push_str(&payload.to_string());
        }

        out
    }

    /// Wraps this packet in an Engine.IO message frame.
    #[inline]
    #[must_use]
    pub fn into_frame(self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

/// Requires the payload to be a JSON array.
fn expect_array(payload: Option<Value>, what: &str) -> Result<Vec<Value>> {
    match payload {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(Error::protocol(format!("{what} payload is not an array"))),
        None => Err(Error::protocol(format!("{what} packet without payload"))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_open() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        let EnginePacket::Open(handshake) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.heartbeat_window_ms(), 45000);
        assert_eq!(handshake.max_payload, Some(1_000_000));
    }

    #[test]
    fn test_decode_engine_simple() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(
            EnginePacket::decode("2probe").unwrap(),
            EnginePacket::Ping("probe".into())
        );
        assert_eq!(EnginePacket::decode("1").unwrap(), EnginePacket::Close);
        assert_eq!(
            EnginePacket::decode("42[\"x\"]").unwrap(),
            EnginePacket::Message("2[\"x\"]".into())
        );
        assert!(EnginePacket::decode("").is_err());
        assert!(EnginePacket::decode("9").is_err());
        assert!(EnginePacket::decode("0{not json").is_err());
    }

    #[test]
    fn test_encode_pong() {
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
    }

    #[test]
    fn test_connect_with_auth_frame() {
        let frame = SocketPacket::connect(Some(json!({ "token": "abc" }))).into_frame();
        assert_eq!(frame, r#"40{"token":"abc"}"#);
    }

    #[test]
    fn test_event_with_ack_frame() {
        let frame =
            SocketPacket::event("chat:message", json!({ "message": "hello" }), Some(7))
                .into_frame();
        assert_eq!(frame, r#"427["chat:message",{"message":"hello"}]"#);
    }

    #[test]
    fn test_decode_event() {
        let packet = SocketPacket::decode(r#"2["chat:response",{"message":"hi"}]"#).unwrap();
        assert_eq!(packet.event_name(), Some("chat:response"));
        assert_eq!(packet.namespace(), "/");
        let SocketPacket::Event { id, data, .. } = packet else {
            panic!("expected event");
        };
        assert_eq!(id, None);
        assert_eq!(data[1], json!({ "message": "hi" }));
    }

    #[test]
    fn test_decode_ack() {
        let packet = SocketPacket::decode(r#"312[{"error":"rate limited"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Ack {
                namespace: "/".into(),
                id: 12,
                data: vec![json!({ "error": "rate limited" })],
            }
        );
    }

    #[test]
    fn test_decode_namespaced() {
        let packet = SocketPacket::decode(r#"2/admin,3["ping"]"#).unwrap();
        assert_eq!(packet.namespace(), "/admin");
        assert_eq!(packet.encode(), r#"2/admin,3["ping"]"#);

        let packet = SocketPacket::decode("1/admin").unwrap();
        assert_eq!(
            packet,
            SocketPacket::Disconnect {
                namespace: "/admin".into()
            }
        );
    }

    #[test]
    fn test_decode_connect_and_error() {
        assert_eq!(
            SocketPacket::decode(r#"0{"sid":"s1"}"#).unwrap(),
            SocketPacket::Connect {
                namespace: "/".into(),
                data: Some(json!({ "sid": "s1" })),
            }
        );
        assert_eq!(
            SocketPacket::decode(r#"4{"message":"invalid token"}"#).unwrap(),
            SocketPacket::ConnectError {
                namespace: "/".into(),
                data: json!({ "message": "invalid token" }),
            }
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(SocketPacket::decode("").is_err());
        assert!(SocketPacket::decode("2").is_err());
        assert!(SocketPacket::decode("2{}").is_err());
        assert!(SocketPacket::decode("2[1]").is_err());
        assert!(SocketPacket::decode("3[]").is_err());
        assert!(SocketPacket::decode("51-[\"bin\"]").is_err());
        assert!(SocketPacket::decode("8").is_err());
    }

    proptest! {
        #[test]
        fn prop_event_text_survives_codec(text in ".*", id in proptest::option::of(0u64..1_000_000)) {
            let packet = SocketPacket::event("chat:message", json!({ "message": text }), id);
            let frame = packet.clone().into_frame();

            let EnginePacket::Message(inner) = EnginePacket::decode(&frame).unwrap() else {
                panic!("expected message frame");
            };
            prop_assert_eq!(SocketPacket::decode(&inner).unwrap(), packet);
        }
    }
}
