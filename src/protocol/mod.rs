//! Cross-origin message protocol between the host page and the agent iframe
//!
//! Every message travels as a `{ "type": ..., "data": ... }` envelope. The
//! host only trusts messages whose sender origin equals the configured remote
//! origin; everything else is dropped before the payload is looked at.

use crate::error::{Error, Result};
use crate::widget::WidgetConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

pub const READY: &str = "widget:ready";
pub const CLOSE: &str = "widget:close";
pub const RESIZE: &str = "widget:resize";
pub const MESSAGE: &str = "widget:message";
pub const CONFIG: &str = "widget:config";
pub const VISIBILITY: &str = "widget:visibility";

/// Origin serving the agent UI when nothing else is configured
pub const DEFAULT_REMOTE_ORIGIN: &str = "http://localhost:3000";

/// A serialized web origin (`scheme://host[:port]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Parse and normalize an origin. Paths, queries and default ports are
    /// stripped; opaque origins (`data:`, `file:`, ...) are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| Error::Config(format!("Invalid origin '{}': {}", input, e)))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(Error::Config(format!(
                "Origin '{}' is opaque and cannot be verified",
                input
            )));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against the `origin` a browser reports for a sender
    pub fn matches(&self, sender: &str) -> bool {
        self.0 == sender
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self(DEFAULT_REMOTE_ORIGIN.to_string())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Origin {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Origin::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

/// Untyped wire envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// `widget:resize` payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub height: f64,
}

/// Messages the embedded agent UI sends to the host
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// The embedded UI finished loading and wants its configuration
    Ready,
    /// The embedded UI asks the host to collapse the widget
    Close,
    /// The embedded UI asks for a new iframe height
    Resize { height: f64 },
    /// Opaque agent event for the host page
    Relay(Value),
    /// Any type this version does not know; ignored
    Unknown(String),
}

impl InboundMessage {
    /// Decode a raw payload. Unknown types decode to `Unknown`; payloads that
    /// are not an envelope, or a `widget:resize` without a numeric height,
    /// are protocol errors.
    pub fn decode(payload: &Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::Protocol(
                "Not a message envelope: expected an object".to_string(),
            ));
        }
        let envelope = Envelope::deserialize(payload)
            .map_err(|e| Error::Protocol(format!("Not a message envelope: {}", e)))?;

        Ok(match envelope.kind.as_str() {
            READY => InboundMessage::Ready,
            CLOSE => InboundMessage::Close,
            RESIZE => {
                if !envelope.data.is_object() {
                    return Err(Error::Protocol(format!(
                        "Invalid {} payload: expected an object",
                        RESIZE
                    )));
                }
                let request = ResizeRequest::deserialize(&envelope.data).map_err(|e| {
                    Error::Protocol(format!("Invalid {} payload: {}", RESIZE, e))
                })?;
                InboundMessage::Resize {
                    height: request.height,
                }
            }
            MESSAGE => InboundMessage::Relay(envelope.data),
            _ => InboundMessage::Unknown(envelope.kind),
        })
    }

    /// Wire type string
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::Ready => READY,
            InboundMessage::Close => CLOSE,
            InboundMessage::Resize { .. } => RESIZE,
            InboundMessage::Relay(_) => MESSAGE,
            InboundMessage::Unknown(kind) => kind,
        }
    }

    /// Encode as the iframe would send it
    pub fn to_value(&self) -> Value {
        let data = match self {
            InboundMessage::Resize { height } => serde_json::json!({ "height": height }),
            InboundMessage::Relay(data) => data.clone(),
            _ => Value::Null,
        };
        serde_json::to_value(Envelope {
            kind: self.kind().to_string(),
            data,
        })
        .unwrap_or_default()
    }
}

/// `widget:visibility` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityChange {
    pub is_visible: bool,
}

/// Messages the host sends into the iframe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundMessage {
    /// Authoritative configuration push, answering `widget:ready`
    #[serde(rename = "widget:config")]
    Config(WidgetConfig),
    /// The widget was shown or hidden
    #[serde(rename = "widget:visibility")]
    Visibility(VisibilityChange),
}

impl OutboundMessage {
    pub fn visibility(is_visible: bool) -> Self {
        OutboundMessage::Visibility(VisibilityChange { is_visible })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Config(_) => CONFIG,
            OutboundMessage::Visibility(_) => VISIBILITY,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_origin_normalizes() {
        let origin = Origin::parse("https://Agents.Example.com:443/widget?x=1").unwrap();
        assert_eq!(origin.as_str(), "https://agents.example.com");
        assert!(origin.matches("https://agents.example.com"));
        assert!(!origin.matches("https://agents.example.com.evil.io"));
        assert!(!origin.matches("http://agents.example.com"));
    }

    #[test]
    fn test_origin_keeps_explicit_port() {
        let origin = Origin::parse("http://localhost:3000").unwrap();
        assert_eq!(origin.to_string(), "http://localhost:3000");
    }

    #[test]
    fn test_default_origin_is_normalized() {
        let origin = Origin::default();
        assert_eq!(Origin::parse(origin.as_str()).unwrap(), origin);
    }

    #[test]
    fn test_origin_serde_validates() {
        let origin: Origin = serde_json::from_value(json!("https://a.example/path")).unwrap();
        assert_eq!(origin.as_str(), "https://a.example");
        assert!(serde_json::from_value::<Origin>(json!("relative/path")).is_err());
    }

    #[test]
    fn test_origin_rejects_opaque() {
        assert!(Origin::parse("data:text/html,hi").is_err());
        assert!(Origin::parse("not a url").is_err());
    }

    #[test]
    fn test_decode_known_types() {
        assert_eq!(
            InboundMessage::decode(&json!({ "type": "widget:ready" })).unwrap(),
            InboundMessage::Ready
        );
        assert_eq!(
            InboundMessage::decode(&json!({ "type": "widget:close", "data": null })).unwrap(),
            InboundMessage::Close
        );
        assert_eq!(
            InboundMessage::decode(&json!({ "type": "widget:resize", "data": { "height": 420 } }))
                .unwrap(),
            InboundMessage::Resize { height: 420.0 }
        );
        assert_eq!(
            InboundMessage::decode(&json!({ "type": "widget:message", "data": { "text": "hi" } }))
                .unwrap(),
            InboundMessage::Relay(json!({ "text": "hi" }))
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let message = InboundMessage::decode(&json!({ "type": "widget:teleport", "data": 1 }))
            .unwrap();
        assert_eq!(message, InboundMessage::Unknown("widget:teleport".to_string()));
    }

    #[test]
    fn test_decode_rejects_non_envelopes() {
        assert!(InboundMessage::decode(&json!("widget:ready")).is_err());
        assert!(InboundMessage::decode(&json!({ "data": 1 })).is_err());
        assert!(InboundMessage::decode(&json!({ "type": "widget:resize" })).is_err());
        assert!(
            InboundMessage::decode(&json!({ "type": "widget:resize", "data": { "height": "tall" } }))
                .is_err()
        );
    }

    #[test]
    fn test_decode_rejects_positional_arrays() {
        for payload in [
            json!(["widget:ready"]),
            json!(["widget:close"]),
            json!(["widget:resize", { "height": 300 }]),
            json!(["widget:message", { "text": "hi" }]),
            json!({ "type": "widget:resize", "data": [300] }),
        ] {
            assert!(
                matches!(InboundMessage::decode(&payload), Err(Error::Protocol(_))),
                "decoded {}",
                payload
            );
        }
    }

    #[test]
    fn test_inbound_to_value_decodes_back() {
        let message = InboundMessage::Resize { height: 300.0 };
        assert_eq!(InboundMessage::decode(&message.to_value()).unwrap(), message);
        assert_eq!(InboundMessage::Ready.to_value(), json!({ "type": "widget:ready" }));
    }

    #[test]
    fn test_outbound_visibility_wire_format() {
        assert_eq!(
            OutboundMessage::visibility(true).to_value(),
            json!({ "type": "widget:visibility", "data": { "isVisible": true } })
        );
    }

    #[test]
    fn test_outbound_config_wire_format() {
        let config = WidgetConfig::for_agent("abc123").unwrap();
        let value = OutboundMessage::Config(config.clone()).to_value();
        assert_eq!(value["type"], "widget:config");
        assert_eq!(value["data"], serde_json::to_value(&config).unwrap());
    }
}
