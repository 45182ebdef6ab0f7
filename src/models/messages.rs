use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RoomError;

/// A single transport frame, kept exactly as it arrived so it can be relayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }
}

/// Structured message exchanged over a room connection.
///
/// Only `init` and `code_update` carry meaning for the server. Anything else with a
/// `type` field is `Opaque`; its fields are never looked at.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    Init {
        code: String,
    },
    CodeUpdate {
        #[serde(default, deserialize_with = "null_as_empty")]
        code: String,
    },
    #[serde(other)]
    Opaque,
}

impl Envelope {
    /// Classify a raw payload.
    ///
    /// Fails with `MalformedEnvelope` when the payload is not a JSON object or when a
    /// known message type has fields of the wrong shape. A JSON object without a string
    /// `type` is opaque.
    pub fn parse(raw: &[u8]) -> Result<Envelope, RoomError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| RoomError::MalformedEnvelope(e.to_string()))?;

        let Some(object) = value.as_object() else {
            return Err(RoomError::MalformedEnvelope(
                "payload is not a JSON object".to_string(),
            ));
        };
        if !object.get("type").is_some_and(Value::is_string) {
            return Ok(Envelope::Opaque);
        }

        serde_json::from_value(value).map_err(|e| RoomError::MalformedEnvelope(e.to_string()))
    }

    pub fn init(code: impl Into<String>) -> Self {
        Envelope::Init { code: code.into() }
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::Text)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_update() {
        let env = Envelope::parse(br#"{"type":"code_update","code":"print(1)"}"#).unwrap();
        assert_eq!(env, Envelope::CodeUpdate { code: "print(1)".to_string() });
    }

    #[test]
    fn code_update_without_code_clears_document() {
        let env = Envelope::parse(br#"{"type":"code_update"}"#).unwrap();
        assert_eq!(env, Envelope::CodeUpdate { code: String::new() });

        let env = Envelope::parse(br#"{"type":"code_update","code":null}"#).unwrap();
        assert_eq!(env, Envelope::CodeUpdate { code: String::new() });
    }

    #[test]
    fn unknown_types_are_opaque() {
        let env = Envelope::parse(br#"{"type":"cursor","line":3,"col":{"x":1}}"#).unwrap();
        assert_eq!(env, Envelope::Opaque);

        let env = Envelope::parse(br#"{"code":"no type here"}"#).unwrap();
        assert_eq!(env, Envelope::Opaque);
    }

    #[test]
    fn rejects_non_objects_and_garbage() {
        assert!(matches!(
            Envelope::parse(b"not json"),
            Err(RoomError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Envelope::parse(b"[1,2,3]"),
            Err(RoomError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Envelope::parse(br#"{"type":"code_update","code":42}"#),
            Err(RoomError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn init_serializes_with_type_tag() {
        let frame = Envelope::init("x = 1").to_frame().unwrap();
        assert_eq!(frame, Frame::Text(r#"{"type":"init","code":"x = 1"}"#.to_string()));
    }
}
