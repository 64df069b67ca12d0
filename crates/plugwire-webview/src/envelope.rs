//! JSON envelopes exchanged with the native side.

use plugwire_core::{BridgeMessage, Direction, MessageTag, UiMessage, WireError, WireResult};
use serde_json::Value;

/// Serialize an outbound message into the envelope posted to the host.
pub fn encode_envelope(message: &UiMessage) -> WireResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Parse an envelope of either direction, keyed by its `"msg"` field.
pub fn decode_envelope(json: &str) -> WireResult<BridgeMessage> {
    let value: Value = serde_json::from_str(json)?;
    let tag = value
        .get("msg")
        .and_then(Value::as_str)
        .ok_or_else(|| WireError::prop("envelope", json, "missing \"msg\" field"))?;
    let tag: MessageTag = tag
        .parse()
        .map_err(|_| WireError::prop("envelope", tag, "unknown message tag"))?;

    Ok(match tag.direction() {
        Direction::UiToEngine => BridgeMessage::ToEngine(serde_json::from_value(value)?),
        Direction::EngineToUi => BridgeMessage::ToUi(serde_json::from_value(value)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugwire_core::{EngineMessage, ErrorKind};

    #[test]
    fn test_envelope_round_trip() {
        let message = UiMessage::MidiMessage {
            status: 0x90,
            data1: 60,
            data2: 100,
        };
        let json = encode_envelope(&message).unwrap();
        assert_eq!(decode_envelope(&json).unwrap(), BridgeMessage::ToEngine(message));
    }

    #[test]
    fn test_engine_envelope() {
        let decoded = decode_envelope(r#"{"msg":"SSTATE","data":"AQID"}"#).unwrap();
        assert_eq!(
            decoded,
            BridgeMessage::ToUi(EngineMessage::StateDump { data: vec![1, 2, 3] })
        );
    }

    #[test]
    fn test_unknown_tag_is_malformed() {
        let err = decode_envelope(r#"{"msg":"NOPE"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageMalformed);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = decode_envelope(r#"{"msg":"SPVFUI","paramIdx":1}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageMalformed);
    }
}
