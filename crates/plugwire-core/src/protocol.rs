//! Canonical bridge messages.
//!
//! Every event crossing the bridge is exactly one [`UiMessage`] (UI to
//! engine) or [`EngineMessage`] (engine to UI). Host-specific encodings live
//! in the transport crates; application code only ever sees these types.
//!
//! Both enums serialize to the JSON envelope used by the WebView host,
//! tagged by `"msg"`:
//!
//! ```text
//! {"msg":"SPVFUI","paramIdx":3,"value":0.5}
//! {"msg":"SAMFUI","msgTag":7,"ctrlTag":-1,"data":"AQID"}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::base64_bytes;
use crate::types::{NormalizedValue, ParameterId, Tag};

/// Tag marking a begin-change gesture sent over an arbitrary-message channel.
pub const BEGIN_CHANGE_SENTINEL: Tag = -1;

/// Tag marking an end-change gesture sent over an arbitrary-message channel.
pub const END_CHANGE_SENTINEL: Tag = -2;

/// Direction a message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    UiToEngine,
    EngineToUi,
}

/// Wire-level message tags.
///
/// The string forms are fixed by the host contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// `SPVFUI`
    UiParameterValue,
    /// `BPCFUI`
    UiBeginChange,
    /// `EPCFUI`
    UiEndChange,
    /// `SAMFUI`
    UiArbitrary,
    /// `SMMFUI`
    UiMidi,
    /// `SKPFUI`
    UiKeyPress,
    /// `SREQ`
    StateRequest,
    /// `SPVFD`
    ParameterValue,
    /// `SCVFD`
    ControlValue,
    /// `SCMFD`
    ControlMessage,
    /// `SAMFD`
    Arbitrary,
    /// `SMMFD`
    Midi,
    /// `SSMFD`
    Sysex,
    /// `SSTATE`
    State,
    /// `StartIdleTimer`
    StartIdleTimer,
}

impl MessageTag {
    /// Every tag, UI-originated first.
    pub const ALL: [MessageTag; 15] = [
        Self::UiParameterValue,
        Self::UiBeginChange,
        Self::UiEndChange,
        Self::UiArbitrary,
        Self::UiMidi,
        Self::UiKeyPress,
        Self::StateRequest,
        Self::ParameterValue,
        Self::ControlValue,
        Self::ControlMessage,
        Self::Arbitrary,
        Self::Midi,
        Self::Sysex,
        Self::State,
        Self::StartIdleTimer,
    ];

    /// Wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UiParameterValue => "SPVFUI",
            Self::UiBeginChange => "BPCFUI",
            Self::UiEndChange => "EPCFUI",
            Self::UiArbitrary => "SAMFUI",
            Self::UiMidi => "SMMFUI",
            Self::UiKeyPress => "SKPFUI",
            Self::StateRequest => "SREQ",
            Self::ParameterValue => "SPVFD",
            Self::ControlValue => "SCVFD",
            Self::ControlMessage => "SCMFD",
            Self::Arbitrary => "SAMFD",
            Self::Midi => "SMMFD",
            Self::Sysex => "SSMFD",
            Self::State => "SSTATE",
            Self::StartIdleTimer => "StartIdleTimer",
        }
    }

    /// Which way messages with this tag travel.
    pub const fn direction(&self) -> Direction {
        match self {
            Self::UiParameterValue
            | Self::UiBeginChange
            | Self::UiEndChange
            | Self::UiArbitrary
            | Self::UiMidi
            | Self::UiKeyPress
            | Self::StateRequest => Direction::UiToEngine,
            _ => Direction::EngineToUi,
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a verb is not one of the known wire tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl FromStr for MessageTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

/// Message sent from the UI to the processing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum UiMessage {
    #[serde(rename = "SPVFUI")]
    ParameterValue {
        #[serde(rename = "paramIdx")]
        param_idx: ParameterId,
        value: NormalizedValue,
    },

    #[serde(rename = "BPCFUI")]
    BeginParameterChange {
        #[serde(rename = "paramIdx")]
        param_idx: ParameterId,
    },

    #[serde(rename = "EPCFUI")]
    EndParameterChange {
        #[serde(rename = "paramIdx")]
        param_idx: ParameterId,
    },

    #[serde(rename = "SAMFUI")]
    ArbitraryMessage {
        #[serde(rename = "msgTag")]
        msg_tag: Tag,
        #[serde(rename = "ctrlTag")]
        ctrl_tag: Tag,
        #[serde(with = "base64_bytes", default)]
        data: Vec<u8>,
    },

    #[serde(rename = "SMMFUI")]
    MidiMessage {
        #[serde(rename = "statusByte")]
        status: u8,
        #[serde(rename = "dataByte1")]
        data1: u8,
        #[serde(rename = "dataByte2")]
        data2: u8,
    },

    #[serde(rename = "SKPFUI")]
    KeyPress {
        #[serde(rename = "keyCode")]
        key_code: i32,
        utf8: String,
        #[serde(rename = "S")]
        shift: bool,
        #[serde(rename = "C")]
        ctrl: bool,
        #[serde(rename = "A")]
        alt: bool,
        #[serde(rename = "isUp")]
        is_up: bool,
    },

    #[serde(rename = "SREQ")]
    StateSyncRequest,
}

impl UiMessage {
    /// Wire tag of this message.
    pub const fn tag(&self) -> MessageTag {
        match self {
            Self::ParameterValue { .. } => MessageTag::UiParameterValue,
            Self::BeginParameterChange { .. } => MessageTag::UiBeginChange,
            Self::EndParameterChange { .. } => MessageTag::UiEndChange,
            Self::ArbitraryMessage { .. } => MessageTag::UiArbitrary,
            Self::MidiMessage { .. } => MessageTag::UiMidi,
            Self::KeyPress { .. } => MessageTag::UiKeyPress,
            Self::StateSyncRequest => MessageTag::StateRequest,
        }
    }

    /// Binary payload, if this message carries one.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::ArbitraryMessage { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Message sent from the processing engine to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum EngineMessage {
    #[serde(rename = "SPVFD")]
    ParameterValue {
        #[serde(rename = "paramIdx")]
        param_idx: ParameterId,
        value: NormalizedValue,
    },

    #[serde(rename = "SCVFD")]
    ControlValue {
        #[serde(rename = "ctrlTag")]
        ctrl_tag: Tag,
        value: NormalizedValue,
    },

    #[serde(rename = "SCMFD")]
    ControlMessage {
        #[serde(rename = "ctrlTag")]
        ctrl_tag: Tag,
        #[serde(rename = "msgTag")]
        msg_tag: Tag,
        #[serde(with = "base64_bytes", default)]
        data: Vec<u8>,
    },

    #[serde(rename = "SAMFD")]
    ArbitraryMessage {
        #[serde(rename = "msgTag")]
        msg_tag: Tag,
        #[serde(with = "base64_bytes", default)]
        data: Vec<u8>,
    },

    #[serde(rename = "SMMFD")]
    MidiMessage {
        #[serde(rename = "statusByte")]
        status: u8,
        #[serde(rename = "dataByte1")]
        data1: u8,
        #[serde(rename = "dataByte2")]
        data2: u8,
    },

    #[serde(rename = "SSMFD")]
    SysexMessage {
        #[serde(with = "base64_bytes", default)]
        data: Vec<u8>,
    },

    #[serde(rename = "SSTATE")]
    StateDump {
        #[serde(with = "base64_bytes", default)]
        data: Vec<u8>,
    },

    #[serde(rename = "StartIdleTimer")]
    IdleTimerStart,
}

impl EngineMessage {
    /// Wire tag of this message.
    pub const fn tag(&self) -> MessageTag {
        match self {
            Self::ParameterValue { .. } => MessageTag::ParameterValue,
            Self::ControlValue { .. } => MessageTag::ControlValue,
            Self::ControlMessage { .. } => MessageTag::ControlMessage,
            Self::ArbitraryMessage { .. } => MessageTag::Arbitrary,
            Self::MidiMessage { .. } => MessageTag::Midi,
            Self::SysexMessage { .. } => MessageTag::Sysex,
            Self::StateDump { .. } => MessageTag::State,
            Self::IdleTimerStart => MessageTag::StartIdleTimer,
        }
    }

    /// Binary payload, if this message carries one.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::ControlMessage { data, .. }
            | Self::ArbitraryMessage { data, .. }
            | Self::SysexMessage { data }
            | Self::StateDump { data } => Some(data),
            _ => None,
        }
    }

    /// Length of the binary payload (`byteLength` on the wire), 0 if none.
    pub fn byte_length(&self) -> usize {
        self.payload().map_or(0, <[u8]>::len)
    }
}

/// Any message, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    ToEngine(UiMessage),
    ToUi(EngineMessage),
}

impl BridgeMessage {
    /// Wire tag of the wrapped message.
    pub const fn tag(&self) -> MessageTag {
        match self {
            Self::ToEngine(msg) => msg.tag(),
            Self::ToUi(msg) => msg.tag(),
        }
    }

    /// Binary payload of the wrapped message.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::ToEngine(msg) => msg.payload(),
            Self::ToUi(msg) => msg.payload(),
        }
    }
}

impl From<UiMessage> for BridgeMessage {
    fn from(msg: UiMessage) -> Self {
        Self::ToEngine(msg)
    }
}

impl From<EngineMessage> for BridgeMessage {
    fn from(msg: EngineMessage) -> Self {
        Self::ToUi(msg)
    }
}

/// Clamp a byte payload to a length declared on the wire.
///
/// A declared length larger than the decoded payload means the frame was
/// truncated in transit; a smaller one trims trailing bytes.
pub fn apply_declared_length(mut data: Vec<u8>, declared: usize) -> crate::error::WireResult<Vec<u8>> {
    if declared > data.len() {
        return Err(crate::error::WireError::ByteLength {
            declared,
            actual: data.len(),
        });
    }
    data.truncate(declared);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_back() {
        for tag in MessageTag::ALL {
            assert_eq!(tag.as_str().parse::<MessageTag>(), Ok(tag));
        }
        assert!("SPVFX".parse::<MessageTag>().is_err());
    }

    #[test]
    fn test_tag_directions() {
        let ui = MessageTag::ALL
            .iter()
            .filter(|t| t.direction() == Direction::UiToEngine)
            .count();
        assert_eq!(ui, 7);
        assert_eq!(MessageTag::StartIdleTimer.direction(), Direction::EngineToUi);
    }

    #[test]
    fn test_parameter_value_envelope() {
        let msg = UiMessage::ParameterValue {
            param_idx: 3,
            value: 0.5,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["msg"], "SPVFUI");
        assert_eq!(json["paramIdx"], 3);
        assert_eq!(json["value"], 0.5);
    }

    #[test]
    fn test_arbitrary_envelope_carries_base64() {
        let msg = UiMessage::ArbitraryMessage {
            msg_tag: 7,
            ctrl_tag: -1,
            data: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"data\":\"AQID\""));

        let back: UiMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_unit_variants() {
        let json = serde_json::to_string(&UiMessage::StateSyncRequest).unwrap();
        assert_eq!(json, r#"{"msg":"SREQ"}"#);

        let idle: EngineMessage = serde_json::from_str(r#"{"msg":"StartIdleTimer"}"#).unwrap();
        assert_eq!(idle, EngineMessage::IdleTimerStart);
    }

    #[test]
    fn test_key_press_field_names() {
        let msg = UiMessage::KeyPress {
            key_code: 65,
            utf8: "a".to_string(),
            shift: true,
            ctrl: false,
            alt: false,
            is_up: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["keyCode"], 65);
        assert_eq!(json["S"], true);
        assert_eq!(json["isUp"], false);
    }

    #[test]
    fn test_byte_length() {
        let msg = EngineMessage::ControlMessage {
            ctrl_tag: 3,
            msg_tag: 7,
            data: vec![1, 2, 3],
        };
        assert_eq!(msg.byte_length(), 3);
        assert_eq!(EngineMessage::IdleTimerStart.byte_length(), 0);
    }

    #[test]
    fn test_declared_length() {
        assert_eq!(apply_declared_length(vec![1, 2, 3], 2).unwrap(), vec![1, 2]);
        assert!(apply_declared_length(vec![1, 2, 3], 4).is_err());
    }
}
