//! Canonical messages to and from WAM frames.
//!
//! | Message | verb | prop | data |
//! |---|---|---|---|
//! | ParameterValue (UI) | `SPVFUI` | `paramIdx` | number |
//! | Begin/End change | `SAMFUI` | `-1:paramIdx` / `-2:paramIdx` | none |
//! | ArbitraryMessage (UI) | `SAMFUI` | `msgTag:ctrlTag` | base64 |
//! | MidiMessage | `SMMFUI` / `SMMFD` | `status:data1:data2` | none |
//! | KeyPress | `SKPFUI` | `keyCode:shift:ctrl:alt:isUp` | utf8 text |
//! | StateSyncRequest | `SREQ` | empty | none |
//! | ParameterValue (engine) | `SPVFD` | `paramIdx` | number |
//! | ControlValue | `SCVFD` | `ctrlTag` | number |
//! | ControlMessage | `SCMFD` | `ctrlTag:msgTag` | base64 |
//! | ArbitraryMessage (engine) | `SAMFD` | `msgTag` | base64 |
//! | SysexMessage | `SSMFD` | empty | base64 |
//! | StateDump | `SSTATE` | empty | base64 |
//! | IdleTimerStart | `StartIdleTimer` | empty | none |
//!
//! Controllers exposing only the prop string get payloads appended as a
//! final segment instead (`"3:7:AQID"`). Decoding accepts both layouts, and
//! accepts begin/end gestures both as sentinel arbitrary messages and as the
//! dedicated `BPCFUI` / `EPCFUI` verbs.

use plugwire_core::codec;
use plugwire_core::{
    BridgeConfig, BridgeMessage, EngineMessage, MessageTag, ParameterId, Tag, UiMessage, WireError,
    WireResult, BEGIN_CHANGE_SENTINEL, CODEC_CHUNK_SIZE, END_CHANGE_SENTINEL,
};

use crate::frame::{WamData, WamFrame};
use crate::multiplex::{join, parse, parse_flag, split};

/// Outbound encoding choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WamOptions {
    /// Append payloads to the prop string instead of using the data slot.
    pub pack_payloads: bool,
    /// Send gestures as sentinel arbitrary messages.
    pub sentinel_gestures: bool,
    /// Codec chunk size.
    pub chunk_size: usize,
}

impl Default for WamOptions {
    fn default() -> Self {
        Self::from(&BridgeConfig::new())
    }
}

impl From<&BridgeConfig> for WamOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            pack_payloads: config.pack_wam_payloads,
            sentinel_gestures: config.sentinel_gestures,
            chunk_size: config.chunk_size,
        }
    }
}

/// Result of decoding a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A canonical message.
    Message(BridgeMessage),
    /// The verb is not a known wire tag.
    Unknown,
}

/// Encode a canonical message as a WAM frame.
pub fn encode(message: &BridgeMessage, options: &WamOptions) -> WamFrame {
    match message {
        BridgeMessage::ToEngine(message) => encode_ui(message, options),
        BridgeMessage::ToUi(message) => encode_engine(message, options),
    }
}

fn encode_ui(message: &UiMessage, options: &WamOptions) -> WamFrame {
    let verb = message.tag().as_str();
    match message {
        UiMessage::ParameterValue { param_idx, value } => {
            WamFrame::new(verb, param_idx.to_string(), WamData::Number(*value))
        }
        UiMessage::BeginParameterChange { param_idx } => {
            encode_gesture(verb, BEGIN_CHANGE_SENTINEL, *param_idx, options)
        }
        UiMessage::EndParameterChange { param_idx } => {
            encode_gesture(verb, END_CHANGE_SENTINEL, *param_idx, options)
        }
        UiMessage::ArbitraryMessage {
            msg_tag,
            ctrl_tag,
            data,
        } => with_payload(verb, join(&[*msg_tag, *ctrl_tag]), data, options),
        UiMessage::MidiMessage {
            status,
            data1,
            data2,
        } => WamFrame::new(verb, join(&[*status, *data1, *data2]), WamData::None),
        UiMessage::KeyPress {
            key_code,
            utf8,
            shift,
            ctrl,
            alt,
            is_up,
        } => {
            let flags = [*shift, *ctrl, *alt, *is_up].map(i32::from);
            let prop = join(&[*key_code, flags[0], flags[1], flags[2], flags[3]]);
            WamFrame::new(verb, prop, WamData::Text(utf8.clone()))
        }
        UiMessage::StateSyncRequest => WamFrame::new(verb, "", WamData::None),
    }
}

fn encode_gesture(verb: &str, sentinel: Tag, param_idx: ParameterId, options: &WamOptions) -> WamFrame {
    if options.sentinel_gestures {
        let prop = format!("{}:{}", sentinel, param_idx);
        WamFrame::new(MessageTag::UiArbitrary.as_str(), prop, WamData::None)
    } else {
        WamFrame::new(verb, param_idx.to_string(), WamData::None)
    }
}

fn encode_engine(message: &EngineMessage, options: &WamOptions) -> WamFrame {
    let verb = message.tag().as_str();
    match message {
        EngineMessage::ParameterValue { param_idx, value } => {
            WamFrame::new(verb, param_idx.to_string(), WamData::Number(*value))
        }
        EngineMessage::ControlValue { ctrl_tag, value } => {
            WamFrame::new(verb, ctrl_tag.to_string(), WamData::Number(*value))
        }
        EngineMessage::ControlMessage {
            ctrl_tag,
            msg_tag,
            data,
        } => with_payload(verb, join(&[*ctrl_tag, *msg_tag]), data, options),
        EngineMessage::ArbitraryMessage { msg_tag, data } => {
            with_payload(verb, msg_tag.to_string(), data, options)
        }
        EngineMessage::MidiMessage {
            status,
            data1,
            data2,
        } => WamFrame::new(verb, join(&[*status, *data1, *data2]), WamData::None),
        EngineMessage::SysexMessage { data } | EngineMessage::StateDump { data } => {
            with_payload(verb, String::new(), data, options)
        }
        EngineMessage::IdleTimerStart => WamFrame::new(verb, "", WamData::None),
    }
}

fn with_payload(verb: &str, tags: String, data: &[u8], options: &WamOptions) -> WamFrame {
    if data.is_empty() {
        return WamFrame::new(verb, tags, WamData::None);
    }
    let encoded = codec::encode_chunked(data, options.chunk_size);
    if !options.pack_payloads {
        return WamFrame::new(verb, tags, WamData::Text(encoded));
    }
    let prop = if tags.is_empty() {
        encoded
    } else {
        format!("{}:{}", tags, encoded)
    };
    WamFrame::new(verb, prop, WamData::None)
}

/// Reject outbound messages the WAM wire cannot represent unambiguously.
///
/// A UI arbitrary message tagged with a gesture sentinel would be read back
/// as a begin/end change.
pub fn check_outbound(message: &UiMessage) -> WireResult<()> {
    match message {
        UiMessage::ArbitraryMessage { msg_tag, ctrl_tag, .. }
            if *msg_tag == BEGIN_CHANGE_SENTINEL || *msg_tag == END_CHANGE_SENTINEL =>
        {
            Err(WireError::prop(
                MessageTag::UiArbitrary.as_str(),
                &join(&[*msg_tag, *ctrl_tag]),
                "message tag is reserved for begin/end change",
            ))
        }
        _ => Ok(()),
    }
}

/// Decode a WAM frame into a canonical message using the default chunk size.
pub fn decode(frame: &WamFrame) -> WireResult<Decoded> {
    decode_chunked(frame, CODEC_CHUNK_SIZE)
}

/// Decode a WAM frame, reading base64 payloads `chunk_size` bytes at a time.
pub fn decode_chunked(frame: &WamFrame, chunk_size: usize) -> WireResult<Decoded> {
    let Ok(tag) = frame.verb.parse::<MessageTag>() else {
        return Ok(Decoded::Unknown);
    };
    let prop = Prop::new(frame, chunk_size);

    if matches!(tag, MessageTag::UiArbitrary | MessageTag::Arbitrary) {
        if let Some(gesture) = prop.sentinel_gesture() {
            return Ok(Decoded::Message(gesture.into()));
        }
    }

    let message: BridgeMessage = match tag {
        MessageTag::UiParameterValue => {
            let [idx] = prop.exact::<1>()?;
            UiMessage::ParameterValue {
                param_idx: prop.int(idx)?,
                value: prop.number()?,
            }
            .into()
        }
        MessageTag::UiBeginChange => {
            let [idx] = prop.exact::<1>()?;
            UiMessage::BeginParameterChange {
                param_idx: prop.int(idx)?,
            }
            .into()
        }
        MessageTag::UiEndChange => {
            let [idx] = prop.exact::<1>()?;
            UiMessage::EndParameterChange {
                param_idx: prop.int(idx)?,
            }
            .into()
        }
        MessageTag::UiArbitrary => {
            let ([msg, ctrl], data) = prop.with_payload::<2>()?;
            UiMessage::ArbitraryMessage {
                msg_tag: prop.int(msg)?,
                ctrl_tag: prop.int(ctrl)?,
                data,
            }
            .into()
        }
        MessageTag::UiMidi => {
            let [status, data1, data2] = prop.exact::<3>()?;
            UiMessage::MidiMessage {
                status: prop.int(status)?,
                data1: prop.int(data1)?,
                data2: prop.int(data2)?,
            }
            .into()
        }
        MessageTag::UiKeyPress => {
            let [code, shift, ctrl, alt, up] = prop.exact::<5>()?;
            UiMessage::KeyPress {
                key_code: prop.int(code)?,
                utf8: frame.data.as_text().unwrap_or_default().to_string(),
                shift: prop.flag(shift)?,
                ctrl: prop.flag(ctrl)?,
                alt: prop.flag(alt)?,
                is_up: prop.flag(up)?,
            }
            .into()
        }
        MessageTag::StateRequest => UiMessage::StateSyncRequest.into(),
        MessageTag::ParameterValue => {
            let [idx] = prop.exact::<1>()?;
            EngineMessage::ParameterValue {
                param_idx: prop.int(idx)?,
                value: prop.number()?,
            }
            .into()
        }
        MessageTag::ControlValue => {
            let [ctrl] = prop.exact::<1>()?;
            EngineMessage::ControlValue {
                ctrl_tag: prop.int(ctrl)?,
                value: prop.number()?,
            }
            .into()
        }
        MessageTag::ControlMessage => {
            let ([ctrl, msg], data) = prop.with_payload::<2>()?;
            EngineMessage::ControlMessage {
                ctrl_tag: prop.int(ctrl)?,
                msg_tag: prop.int(msg)?,
                data,
            }
            .into()
        }
        MessageTag::Arbitrary => {
            let ([msg], data) = prop.with_payload::<1>()?;
            EngineMessage::ArbitraryMessage {
                msg_tag: prop.int(msg)?,
                data,
            }
            .into()
        }
        MessageTag::Midi => {
            let [status, data1, data2] = prop.exact::<3>()?;
            EngineMessage::MidiMessage {
                status: prop.int(status)?,
                data1: prop.int(data1)?,
                data2: prop.int(data2)?,
            }
            .into()
        }
        MessageTag::Sysex => {
            let ([], data) = prop.with_payload::<0>()?;
            EngineMessage::SysexMessage { data }.into()
        }
        MessageTag::State => {
            let ([], data) = prop.with_payload::<0>()?;
            EngineMessage::StateDump { data }.into()
        }
        MessageTag::StartIdleTimer => EngineMessage::IdleTimerStart.into(),
    };
    Ok(Decoded::Message(message))
}

/// Segmented view over a frame's prop string.
struct Prop<'a> {
    frame: &'a WamFrame,
    segments: Vec<&'a str>,
    chunk_size: usize,
}

impl<'a> Prop<'a> {
    fn new(frame: &'a WamFrame, chunk_size: usize) -> Self {
        Self {
            frame,
            segments: split(&frame.prop),
            chunk_size,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> WireError {
        WireError::prop(&self.frame.verb, &self.frame.prop, reason)
    }

    /// Exactly `N` segments.
    fn exact<const N: usize>(&self) -> WireResult<[&'a str; N]> {
        <[&str; N]>::try_from(self.segments.as_slice())
            .map_err(|_| self.malformed(format!("expected {} segment(s), got {}", N, self.segments.len())))
    }

    /// `N` tag segments followed by a payload, either in the data slot or
    /// packed as one extra trailing segment.
    fn with_payload<const N: usize>(&self) -> WireResult<([&'a str; N], Vec<u8>)> {
        let segments = self.segments.as_slice();
        if segments.len() == N + 1 && self.frame.data.is_empty() {
            let tags = <[&str; N]>::try_from(&segments[..N])
                .map_err(|_| self.malformed("bad tag segments"))?;
            return Ok((tags, codec::decode_chunked(segments[N], self.chunk_size)?));
        }

        let tags = self.exact::<N>()?;
        let data = match &self.frame.data {
            WamData::None => Vec::new(),
            WamData::Text(text) => codec::decode_chunked(text, self.chunk_size)?,
            WamData::Number(_) => return Err(self.malformed("expected a base64 payload")),
        };
        Ok((tags, data))
    }

    fn int<T: std::str::FromStr>(&self, segment: &str) -> WireResult<T> {
        parse(&self.frame.verb, &self.frame.prop, segment)
    }

    fn flag(&self, segment: &str) -> WireResult<bool> {
        parse_flag(&self.frame.verb, &self.frame.prop, segment)
    }

    fn number(&self) -> WireResult<f64> {
        self.frame
            .data
            .as_number()
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.malformed("expected a numeric value in the data slot"))
    }

    /// Begin/end gesture carried as `"<sentinel>:<paramIdx>"`.
    ///
    /// Only an empty data slot with exactly two integer segments qualifies;
    /// anything else is an ordinary arbitrary message.
    fn sentinel_gesture(&self) -> Option<UiMessage> {
        if !self.frame.data.is_empty() {
            return None;
        }
        let [first, second] = self.segments.as_slice() else {
            return None;
        };
        let sentinel = first.trim().parse::<Tag>().ok()?;
        let param_idx = second.trim().parse::<ParameterId>().ok()?;
        match sentinel {
            BEGIN_CHANGE_SENTINEL => Some(UiMessage::BeginParameterChange { param_idx }),
            END_CHANGE_SENTINEL => Some(UiMessage::EndParameterChange { param_idx }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugwire_core::ErrorKind;

    fn frame(verb: &str, prop: &str, data: WamData) -> WamFrame {
        WamFrame::new(verb, prop, data)
    }

    #[test]
    fn test_control_message_multiplex() {
        let message: BridgeMessage = EngineMessage::ControlMessage {
            ctrl_tag: 3,
            msg_tag: 7,
            data: vec![1, 2, 3],
        }
        .into();

        let encoded = encode(&message, &WamOptions::default());
        assert_eq!(encoded.verb, "SCMFD");
        assert_eq!(encoded.prop, "3:7");
        let text = encoded.data.as_text().unwrap();
        assert_eq!(codec::decode(text).unwrap(), vec![1, 2, 3]);

        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_sentinel_begin_decodes_to_gesture() {
        let decoded = decode(&frame("SAMFUI", "-1:5", WamData::None)).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(UiMessage::BeginParameterChange { param_idx: 5 }.into())
        );

        let decoded = decode(&frame("SAMFD", "-2:5", WamData::None)).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(UiMessage::EndParameterChange { param_idx: 5 }.into())
        );
    }

    #[test]
    fn test_gestures_encode_as_sentinels_by_default() {
        let begin = encode(
            &UiMessage::BeginParameterChange { param_idx: 9 }.into(),
            &WamOptions::default(),
        );
        assert_eq!(begin, frame("SAMFUI", "-1:9", WamData::None));

        let end = encode(
            &UiMessage::EndParameterChange { param_idx: 9 }.into(),
            &WamOptions::default(),
        );
        assert_eq!(end.prop, "-2:9");
    }

    #[test]
    fn test_native_gesture_verbs() {
        let options = WamOptions {
            sentinel_gestures: false,
            ..WamOptions::default()
        };
        let begin = encode(&UiMessage::BeginParameterChange { param_idx: 9 }.into(), &options);
        assert_eq!(begin, frame("BPCFUI", "9", WamData::None));
        assert_eq!(
            decode(&begin).unwrap(),
            Decoded::Message(UiMessage::BeginParameterChange { param_idx: 9 }.into())
        );
    }

    #[test]
    fn test_arbitrary_with_real_tags_is_not_a_gesture() {
        let decoded = decode(&frame("SAMFUI", "4:-1", WamData::Text("AQID".into()))).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(
                UiMessage::ArbitraryMessage {
                    msg_tag: 4,
                    ctrl_tag: -1,
                    data: vec![1, 2, 3]
                }
                .into()
            )
        );
    }

    #[test]
    fn test_packed_payload() {
        let options = WamOptions {
            pack_payloads: true,
            ..WamOptions::default()
        };
        let message: BridgeMessage = EngineMessage::ControlMessage {
            ctrl_tag: 3,
            msg_tag: 7,
            data: vec![1, 2],
        }
        .into();

        let encoded = encode(&message, &options);
        assert_eq!(encoded, frame("SCMFD", "3:7:AQI=", WamData::None));
        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_packed_payload_without_tags() {
        let options = WamOptions {
            pack_payloads: true,
            ..WamOptions::default()
        };
        let message: BridgeMessage = EngineMessage::SysexMessage {
            data: vec![0xF0, 0xF7],
        }
        .into();

        let encoded = encode(&message, &options);
        assert_eq!(encoded.prop, "8Pc=");
        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_midi_prop() {
        let message: BridgeMessage = UiMessage::MidiMessage {
            status: 0x90,
            data1: 60,
            data2: 100,
        }
        .into();
        let encoded = encode(&message, &WamOptions::default());
        assert_eq!(encoded, frame("SMMFUI", "144:60:100", WamData::None));
        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_key_press() {
        let message: BridgeMessage = UiMessage::KeyPress {
            key_code: 13,
            utf8: "\r".to_string(),
            shift: false,
            ctrl: true,
            alt: false,
            is_up: true,
        }
        .into();
        let encoded = encode(&message, &WamOptions::default());
        assert_eq!(encoded.prop, "13:0:1:0:1");
        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_parameter_value_accepts_text_number() {
        let decoded = decode(&frame("SPVFD", "2", WamData::Text("0.75".into()))).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(
                EngineMessage::ParameterValue {
                    param_idx: 2,
                    value: 0.75
                }
                .into()
            )
        );
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(decode(&frame("LegacyVerb", "1", WamData::None)).unwrap(), Decoded::Unknown);
    }

    #[test]
    fn test_malformed_prop() {
        let err = decode(&frame("SCMFD", "3", WamData::Text("AQID".into()))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageMalformed);

        let err = decode(&frame("SPVFD", "x", WamData::Number(0.5))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageMalformed);

        let err = decode(&frame("SPVFD", "1", WamData::None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageMalformed);
    }

    #[test]
    fn test_bad_payload_is_decode_failure() {
        let err = decode(&frame("SAMFD", "1", WamData::Text("!!!".into()))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailed);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let message: BridgeMessage = EngineMessage::StateDump { data: vec![] }.into();
        let encoded = encode(&message, &WamOptions::default());
        assert_eq!(encoded, frame("SSTATE", "", WamData::None));
        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_sentinel_tag_with_payload_is_not_a_gesture() {
        let decoded = decode(&frame("SAMFUI", "-1:5", WamData::Text("AQID".into()))).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(
                UiMessage::ArbitraryMessage {
                    msg_tag: -1,
                    ctrl_tag: 5,
                    data: vec![1, 2, 3],
                }
                .into()
            )
        );
    }

    #[test]
    fn test_packed_engine_message_with_sentinel_tag_round_trips() {
        let options = WamOptions {
            pack_payloads: true,
            ..WamOptions::default()
        };
        let message: BridgeMessage = EngineMessage::ArbitraryMessage {
            msg_tag: -1,
            data: vec![1, 2, 3],
        }
        .into();

        let encoded = encode(&message, &options);
        assert_eq!(encoded, frame("SAMFD", "-1:AQID", WamData::None));
        assert_eq!(decode(&encoded).unwrap(), Decoded::Message(message));
    }

    #[test]
    fn test_outbound_sentinel_tag_is_refused() {
        let reserved = UiMessage::ArbitraryMessage {
            msg_tag: BEGIN_CHANGE_SENTINEL,
            ctrl_tag: 5,
            data: vec![1, 2, 3],
        };
        assert_eq!(check_outbound(&reserved).unwrap_err().kind(), ErrorKind::MessageMalformed);

        let ordinary = UiMessage::ArbitraryMessage {
            msg_tag: 4,
            ctrl_tag: 5,
            data: vec![],
        };
        assert!(check_outbound(&ordinary).is_ok());
    }

    #[test]
    fn test_decode_uses_configured_chunk_size() {
        let options = WamOptions {
            chunk_size: 3,
            ..WamOptions::default()
        };
        let message: BridgeMessage = EngineMessage::SysexMessage {
            data: (0..100u8).collect(),
        }
        .into();

        let encoded = encode(&message, &options);
        assert_eq!(decode_chunked(&encoded, options.chunk_size).unwrap(), Decoded::Message(message));
    }
}
