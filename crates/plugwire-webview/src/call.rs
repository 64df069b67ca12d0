//! Native function calls into the web view.
//!
//! The native side drives the UI by calling global functions named after
//! the wire tags, with positional arguments:
//!
//! | Function | Arguments |
//! |---|---|
//! | `SPVFD` | `paramIdx, value` |
//! | `SCVFD` | `ctrlTag, value` |
//! | `SCMFD` | `ctrlTag, msgTag, dataSize, base64` |
//! | `SAMFD` | `msgTag, dataSize, base64` |
//! | `SMMFD` | `statusByte, dataByte1, dataByte2` |
//! | `SSMFD` | `offset, dataSize, base64` |
//! | `SSTATE` | `base64` |
//! | `StartIdleTimer` | none |
//!
//! UI-direction tags use the same positional layout as their JSON envelope
//! fields, which lets an in-process engine loop calls straight back.

use plugwire_core::codec;
use plugwire_core::protocol::apply_declared_length;
use plugwire_core::{
    BridgeMessage, EngineMessage, MessageTag, UiMessage, WireError, WireResult, CODEC_CHUNK_SIZE,
};
use serde_json::{json, Value};

/// One invocation of a host-injected function.
#[derive(Debug, Clone, PartialEq)]
pub struct WebViewCall {
    pub function: String,
    pub args: Vec<Value>,
}

impl WebViewCall {
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

/// Result of decoding a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A canonical message.
    Message(BridgeMessage),
    /// The function is not a known wire tag.
    Unknown,
}

/// Build the call the engine makes to deliver `message` to the UI.
pub fn encode_call(message: &EngineMessage) -> WebViewCall {
    let args = match message {
        EngineMessage::ParameterValue { param_idx, value } => vec![json!(param_idx), json!(value)],
        EngineMessage::ControlValue { ctrl_tag, value } => vec![json!(ctrl_tag), json!(value)],
        EngineMessage::ControlMessage {
            ctrl_tag,
            msg_tag,
            data,
        } => vec![
            json!(ctrl_tag),
            json!(msg_tag),
            json!(data.len()),
            json!(codec::encode(data)),
        ],
        EngineMessage::ArbitraryMessage { msg_tag, data } => {
            vec![json!(msg_tag), json!(data.len()), json!(codec::encode(data))]
        }
        EngineMessage::MidiMessage {
            status,
            data1,
            data2,
        } => vec![json!(status), json!(data1), json!(data2)],
        EngineMessage::SysexMessage { data } => {
            vec![json!(0), json!(data.len()), json!(codec::encode(data))]
        }
        EngineMessage::StateDump { data } => vec![json!(codec::encode(data))],
        EngineMessage::IdleTimerStart => Vec::new(),
    };
    WebViewCall::new(message.tag().as_str(), args)
}

/// Decode a native function call into a canonical message.
pub fn decode_call(call: &WebViewCall) -> WireResult<Decoded> {
    decode_call_chunked(call, CODEC_CHUNK_SIZE)
}

/// Decode a native function call, reading base64 payloads `chunk_size`
/// bytes at a time.
pub fn decode_call_chunked(call: &WebViewCall, chunk_size: usize) -> WireResult<Decoded> {
    let Ok(tag) = call.function.parse::<MessageTag>() else {
        return Ok(Decoded::Unknown);
    };
    let args = Args::new(call, tag, chunk_size)?;

    let message: BridgeMessage = match tag {
        MessageTag::ParameterValue => EngineMessage::ParameterValue {
            param_idx: args.param(0)?,
            value: args.number(1)?,
        }
        .into(),
        MessageTag::ControlValue => EngineMessage::ControlValue {
            ctrl_tag: args.tag(0)?,
            value: args.number(1)?,
        }
        .into(),
        MessageTag::ControlMessage => EngineMessage::ControlMessage {
            ctrl_tag: args.tag(0)?,
            msg_tag: args.tag(1)?,
            data: args.payload(3, Some(2))?,
        }
        .into(),
        MessageTag::Arbitrary => EngineMessage::ArbitraryMessage {
            msg_tag: args.tag(0)?,
            data: args.payload(2, Some(1))?,
        }
        .into(),
        MessageTag::Midi => EngineMessage::MidiMessage {
            status: args.byte(0)?,
            data1: args.byte(1)?,
            data2: args.byte(2)?,
        }
        .into(),
        MessageTag::Sysex => EngineMessage::SysexMessage {
            data: args.payload(2, Some(1))?,
        }
        .into(),
        MessageTag::State => EngineMessage::StateDump {
            data: args.payload(0, None)?,
        }
        .into(),
        MessageTag::StartIdleTimer => EngineMessage::IdleTimerStart.into(),
        MessageTag::UiParameterValue => UiMessage::ParameterValue {
            param_idx: args.param(0)?,
            value: args.number(1)?,
        }
        .into(),
        MessageTag::UiBeginChange => UiMessage::BeginParameterChange {
            param_idx: args.param(0)?,
        }
        .into(),
        MessageTag::UiEndChange => UiMessage::EndParameterChange {
            param_idx: args.param(0)?,
        }
        .into(),
        MessageTag::UiArbitrary => UiMessage::ArbitraryMessage {
            msg_tag: args.tag(0)?,
            ctrl_tag: args.tag(1)?,
            data: args.payload(3, Some(2))?,
        }
        .into(),
        MessageTag::UiMidi => UiMessage::MidiMessage {
            status: args.byte(0)?,
            data1: args.byte(1)?,
            data2: args.byte(2)?,
        }
        .into(),
        MessageTag::UiKeyPress => UiMessage::KeyPress {
            key_code: args.tag(0)?,
            utf8: args.text(1)?.to_string(),
            shift: args.flag(2)?,
            ctrl: args.flag(3)?,
            alt: args.flag(4)?,
            is_up: args.flag(5)?,
        }
        .into(),
        MessageTag::StateRequest => UiMessage::StateSyncRequest.into(),
    };
    Ok(Decoded::Message(message))
}

fn arity(tag: MessageTag) -> usize {
    match tag {
        MessageTag::ParameterValue
        | MessageTag::ControlValue
        | MessageTag::UiParameterValue => 2,
        MessageTag::ControlMessage | MessageTag::UiArbitrary => 4,
        MessageTag::Arbitrary
        | MessageTag::Midi
        | MessageTag::Sysex
        | MessageTag::UiMidi => 3,
        MessageTag::State | MessageTag::UiBeginChange | MessageTag::UiEndChange => 1,
        MessageTag::UiKeyPress => 6,
        MessageTag::StartIdleTimer | MessageTag::StateRequest => 0,
    }
}

/// Typed access to positional call arguments.
struct Args<'a> {
    function: &'a str,
    values: &'a [Value],
    chunk_size: usize,
}

impl<'a> Args<'a> {
    fn new(call: &'a WebViewCall, tag: MessageTag, chunk_size: usize) -> WireResult<Self> {
        let expected = arity(tag);
        if call.args.len() < expected {
            return Err(WireError::Arity {
                function: call.function.clone(),
                expected,
                actual: call.args.len(),
            });
        }
        Ok(Self {
            function: &call.function,
            values: &call.args,
            chunk_size,
        })
    }

    fn invalid(&self, index: usize, reason: &str) -> WireError {
        WireError::InvalidArgument {
            function: self.function.to_string(),
            index,
            reason: reason.to_string(),
        }
    }

    fn number(&self, index: usize) -> WireResult<f64> {
        let value = &self.values[index];
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .filter(|n: &f64| n.is_finite())
            .ok_or_else(|| self.invalid(index, "expected a number"))
    }

    fn integer(&self, index: usize) -> WireResult<i64> {
        let value = &self.values[index];
        value
            .as_i64()
            .or_else(|| {
                self.number(index)
                    .ok()
                    .filter(|n| n.fract() == 0.0)
                    .map(|n| n as i64)
            })
            .ok_or_else(|| self.invalid(index, "expected an integer"))
    }

    fn param(&self, index: usize) -> WireResult<u32> {
        u32::try_from(self.integer(index)?).map_err(|_| self.invalid(index, "parameter index out of range"))
    }

    fn tag(&self, index: usize) -> WireResult<i32> {
        i32::try_from(self.integer(index)?).map_err(|_| self.invalid(index, "tag out of range"))
    }

    fn byte(&self, index: usize) -> WireResult<u8> {
        u8::try_from(self.integer(index)?).map_err(|_| self.invalid(index, "byte out of range"))
    }

    fn length(&self, index: usize) -> WireResult<usize> {
        usize::try_from(self.integer(index)?).map_err(|_| self.invalid(index, "negative length"))
    }

    fn flag(&self, index: usize) -> WireResult<bool> {
        match &self.values[index] {
            Value::Bool(b) => Ok(*b),
            _ => Ok(self.integer(index)? != 0),
        }
    }

    fn text(&self, index: usize) -> WireResult<&'a str> {
        self.values[index]
            .as_str()
            .ok_or_else(|| self.invalid(index, "expected a string"))
    }

    fn payload(&self, index: usize, declared: Option<usize>) -> WireResult<Vec<u8>> {
        let data = codec::decode_chunked(self.text(index)?, self.chunk_size)?;
        match declared {
            Some(length_index) => apply_declared_length(data, self.length(length_index)?),
            None => Ok(data),
        }
    }
}
