//! Error types for the bridge.
//!
//! Two layers:
//! - [`WireError`], [`HostError`] and [`DescriptorError`] are ordinary
//!   `Result` errors returned by codecs, host calls and the descriptor loader.
//! - [`BridgeError`] is the record kept by the
//!   [`ErrorReporter`](crate::reporter::ErrorReporter) once a failure has been
//!   recovered from. Its [`ErrorKind`] is the taxonomy surfaced to diagnostics.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::types::ParameterId;

/// Error taxonomy surfaced to diagnostics subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed base64 or binary payload.
    DecodeFailed,
    /// Host API absent, or no handler registered for a tag.
    HandlerMissing,
    /// A handler or host call failed while processing a message.
    HandlerThrew,
    /// Unparsable wire message (bad prop multiplex, wrong arity, ...).
    MessageMalformed,
    /// UI and engine state have diverged.
    StateMismatch,
}

impl ErrorKind {
    /// Taxonomy name as shown to diagnostics surfaces.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DecodeFailed => "DECODE_FAILED",
            Self::HandlerMissing => "HANDLER_MISSING",
            Self::HandlerThrew => "HANDLER_THREW",
            Self::MessageMalformed => "MESSAGE_MALFORMED",
            Self::StateMismatch => "STATE_MISMATCH",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional key/value context attached to a reported error.
pub type ErrorContext = BTreeMap<String, String>;

/// A reported bridge error.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeError {
    /// Taxonomy entry.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Milliseconds since the UNIX epoch at report time.
    pub timestamp: u64,
    /// Additional context (verb, prop, parameter index, ...).
    pub context: Option<ErrorContext>,
}

impl BridgeError {
    /// Create an error stamped with the current time.
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: Option<ErrorContext>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: now_millis(),
            context,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Failure decoding or encoding a wire message.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("malformed prop {prop:?} for {verb}: {reason}")]
    MalformedProp {
        verb: String,
        prop: String,
        reason: String,
    },

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} of {function} is invalid: {reason}")]
    InvalidArgument {
        function: String,
        index: usize,
        reason: String,
    },

    #[error("declared byte length {declared} exceeds payload length {actual}")]
    ByteLength { declared: usize, actual: usize },

    #[error("invalid JSON envelope: {0}")]
    Json(#[from] serde_json::Error),
}

impl WireError {
    /// Taxonomy entry this failure is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBase64(_) => ErrorKind::DecodeFailed,
            _ => ErrorKind::MessageMalformed,
        }
    }

    /// Shorthand for [`WireError::MalformedProp`].
    pub fn prop(verb: &str, prop: &str, reason: impl Into<String>) -> Self {
        Self::MalformedProp {
            verb: verb.to_string(),
            prop: prop.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure raised by a native host entry point.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("host call failed: {0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure handing an outbound message to a host.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Host(#[from] HostError),
}

impl DeliveryError {
    /// Taxonomy entry this failure is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Wire(err) => err.kind(),
            Self::Host(_) => ErrorKind::HandlerThrew,
        }
    }
}

/// Failure loading or validating the parameter descriptor table.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("parameter {id} ({name}): default {default} outside [{min}, {max}]")]
    DefaultOutOfRange {
        id: ParameterId,
        name: String,
        min: f64,
        max: f64,
        default: f64,
    },

    #[error("parameter {id} ({name}): min {min} greater than max {max}")]
    InvertedRange {
        id: ParameterId,
        name: String,
        min: f64,
        max: f64,
    },

    #[error("enum parameter {id} ({name}): max {max} does not match {count} values")]
    EnumMismatch {
        id: ParameterId,
        name: String,
        max: f64,
        count: usize,
    },

    #[error("parameter {id} ({name}): power curve exponent must be positive, got {exponent}")]
    InvalidExponent {
        id: ParameterId,
        name: String,
        exponent: f64,
    },

    #[error("duplicate parameter id {0}")]
    DuplicateId(ParameterId),
}

/// Result type alias for wire operations.
pub type WireResult<T> = Result<T, WireError>;
