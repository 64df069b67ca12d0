//! # plugwire-core
//!
//! Core abstractions for the Plugwire UI/engine bridge.
//!
//! This crate is host-agnostic: it knows nothing about web views or WAM
//! controllers. The host wire layers (`plugwire-webview`, `plugwire-wam`) and
//! the `plugwire` facade build on it.
//!
//! ## Contents
//!
//! - [`codec`] - chunked base64 for binary payloads
//! - [`protocol`] - canonical [`UiMessage`] / [`EngineMessage`] set and wire tags
//! - [`parameter_range`] - normalization engine (linear, power curve, exponential)
//! - [`descriptor`] - parameter descriptor table loaded at startup
//! - [`parameter_store`] - normalized value cache with per-index listeners
//! - [`feedback`] - engine-push echo suppression
//! - [`gesture`] - begin/end change state machine
//! - [`reporter`] - error taxonomy sink with bounded history
//!
//! ## Threading
//!
//! Everything here runs on one logical thread. Shared handles use `Rc` and
//! interior mutability; no type in this crate is `Send`.

pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod feedback;
pub mod gesture;
pub mod parameter_range;
pub mod parameter_store;
pub mod protocol;
pub mod reporter;
pub mod subscription;
pub mod types;

// Re-exports for convenience
pub use config::BridgeConfig;
pub use descriptor::{DescriptorTable, ParameterDescriptor, ParameterKind, ShapeKind};
pub use error::{
    BridgeError, DeliveryError, DescriptorError, ErrorContext, ErrorKind, HostError, WireError,
    WireResult,
};
pub use feedback::{FeedbackGuard, FeedbackScope};
pub use gesture::{GestureState, GestureTracker};
pub use parameter_range::{
    from_normalized, snap_to_step, to_normalized, to_normalized_step, ParameterShape, RangeMapper,
    ShapedRange, EXP_SAFE_MIN,
};
pub use parameter_store::ParameterStore;
pub use protocol::{
    BridgeMessage, Direction, EngineMessage, MessageTag, UiMessage, BEGIN_CHANGE_SENTINEL,
    END_CHANGE_SENTINEL,
};
pub use reporter::ErrorReporter;
pub use subscription::{ListenerList, Subscription};
pub use types::{
    clamp_normalized, HostKind, NormalizedValue, ParameterId, Tag, CODEC_CHUNK_SIZE,
    ERROR_BUFFER_CAPACITY,
};
