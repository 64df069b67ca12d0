//! # Plugwire
//!
//! Control-plane bridge between an audio plugin's UI and its processing
//! engine.
//!
//! The same UI code runs inside a native web view or next to a Web Audio
//! Module controller. Plugwire hides the difference: widgets talk to a
//! [`Session`], the session talks to a [`TransportAdapter`], and only the
//! adapter knows which host it is attached to.
//!
//! ## Architecture
//!
//! ```text
//! Widgets (get / set_value / subscribe / begin_change / end_change)
//!        ↓
//! Session (ParameterStore, FeedbackGuard, GestureTracker, ErrorReporter)
//!        ↓
//! TransportAdapter
//!        ↓
//! WebViewHost (JSON envelopes)  |  WamHost (verb, prop, data)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plugwire::prelude::*;
//!
//! static CONFIG: BridgeConfig = BridgeConfig::new();
//!
//! let session = Session::detect(CONFIG, &probe);
//! session.initialize(ProcessorHandle::webview(native_send));
//! session.load_descriptors(DescriptorTable::from_json(DESCRIPTORS)?);
//!
//! // A knob drag
//! session.begin_change(0);
//! session.set_value(0, 0.42);
//! session.end_change(0);
//!
//! // Host callbacks
//! session.handle_host_call(HostCall::WebView(call));
//! ```

pub mod detect;
pub mod session;
pub mod transport;

// Re-export sub-crates
pub use plugwire_core as core;
pub use plugwire_wam as wam;
pub use plugwire_webview as webview;

pub use detect::{detect, resolve_host, HostProbe, StaticProbe, NATIVE_BRIDGE_MARKERS};
pub use session::Session;
pub use transport::{Dispatched, HostCall, ProcessorHandle, TransportAdapter};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use plugwire::prelude::*;
/// ```
pub mod prelude {
    pub use plugwire_core::{
        // Configuration
        BridgeConfig, HostKind,
        // Messages
        BridgeMessage, EngineMessage, MessageTag, UiMessage,
        // Parameters
        DescriptorTable, NormalizedValue, ParameterDescriptor, ParameterId, ParameterKind, ShapeKind, Tag,
        // Normalization
        from_normalized, snap_to_step, to_normalized, to_normalized_step, ParameterShape,
        // Errors
        BridgeError, ErrorKind, ErrorReporter, HostError,
        // Handles
        Subscription,
    };
    pub use plugwire_wam::{WamData, WamFrame, WamHost};
    pub use plugwire_webview::{WebViewCall, WebViewHost};

    pub use crate::{HostCall, HostProbe, ProcessorHandle, Session, StaticProbe};
}
