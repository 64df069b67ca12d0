//! # plugwire-webview
//!
//! WebView host layer for the Plugwire bridge.
//!
//! In this embedding the UI runs inside a web view owned by the native
//! plugin. Traffic is asymmetric:
//!
//! ```text
//! UI ──JSON envelope──► WebViewHost::post_message ──► native engine
//! UI ◄──function call (SPVFD, SCMFD, ...)────────────── native engine
//! ```
//!
//! [`deliver`] serializes canonical [`UiMessage`](plugwire_core::UiMessage)s
//! unchanged into envelopes; [`decode_call`] turns native function calls
//! back into canonical messages.

pub mod call;
pub mod envelope;
pub mod host;

pub use call::{decode_call, decode_call_chunked, encode_call, Decoded, WebViewCall};
pub use envelope::{decode_envelope, encode_envelope};
pub use host::{deliver, WebViewHost};
