//! # plugwire-wam
//!
//! Web Audio Module host layer for the Plugwire bridge.
//!
//! A WAM controller exchanges `(verb, prop, data)` triples in both
//! directions. Verbs are the wire tags; `prop` multiplexes the integer
//! identifiers of a message with `:`; binary payloads travel as base64.
//!
//! ```text
//! UI ──(verb, prop, data)──► WamHost::send_message ──► audio worklet
//! UI ◄──(verb, prop, data)── controller onmessage ◄─── audio worklet
//! ```

pub mod frame;
pub mod host;
pub mod multiplex;
pub mod wire;

pub use frame::{WamData, WamFrame};
pub use host::{deliver, WamHost};
pub use wire::{check_outbound, decode, decode_chunked, encode, Decoded, WamOptions};
