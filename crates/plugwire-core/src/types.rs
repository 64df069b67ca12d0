//! Common types used throughout the Plugwire bridge.

use std::fmt;

/// Parameter index as carried on the wire (`paramIdx`).
pub type ParameterId = u32;

/// Control or message tag (`ctrlTag` / `msgTag`).
///
/// Signed because the WAM wire reserves negative tags as sentinels.
pub type Tag = i32;

/// Parameter value (normalized 0.0 to 1.0).
pub type NormalizedValue = f64;

/// Capacity of the error ring buffer.
pub const ERROR_BUFFER_CAPACITY: usize = 50;

/// Default codec chunk size in bytes.
///
/// Bounded so that no single host call is handed an oversized argument list.
pub const CODEC_CHUNK_SIZE: usize = 8192;

/// The embedding host the UI runs inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// Native-application web view with an injected send function.
    WebView,
    /// Web-Audio-Module controller in a standard browser.
    Wam,
}

impl HostKind {
    /// Wire name of the host kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WebView => "webview",
            Self::Wam => "wam",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a value into the normalized domain.
///
/// NaN collapses to 0.0 so that a bad host value can never poison the store.
#[inline]
pub fn clamp_normalized(value: f64) -> NormalizedValue {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
