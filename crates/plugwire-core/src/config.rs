//! Bridge configuration.
//!
//! Host-agnostic settings shared by the transport layers.
//!
//! # Example
//!
//! ```ignore
//! use plugwire_core::{BridgeConfig, HostKind};
//!
//! pub static CONFIG: BridgeConfig = BridgeConfig::new()
//!     .with_host(HostKind::Wam)
//!     .with_packed_wam_payloads();
//! ```

use crate::types::{HostKind, CODEC_CHUNK_SIZE, ERROR_BUFFER_CAPACITY};

/// Session-wide bridge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Host type announced by the embedder.
    ///
    /// When set, environment detection is skipped entirely.
    pub host: Option<HostKind>,

    /// Number of errors retained by the error reporter.
    pub error_capacity: usize,

    /// Chunk size used by the binary codec.
    pub chunk_size: usize,

    /// Pack outbound WAM payloads into the prop string (`"<tags>:<base64>"`)
    /// for controllers that only expose a single string field.
    pub pack_wam_payloads: bool,

    /// Encode begin/end gestures as sentinel arbitrary messages on WAM.
    ///
    /// When false the dedicated `BPCFUI`/`EPCFUI` verbs are sent instead.
    /// Both forms are always accepted inbound.
    pub sentinel_gestures: bool,
}

impl BridgeConfig {
    /// Create a configuration with default values.
    pub const fn new() -> Self {
        Self {
            host: None,
            error_capacity: ERROR_BUFFER_CAPACITY,
            chunk_size: CODEC_CHUNK_SIZE,
            pack_wam_payloads: false,
            sentinel_gestures: true,
        }
    }

    /// Announce the host type explicitly.
    pub const fn with_host(mut self, host: HostKind) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the error ring buffer capacity.
    pub const fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }

    /// Set the codec chunk size.
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Pack WAM payloads into the prop field.
    pub const fn with_packed_wam_payloads(mut self) -> Self {
        self.pack_wam_payloads = true;
        self
    }

    /// Send gestures with the dedicated WAM verbs instead of sentinel tags.
    pub const fn with_native_gesture_verbs(mut self) -> Self {
        self.sentinel_gestures = false;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.host, None);
        assert_eq!(config.error_capacity, 50);
        assert_eq!(config.chunk_size, 8192);
        assert!(!config.pack_wam_payloads);
        assert!(config.sentinel_gestures);
    }

    #[test]
    fn test_builder_chain() {
        const CONFIG: BridgeConfig = BridgeConfig::new()
            .with_host(HostKind::Wam)
            .with_error_capacity(8)
            .with_packed_wam_payloads()
            .with_native_gesture_verbs();

        assert_eq!(CONFIG.host, Some(HostKind::Wam));
        assert_eq!(CONFIG.error_capacity, 8);
        assert!(CONFIG.pack_wam_payloads);
        assert!(!CONFIG.sentinel_gestures);
    }
}
