//! Host environment detection.
//!
//! The bridge runs either inside a native web view or next to a WAM
//! controller in a browser. A host may announce itself explicitly; without
//! an announcement the type is inferred from what the environment exposes.

use plugwire_core::{BridgeConfig, HostKind};

/// Substrings that identify a host-injected native send function.
pub const NATIVE_BRIDGE_MARKERS: [&str; 4] = [
    "webkit.messageHandlers",
    "chrome.webview",
    "[native code]",
    "IPlugSendMsg",
];

/// Read-only view of the embedding environment.
///
/// Implementations must not fail: an absent API is reported as `None`/`false`.
pub trait HostProbe {
    /// Host type announced at injection time, if any.
    fn announced_host(&self) -> Option<HostKind> {
        None
    }

    /// Serialized source of the native send function, if one is installed.
    fn native_send_source(&self) -> Option<String>;

    /// Whether an AudioWorklet-capable API is available.
    fn has_audio_worklet(&self) -> bool;
}

/// Classify the current host.
pub fn detect(probe: &dyn HostProbe) -> HostKind {
    if let Some(kind) = probe.announced_host() {
        log::debug!("host announced itself as {}", kind);
        return kind;
    }

    let native = probe
        .native_send_source()
        .is_some_and(|source| NATIVE_BRIDGE_MARKERS.iter().any(|m| source.contains(m)));
    let kind = if native {
        HostKind::WebView
    } else if probe.has_audio_worklet() {
        HostKind::Wam
    } else {
        HostKind::WebView
    };

    log::debug!("detected {} host", kind);
    kind
}

/// Host from the configuration, falling back to detection.
pub fn resolve_host(config: &BridgeConfig, probe: &dyn HostProbe) -> HostKind {
    config.host.unwrap_or_else(|| detect(probe))
}

/// A fixed environment description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticProbe {
    pub announced: Option<HostKind>,
    pub native_send_source: Option<String>,
    pub audio_worklet: bool,
}

impl StaticProbe {
    /// An environment exposing nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Environment announcing `kind` explicitly.
    pub fn announcing(kind: HostKind) -> Self {
        Self {
            announced: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_native_send(mut self, source: impl Into<String>) -> Self {
        self.native_send_source = Some(source.into());
        self
    }

    pub fn with_audio_worklet(mut self) -> Self {
        self.audio_worklet = true;
        self
    }
}

impl HostProbe for StaticProbe {
    fn announced_host(&self) -> Option<HostKind> {
        self.announced
    }

    fn native_send_source(&self) -> Option<String> {
        self.native_send_source.clone()
    }

    fn has_audio_worklet(&self) -> bool {
        self.audio_worklet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_environment_defaults_to_webview() {
        assert_eq!(detect(&StaticProbe::empty()), HostKind::WebView);
    }

    #[test]
    fn test_native_marker_wins_over_worklet() {
        let probe = StaticProbe::empty()
            .with_native_send("function IPlugSendMsg() { [native code] }")
            .with_audio_worklet();
        assert_eq!(detect(&probe), HostKind::WebView);
    }

    #[test]
    fn test_plain_send_function_with_worklet_is_wam() {
        let probe = StaticProbe::empty()
            .with_native_send("function (m) { console.log(m) }")
            .with_audio_worklet();
        assert_eq!(detect(&probe), HostKind::Wam);
    }

    #[test]
    fn test_worklet_only_is_wam() {
        assert_eq!(detect(&StaticProbe::empty().with_audio_worklet()), HostKind::Wam);
    }

    #[test]
    fn test_announcement_overrides_heuristic() {
        let probe = StaticProbe::announcing(HostKind::Wam).with_native_send("chrome.webview.postMessage");
        assert_eq!(detect(&probe), HostKind::Wam);
    }

    #[test]
    fn test_config_host_overrides_detection() {
        let config = BridgeConfig::new().with_host(HostKind::Wam);
        assert_eq!(resolve_host(&config, &StaticProbe::empty()), HostKind::Wam);
        assert_eq!(resolve_host(&BridgeConfig::new(), &StaticProbe::empty()), HostKind::WebView);
    }
}
