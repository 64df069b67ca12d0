//! Native entry point of the WebView host.

use plugwire_core::{DeliveryError, HostError, UiMessage};

use crate::envelope::encode_envelope;

/// The function the native application injects into the web view.
///
/// Receives each outbound message as a JSON envelope.
pub trait WebViewHost {
    fn post_message(&self, json: &str) -> Result<(), HostError>;
}

impl<F> WebViewHost for F
where
    F: Fn(&str) -> Result<(), HostError>,
{
    fn post_message(&self, json: &str) -> Result<(), HostError> {
        self(json)
    }
}

/// Encode a message and hand it to the native entry point.
pub fn deliver(host: &dyn WebViewHost, message: &UiMessage) -> Result<(), DeliveryError> {
    let json = encode_envelope(message)?;
    log::trace!("webview -> {}", json);
    host.post_message(&json)?;
    Ok(())
}
