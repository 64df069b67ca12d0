//! WAM controller entry point.

use plugwire_core::{DeliveryError, HostError, UiMessage};

use crate::frame::{WamData, WamFrame};
use crate::wire::{check_outbound, encode, WamOptions};

/// The Web-Audio-Module controller's message API.
pub trait WamHost {
    fn send_message(&self, verb: &str, prop: &str, data: &WamData) -> Result<(), HostError>;
}

impl<F> WamHost for F
where
    F: Fn(&str, &str, &WamData) -> Result<(), HostError>,
{
    fn send_message(&self, verb: &str, prop: &str, data: &WamData) -> Result<(), HostError> {
        self(verb, prop, data)
    }
}

/// Encode a message and hand it to the controller.
///
/// Messages the wire cannot carry unambiguously are refused before the host
/// is called.
pub fn deliver(host: &dyn WamHost, message: &UiMessage, options: &WamOptions) -> Result<(), DeliveryError> {
    check_outbound(message)?;
    let WamFrame { verb, prop, data } = encode(&message.clone().into(), options);
    log::trace!("wam -> {} [{}]", verb, prop);
    host.send_message(&verb, &prop, &data)?;
    Ok(())
}
