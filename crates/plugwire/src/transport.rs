//! Transport adapter.
//!
//! Normalizes outbound sends and inbound host callbacks so that nothing
//! above this layer branches on the host type. Outbound, a canonical
//! [`UiMessage`] is handed unchanged to a web view host or re-expressed as a
//! `(verb, prop, data)` frame for a WAM controller. Inbound, either call form
//! is decoded into the canonical message set.
//!
//! Every failure is reported to the session's [`ErrorReporter`] and the
//! message is dropped. Nothing is queued or retried.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use plugwire_core::{BridgeConfig, BridgeMessage, ErrorKind, ErrorReporter, HostKind, UiMessage};
use plugwire_wam::{WamFrame, WamHost, WamOptions};
use plugwire_webview::{WebViewCall, WebViewHost};

/// The native entry point outbound messages are delivered to.
#[derive(Clone)]
pub enum ProcessorHandle {
    WebView(Rc<dyn WebViewHost>),
    Wam(Rc<dyn WamHost>),
}

impl ProcessorHandle {
    pub fn webview(host: impl WebViewHost + 'static) -> Self {
        Self::WebView(Rc::new(host))
    }

    pub fn wam(host: impl WamHost + 'static) -> Self {
        Self::Wam(Rc::new(host))
    }

    pub fn kind(&self) -> HostKind {
        match self {
            Self::WebView(_) => HostKind::WebView,
            Self::Wam(_) => HostKind::Wam,
        }
    }

    /// Whether both handles refer to the same host object.
    pub fn same_as(&self, other: &ProcessorHandle) -> bool {
        match (self, other) {
            (Self::WebView(a), Self::WebView(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Self::Wam(a), Self::Wam(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl std::fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProcessorHandle").field(&self.kind()).finish()
    }
}

/// One inbound invocation from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// A function call into the web view.
    WebView(WebViewCall),
    /// A JSON envelope posted into the web view (loopback hosts).
    Envelope(String),
    /// A controller `onmessage(verb, prop, data)` callback.
    Wam(WamFrame),
}

impl HostCall {
    /// Function name or verb.
    pub fn name(&self) -> &str {
        match self {
            Self::WebView(call) => &call.function,
            Self::Envelope(_) => "envelope",
            Self::Wam(frame) => &frame.verb,
        }
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// Decoded into a canonical message.
    Message(BridgeMessage),
    /// Not a known tag; for the pass-through handler.
    PassThrough(HostCall),
}

/// Host-agnostic transport for one session.
pub struct TransportAdapter {
    host: HostKind,
    handle: RefCell<Option<ProcessorHandle>>,
    reporter: ErrorReporter,
    wam: WamOptions,
}

impl TransportAdapter {
    pub fn new(host: HostKind, config: &BridgeConfig, reporter: ErrorReporter) -> Self {
        Self {
            host,
            handle: RefCell::new(None),
            reporter,
            wam: WamOptions::from(config),
        }
    }

    /// Host type this adapter was configured for.
    pub fn host(&self) -> HostKind {
        self.host
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.borrow().is_some()
    }

    /// Install the processor handle.
    ///
    /// Installing the same handle again is a no-op. A handle for another host
    /// type, or a second different handle, is rejected with `STATE_MISMATCH`.
    /// Returns whether `handle` is the installed one afterwards.
    pub fn initialize(&self, handle: ProcessorHandle) -> bool {
        if handle.kind() != self.host {
            self.reporter.report_with(
                ErrorKind::StateMismatch,
                "processor handle does not match the detected host",
                &[
                    ("expected", self.host.to_string()),
                    ("actual", handle.kind().to_string()),
                ],
            );
            return false;
        }

        let installed = self.handle.borrow().as_ref().map(|current| current.same_as(&handle));
        match installed {
            Some(true) => true,
            Some(false) => {
                self.reporter.report_with(
                    ErrorKind::StateMismatch,
                    "transport already initialized with another processor handle",
                    &[("host", self.host.to_string())],
                );
                false
            }
            None => {
                log::debug!("transport initialized for {} host", self.host);
                *self.handle.borrow_mut() = Some(handle);
                true
            }
        }
    }

    /// Deliver one message to the engine.
    ///
    /// Returns false if the message was dropped; the reason is reported.
    pub fn send(&self, message: &UiMessage) -> bool {
        let Some(handle) = self.handle.borrow().clone() else {
            self.reporter.report_with(
                ErrorKind::HandlerMissing,
                "no processor handle installed; message dropped",
                &[("tag", message.tag().to_string())],
            );
            return false;
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| match &handle {
            ProcessorHandle::WebView(host) => plugwire_webview::deliver(host.as_ref(), message),
            ProcessorHandle::Wam(host) => plugwire_wam::deliver(host.as_ref(), message, &self.wam),
        }));

        let failure = match outcome {
            Ok(Ok(())) => return true,
            Ok(Err(err)) => (err.kind(), err.to_string()),
            Err(_) => (ErrorKind::HandlerThrew, "host entry point panicked".to_string()),
        };
        self.reporter.report_with(
            failure.0,
            failure.1,
            &[
                ("tag", message.tag().to_string()),
                ("host", handle.kind().to_string()),
            ],
        );
        false
    }

    /// Decode one inbound host callback.
    ///
    /// Returns `None` if the call was malformed; the failure is reported.
    pub fn dispatch(&self, call: HostCall) -> Option<Dispatched> {
        let chunk_size = self.wam.chunk_size;
        let decoded = match &call {
            HostCall::WebView(inner) => plugwire_webview::decode_call_chunked(inner, chunk_size).map(|d| match d {
                plugwire_webview::Decoded::Message(message) => Some(message),
                plugwire_webview::Decoded::Unknown => None,
            }),
            HostCall::Envelope(json) => plugwire_webview::decode_envelope(json).map(Some),
            HostCall::Wam(frame) => plugwire_wam::decode_chunked(frame, chunk_size).map(|d| match d {
                plugwire_wam::Decoded::Message(message) => Some(message),
                plugwire_wam::Decoded::Unknown => None,
            }),
        };

        match decoded {
            Ok(Some(message)) => {
                log::trace!("{} <- {}", self.host, message.tag());
                Some(Dispatched::Message(message))
            }
            Ok(None) => {
                log::debug!("unrecognized host call {:?}, passing through", call.name());
                Some(Dispatched::PassThrough(call))
            }
            Err(err) => {
                let mut context = vec![("call", call.name().to_string())];
                if let HostCall::Wam(frame) = &call {
                    context.push(("prop", frame.prop.clone()));
                }
                self.reporter.report_with(err.kind(), err.to_string(), &context);
                None
            }
        }
    }

    /// Outbound WAM encoding options.
    pub fn wam_options(&self) -> &WamOptions {
        &self.wam
    }
}

impl std::fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("host", &self.host)
            .field("handle", &self.handle.borrow())
            .finish()
    }
}
