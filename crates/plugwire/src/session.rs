//! Bridge session.
//!
//! A [`Session`] is the single context object of one running plugin UI. It
//! owns the transport, the feedback guard, the parameter store, the gesture
//! tracker and the error reporter. There are no globals, so several sessions
//! can live side by side (one per plugin instance, or one per test).
//!
//! Widgets only need [`get`](Session::get), [`set_value`](Session::set_value),
//! [`subscribe`](Session::subscribe), [`begin_change`](Session::begin_change)
//! and [`end_change`](Session::end_change). Host callbacks enter through
//! [`handle_host_call`](Session::handle_host_call).

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use plugwire_core::{
    BridgeConfig, BridgeMessage, DescriptorTable, EngineMessage, ErrorKind, ErrorReporter, FeedbackGuard,
    GestureTracker, HostKind, ListenerList, MessageTag, NormalizedValue, ParameterId, ParameterStore,
    Subscription, Tag, UiMessage,
};

use crate::detect::{resolve_host, HostProbe};
use crate::transport::{Dispatched, HostCall, ProcessorHandle, TransportAdapter};

type MessageListener = dyn Fn(&BridgeMessage);
type PassThroughHandler = dyn Fn(&HostCall);

/// One UI/engine bridge.
pub struct Session {
    config: BridgeConfig,
    reporter: ErrorReporter,
    transport: TransportAdapter,
    store: ParameterStore,
    guard: FeedbackGuard,
    gestures: RefCell<GestureTracker>,
    descriptors: RefCell<Option<Rc<DescriptorTable>>>,
    listeners: Rc<RefCell<ListenerList<MessageListener>>>,
    tag_listeners: Rc<RefCell<HashMap<MessageTag, ListenerList<MessageListener>>>>,
    passthrough: Rc<RefCell<ListenerList<PassThroughHandler>>>,
}

impl Session {
    /// Create a session for a known host type.
    pub fn new(config: BridgeConfig, host: HostKind) -> Self {
        let reporter = ErrorReporter::with_capacity(config.error_capacity);
        Self {
            transport: TransportAdapter::new(host, &config, reporter.clone()),
            store: ParameterStore::with_reporter(reporter.clone()),
            guard: FeedbackGuard::new(),
            gestures: RefCell::new(GestureTracker::new()),
            descriptors: RefCell::new(None),
            listeners: Rc::new(RefCell::new(ListenerList::new())),
            tag_listeners: Rc::new(RefCell::new(HashMap::new())),
            passthrough: Rc::new(RefCell::new(ListenerList::new())),
            reporter,
            config,
        }
    }

    /// Create a session, taking the host from `config` or detecting it.
    pub fn detect(config: BridgeConfig, probe: &dyn HostProbe) -> Self {
        let host = resolve_host(&config, probe);
        Self::new(config, host)
    }

    /// Install the processor handle. See [`TransportAdapter::initialize`].
    pub fn initialize(&self, handle: ProcessorHandle) -> bool {
        self.transport.initialize(handle)
    }

    pub fn host(&self) -> HostKind {
        self.transport.host()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn guard(&self) -> &FeedbackGuard {
        &self.guard
    }

    pub fn transport(&self) -> &TransportAdapter {
        &self.transport
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    /// Install the descriptor table and seed the store with its defaults.
    pub fn load_descriptors(&self, table: DescriptorTable) -> Rc<DescriptorTable> {
        let table = Rc::new(table);
        if self.descriptors.replace(Some(table.clone())).is_some() {
            log::warn!("descriptor table replaced");
        }
        log::debug!("loaded {} parameter descriptor(s)", table.len());
        self.store.initialize_values(&table.seed_values());
        table
    }

    pub fn descriptors(&self) -> Option<Rc<DescriptorTable>> {
        self.descriptors.borrow().clone()
    }

    // =========================================================================
    // Widget surface
    // =========================================================================

    /// Last known normalized value.
    pub fn get(&self, id: ParameterId) -> Option<NormalizedValue> {
        self.store.get(id)
    }

    /// Store a UI value and send it to the engine.
    ///
    /// The store is always updated. Nothing is sent while an engine push is
    /// being applied.
    pub fn set_value(&self, id: ParameterId, value: NormalizedValue) {
        let value = self.store.set(id, value);
        if self.guard.is_engaged() {
            log::trace!("suppressed echo of parameter {}", id);
            return;
        }
        self.transport.send(&UiMessage::ParameterValue { param_idx: id, value });
    }

    /// Listen for value changes of one parameter.
    pub fn subscribe(&self, id: ParameterId, listener: impl Fn(NormalizedValue) + 'static) -> Subscription {
        self.store.subscribe(id, listener)
    }

    /// Start a gesture. Sends `BeginParameterChange` unless one is active.
    pub fn begin_change(&self, id: ParameterId) {
        let message = self.gestures.borrow_mut().begin_change(id);
        if let Some(message) = message {
            self.transport.send(&message);
        }
    }

    /// Finish a gesture. Sends `EndParameterChange` if one is active.
    pub fn end_change(&self, id: ParameterId) {
        let message = self.gestures.borrow_mut().end_change(id);
        if let Some(message) = message {
            self.transport.send(&message);
        }
    }

    pub fn is_changing(&self, id: ParameterId) -> bool {
        self.gestures.borrow().is_changing(id)
    }

    // =========================================================================
    // Other outbound messages
    // =========================================================================

    /// Send any canonical message unchanged.
    pub fn send(&self, message: &UiMessage) -> bool {
        self.transport.send(message)
    }

    pub fn send_arbitrary(&self, msg_tag: Tag, ctrl_tag: Tag, data: Vec<u8>) -> bool {
        self.send(&UiMessage::ArbitraryMessage {
            msg_tag,
            ctrl_tag,
            data,
        })
    }

    pub fn send_midi(&self, status: u8, data1: u8, data2: u8) -> bool {
        self.send(&UiMessage::MidiMessage { status, data1, data2 })
    }

    pub fn send_key_press(&self, key_code: i32, utf8: &str, shift: bool, ctrl: bool, alt: bool, is_up: bool) -> bool {
        self.send(&UiMessage::KeyPress {
            key_code,
            utf8: utf8.to_string(),
            shift,
            ctrl,
            alt,
            is_up,
        })
    }

    /// Ask the engine for a full state dump.
    pub fn request_state_sync(&self) -> bool {
        self.send(&UiMessage::StateSyncRequest)
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Listen for every decoded inbound message.
    pub fn on_message(&self, listener: impl Fn(&BridgeMessage) + 'static) -> Subscription {
        let id = self.listeners.borrow_mut().insert(Rc::new(listener));
        let weak = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.borrow_mut().remove(id);
            }
        })
    }

    /// Listen for inbound messages with one wire tag.
    pub fn on(&self, tag: MessageTag, listener: impl Fn(&BridgeMessage) + 'static) -> Subscription {
        let id = self
            .tag_listeners
            .borrow_mut()
            .entry(tag)
            .or_default()
            .insert(Rc::new(listener));
        let weak = Rc::downgrade(&self.tag_listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                if let Some(list) = listeners.borrow_mut().get_mut(&tag) {
                    list.remove(id);
                }
            }
        })
    }

    /// Handle host calls whose tag is not part of the protocol.
    pub fn on_passthrough(&self, handler: impl Fn(&HostCall) + 'static) -> Subscription {
        let id = self.passthrough.borrow_mut().insert(Rc::new(handler));
        let weak = Rc::downgrade(&self.passthrough);
        Subscription::new(move || {
            if let Some(handlers) = weak.upgrade() {
                handlers.borrow_mut().remove(id);
            }
        })
    }

    /// Entry point for every host callback.
    pub fn handle_host_call(&self, call: HostCall) {
        match self.transport.dispatch(call) {
            Some(Dispatched::Message(message)) => self.apply(message),
            Some(Dispatched::PassThrough(call)) => self.pass_through(&call),
            None => {}
        }
    }

    /// Apply a decoded inbound message.
    ///
    /// Engine parameter values are written to the store with the feedback
    /// guard engaged, so listeners reacting to them do not echo the value
    /// back. Every other message is delivered unguarded.
    pub fn apply(&self, message: BridgeMessage) {
        if let BridgeMessage::ToUi(EngineMessage::ParameterValue { param_idx, value }) = &message {
            if !self.is_known_parameter(*param_idx) {
                self.reporter.report_with(
                    ErrorKind::StateMismatch,
                    "engine pushed a value for an unknown parameter",
                    &[("paramIdx", param_idx.to_string())],
                );
                return;
            }

            let _scope = self.guard.engage();
            self.store.set(*param_idx, *value);
            self.notify(&message);
            return;
        }

        self.notify(&message);
    }

    /// Apply an engine-originated parameter value.
    pub fn apply_engine_value(&self, id: ParameterId, value: NormalizedValue) {
        self.apply(EngineMessage::ParameterValue { param_idx: id, value }.into());
    }

    /// End the UI session.
    ///
    /// Open gestures are closed so the host does not keep recording, then
    /// all values and widget listeners are dropped.
    pub fn close(&self) {
        let open: Vec<ParameterId> = self.gestures.borrow().changing().collect();
        for id in open {
            self.end_change(id);
        }
        self.store.clear();
    }

    fn is_known_parameter(&self, id: ParameterId) -> bool {
        self.descriptors
            .borrow()
            .as_ref()
            .map_or(true, |table| table.contains(id))
    }

    fn notify(&self, message: &BridgeMessage) {
        let tag = message.tag();
        let mut listeners = self
            .tag_listeners
            .borrow()
            .get(&tag)
            .map(|list| list.snapshot())
            .unwrap_or_default();
        listeners.extend(self.listeners.borrow().snapshot());

        let consumed_by_store = matches!(message, BridgeMessage::ToUi(EngineMessage::ParameterValue { .. }));
        if listeners.is_empty() && !consumed_by_store {
            self.reporter.report_with(
                ErrorKind::HandlerMissing,
                "no listener registered for inbound message",
                &[("tag", tag.to_string())],
            );
            return;
        }

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
                self.reporter.report_with(
                    ErrorKind::HandlerThrew,
                    "message listener panicked",
                    &[("tag", tag.to_string())],
                );
            }
        }
    }

    fn pass_through(&self, call: &HostCall) {
        let handlers = self.passthrough.borrow().snapshot();
        if handlers.is_empty() {
            self.reporter.report_with(
                ErrorKind::HandlerMissing,
                "no pass-through handler for unrecognized host call",
                &[("call", call.name().to_string())],
            );
            return;
        }
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(call))).is_err() {
                self.reporter.report_with(
                    ErrorKind::HandlerThrew,
                    "pass-through handler panicked",
                    &[("call", call.name().to_string())],
                );
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host())
            .field("transport", &self.transport)
            .field("store", &self.store)
            .field("reporter", &self.reporter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugwire_core::{HostError, ParameterDescriptor};
    use plugwire_wam::{WamData, WamFrame};
    use plugwire_webview::WebViewCall;
    use serde_json::{json, Value};
    use std::cell::Cell;

    /// Session on a web view host recording every outbound envelope.
    fn webview_session() -> (Session, Rc<RefCell<Vec<Value>>>) {
        let session = Session::new(BridgeConfig::new(), HostKind::WebView);
        let sent = Rc::new(RefCell::new(Vec::new()));
        let log = sent.clone();
        session.initialize(ProcessorHandle::webview(move |json: &str| -> Result<(), HostError> {
            let value: Value = serde_json::from_str(json).map_err(|e| HostError::new(e.to_string()))?;
            log.borrow_mut().push(value);
            Ok(())
        }));
        (session, sent)
    }

    fn wam_session() -> (Session, Rc<RefCell<Vec<WamFrame>>>) {
        let session = Session::new(BridgeConfig::new(), HostKind::Wam);
        let sent = Rc::new(RefCell::new(Vec::new()));
        let log = sent.clone();
        session.initialize(ProcessorHandle::wam(
            move |verb: &str, prop: &str, data: &WamData| -> Result<(), HostError> {
                log.borrow_mut().push(WamFrame::new(verb, prop, data.clone()));
                Ok(())
            },
        ));
        (session, sent)
    }

    #[test]
    fn test_gesture_bracketing_order() {
        let (session, sent) = webview_session();

        session.begin_change(4);
        session.set_value(4, 0.3);
        session.begin_change(4);
        session.set_value(4, 0.6);
        session.end_change(4);
        session.end_change(4);

        assert_eq!(
            *sent.borrow(),
            vec![
                json!({"msg": "BPCFUI", "paramIdx": 4}),
                json!({"msg": "SPVFUI", "paramIdx": 4, "value": 0.3}),
                json!({"msg": "SPVFUI", "paramIdx": 4, "value": 0.6}),
                json!({"msg": "EPCFUI", "paramIdx": 4}),
            ]
        );
        assert!(!session.is_changing(4));
    }

    #[test]
    fn test_wam_gestures_use_sentinels() {
        let (session, sent) = wam_session();

        session.begin_change(5);
        session.end_change(5);

        assert_eq!(
            *sent.borrow(),
            vec![
                WamFrame::new("SAMFUI", "-1:5", WamData::None),
                WamFrame::new("SAMFUI", "-2:5", WamData::None),
            ]
        );
    }

    #[test]
    fn test_engine_push_is_not_echoed() {
        let (session, sent) = webview_session();

        // Mirrors every engine value onto a linked index while it is applied.
        let store = session.store().clone();
        let guard = session.guard().clone();
        let _mirror = session.on_message(move |message| {
            if let BridgeMessage::ToUi(EngineMessage::ParameterValue { param_idx, value }) = message {
                assert!(guard.is_engaged());
                store.set(*param_idx + 100, *value);
            }
        });

        session.apply_engine_value(2, 0.75);

        assert_eq!(session.get(2), Some(0.75));
        assert_eq!(session.get(102), Some(0.75));
        assert!(sent.borrow().is_empty());
        assert!(!session.guard().is_engaged());
    }

    #[test]
    fn test_set_value_inside_engine_push_is_suppressed() {
        let session = Rc::new(webview_session());
        let (weak, sent) = (Rc::downgrade(&session), session.1.clone());

        let _echo = session.0.on_message(move |message| {
            if let (Some(session), BridgeMessage::ToUi(EngineMessage::ParameterValue { value, .. })) =
                (weak.upgrade(), message)
            {
                session.0.set_value(9, *value);
            }
        });

        session.0.apply_engine_value(2, 0.75);

        assert_eq!(session.0.get(9), Some(0.75));
        assert!(sent.borrow().is_empty());

        session.0.set_value(9, 0.5);
        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn test_guard_released_after_panicking_listener() {
        let (session, _) = webview_session();
        let _bad = session.subscribe(1, |_| panic!("widget failed"));

        session.apply_engine_value(1, 0.2);

        assert!(!session.guard().is_engaged());
        assert_eq!(session.get(1), Some(0.2));
        assert_eq!(session.reporter().recent()[0].kind, ErrorKind::HandlerThrew);
    }

    #[test]
    fn test_send_without_handle_is_reported() {
        let session = Session::new(BridgeConfig::new(), HostKind::WebView);
        session.set_value(0, 0.5);

        assert_eq!(session.get(0), Some(0.5));
        assert_eq!(session.reporter().recent()[0].kind, ErrorKind::HandlerMissing);
    }

    #[test]
    fn test_webview_call_updates_store() {
        let (session, sent) = webview_session();
        let seen = Rc::new(Cell::new(None));
        let s = seen.clone();
        let _sub = session.subscribe(3, move |v| s.set(Some(v)));

        session.handle_host_call(HostCall::WebView(WebViewCall::new("SPVFD", vec![json!(3), json!(0.4)])));

        assert_eq!(seen.get(), Some(0.4));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn test_sentinel_frame_surfaces_as_begin_change() {
        let (session, _) = wam_session();
        let received = Rc::new(RefCell::new(Vec::new()));
        let log = received.clone();
        let _sub = session.on_message(move |m| log.borrow_mut().push(m.clone()));

        session.handle_host_call(HostCall::Wam(WamFrame::new("SAMFD", "-1:5", WamData::None)));

        assert_eq!(
            *received.borrow(),
            vec![BridgeMessage::ToEngine(UiMessage::BeginParameterChange { param_idx: 5 })]
        );
    }

    #[test]
    fn test_unknown_parameter_is_state_mismatch() {
        let (session, _) = webview_session();
        let table = DescriptorTable::new(vec![ParameterDescriptor::new(0, "Gain", -60.0, 12.0, 0.0)]).unwrap();
        session.load_descriptors(table);

        session.apply_engine_value(7, 0.5);

        assert_eq!(session.get(7), None);
        assert_eq!(session.reporter().recent()[0].kind, ErrorKind::StateMismatch);
    }

    #[test]
    fn test_load_descriptors_seeds_defaults() {
        let (session, _) = webview_session();
        let table = DescriptorTable::new(vec![
            ParameterDescriptor::new(0, "Mix", 0.0, 100.0, 25.0),
            ParameterDescriptor::toggle(1, "Bypass", true),
        ])
        .unwrap();
        session.load_descriptors(table);

        assert!((session.get(0).unwrap() - 0.25).abs() < 1e-9);
        assert_eq!(session.get(1), Some(1.0));
        assert!(session.store().is_seeded());
    }

    #[test]
    fn test_unknown_verb_goes_to_passthrough() {
        let (session, _) = wam_session();
        let call = HostCall::Wam(WamFrame::new("SETPRESET", "2", WamData::None));

        session.handle_host_call(call.clone());
        assert_eq!(session.reporter().recent()[0].kind, ErrorKind::HandlerMissing);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let _sub = session.on_passthrough(move |c| log.borrow_mut().push(c.clone()));
        session.handle_host_call(call.clone());
        assert_eq!(*seen.borrow(), vec![call]);
    }

    #[test]
    fn test_close_ends_open_gestures() {
        let (session, sent) = webview_session();
        session.begin_change(1);
        session.close();

        assert_eq!(sent.borrow().last(), Some(&json!({"msg": "EPCFUI", "paramIdx": 1})));
        assert_eq!(session.get(1), None);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let (first, _) = webview_session();
        let (second, _) = webview_session();

        let _scope = first.guard().engage();
        assert!(first.guard().is_engaged());
        assert!(!second.guard().is_engaged());
    }

    #[test]
    fn test_control_value_listener_can_write_parameters() {
        let session = Rc::new(webview_session());
        let (weak, sent) = (Rc::downgrade(&session), session.1.clone());

        let _sub = session.0.on(MessageTag::ControlValue, move |_| {
            if let Some(session) = weak.upgrade() {
                assert!(!session.0.guard().is_engaged());
                session.0.set_value(4, 0.9);
            }
        });

        session
            .0
            .handle_host_call(HostCall::WebView(WebViewCall::new("SCVFD", vec![json!(1), json!(0.5)])));

        assert_eq!(session.0.get(4), Some(0.9));
        assert_eq!(
            *sent.borrow(),
            vec![json!({"msg": "SPVFUI", "paramIdx": 4, "value": 0.9})]
        );
    }

    #[test]
    fn test_unhandled_message_is_reported() {
        let (session, _) = wam_session();

        session.handle_host_call(HostCall::Wam(WamFrame::new("SCMFD", "3:7", WamData::Text("AQID".into()))));

        let errors = session.reporter().recent();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::HandlerMissing);
        assert_eq!(errors[0].context.as_ref().unwrap()["tag"], "SCMFD");
    }

    #[test]
    fn test_parameter_value_needs_no_listener() {
        let (session, _) = wam_session();

        session.handle_host_call(HostCall::Wam(WamFrame::new("SPVFD", "2", WamData::Number(0.3))));

        assert_eq!(session.get(2), Some(0.3));
        assert!(session.reporter().recent().is_empty());
    }

    #[test]
    fn test_tag_listener_only_sees_its_tag() {
        let (session, _) = wam_session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sub = session.on(MessageTag::Midi, move |m| log.borrow_mut().push(m.tag()));

        session.handle_host_call(HostCall::Wam(WamFrame::new("SMMFD", "144:60:100", WamData::None)));
        session.handle_host_call(HostCall::Wam(WamFrame::new("StartIdleTimer", "", WamData::None)));

        assert_eq!(*seen.borrow(), vec![MessageTag::Midi]);
        assert_eq!(session.reporter().recent()[0].context.as_ref().unwrap()["tag"], "StartIdleTimer");

        sub.unsubscribe();
        session.handle_host_call(HostCall::Wam(WamFrame::new("SMMFD", "144:60:0", WamData::None)));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(session.reporter().recent().len(), 2);
    }
}
