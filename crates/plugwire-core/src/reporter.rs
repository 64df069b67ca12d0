//! Error reporter with a bounded history.
//!
//! Every recovered failure in the bridge ends up here. The reporter keeps the
//! most recent errors in a fixed-capacity FIFO (oldest evicted first),
//! synchronously notifies subscribers and writes one diagnostic log line per
//! report.
//!
//! The reporter is a cheap handle: clones share the same buffer and
//! subscriber list.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{BridgeError, ErrorContext, ErrorKind};
use crate::subscription::{ListenerList, Subscription};
use crate::types::ERROR_BUFFER_CAPACITY;

type ErrorHandler = dyn Fn(&BridgeError);

struct ReporterInner {
    capacity: usize,
    buffer: RefCell<VecDeque<BridgeError>>,
    handlers: RefCell<ListenerList<ErrorHandler>>,
}

/// Shared error sink for one bridge session.
#[derive(Clone)]
pub struct ErrorReporter {
    inner: Rc<ReporterInner>,
}

impl ErrorReporter {
    /// Create a reporter with the default capacity (50).
    pub fn new() -> Self {
        Self::with_capacity(ERROR_BUFFER_CAPACITY)
    }

    /// Create a reporter retaining at most `capacity` errors.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Rc::new(ReporterInner {
                capacity,
                buffer: RefCell::new(VecDeque::with_capacity(capacity)),
                handlers: RefCell::new(ListenerList::new()),
            }),
        }
    }

    /// Record an error, notify subscribers and log it.
    pub fn report(&self, kind: ErrorKind, message: impl Into<String>, context: Option<ErrorContext>) {
        let error = BridgeError::new(kind, message, context);
        match &error.context {
            Some(context) => log::warn!("[plugwire] {}: {} {:?}", error.kind, error.message, context),
            None => log::warn!("[plugwire] {}: {}", error.kind, error.message),
        }

        {
            let mut buffer = self.inner.buffer.borrow_mut();
            while buffer.len() >= self.inner.capacity {
                buffer.pop_front();
            }
            buffer.push_back(error.clone());
        }

        let handlers = self.inner.handlers.borrow().snapshot();
        for handler in handlers {
            // A failing diagnostics surface must not stop the others. Reporting
            // the failure here would recurse, so it is only logged.
            if catch_unwind(AssertUnwindSafe(|| handler(&error))).is_err() {
                log::error!("[plugwire] error subscriber panicked while handling {}", error.kind);
            }
        }
    }

    /// Shorthand for reports with `(key, value)` context pairs.
    pub fn report_with(&self, kind: ErrorKind, message: impl Into<String>, context: &[(&str, String)]) {
        let context: ErrorContext = context
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        self.report(kind, message, Some(context));
    }

    /// Register a handler called synchronously for every report.
    pub fn subscribe(&self, handler: impl Fn(&BridgeError) + 'static) -> Subscription {
        let id = self.inner.handlers.borrow_mut().insert(Rc::new(handler));
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handlers.borrow_mut().remove(id);
            }
        })
    }

    /// Copy of the retained errors, oldest first.
    pub fn recent(&self) -> Vec<BridgeError> {
        self.inner.buffer.borrow().iter().cloned().collect()
    }

    /// Drop all retained errors.
    pub fn clear(&self) {
        self.inner.buffer.borrow_mut().clear();
    }

    /// Buffer capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.inner.buffer.borrow().len())
            .field("subscribers", &self.inner.handlers.borrow().len())
            .finish()
    }
}
