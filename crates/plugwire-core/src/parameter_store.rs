//! UI-side parameter value cache.
//!
//! The [`ParameterStore`] keeps the last known normalized value of every
//! parameter together with the listeners (widgets) interested in it. Each
//! index owns its own listener list, so a `set` only touches the listeners of
//! that index regardless of how many parameters exist.
//!
//! # Re-entrancy
//!
//! Listeners are invoked synchronously, after the store has released its
//! internal borrow. A listener that calls [`ParameterStore::set`] on the
//! same index during its own notification therefore recurses into itself.
//! This is not guarded against; listeners must not write back the value they
//! were just given.
//!
//! # Threading
//!
//! The store is a single-threaded handle (`Rc`). Clones share state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::ErrorKind;
use crate::reporter::ErrorReporter;
use crate::subscription::{ListenerList, Subscription};
use crate::types::{clamp_normalized, NormalizedValue, ParameterId};

type ValueListener = dyn Fn(NormalizedValue);

struct StoreEntry {
    value: Option<NormalizedValue>,
    listeners: ListenerList<ValueListener>,
}

impl StoreEntry {
    fn new() -> Self {
        Self {
            value: None,
            listeners: ListenerList::new(),
        }
    }
}

struct StoreInner {
    entries: RefCell<HashMap<ParameterId, StoreEntry>>,
    seeded: Cell<bool>,
    reporter: Option<ErrorReporter>,
}

/// Per-parameter normalized value cache with per-index listeners.
#[derive(Clone)]
pub struct ParameterStore {
    inner: Rc<StoreInner>,
}

impl ParameterStore {
    /// Create an empty store. Listener panics are only logged.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an empty store reporting listener panics as `HANDLER_THREW`.
    pub fn with_reporter(reporter: ErrorReporter) -> Self {
        Self::build(Some(reporter))
    }

    fn build(reporter: Option<ErrorReporter>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                entries: RefCell::new(HashMap::new()),
                seeded: Cell::new(false),
                reporter,
            }),
        }
    }

    /// Current value, or `None` if the parameter was never set or seeded.
    pub fn get(&self, id: ParameterId) -> Option<NormalizedValue> {
        self.inner.entries.borrow().get(&id).and_then(|e| e.value)
    }

    /// Store a value (clamped to 0.0-1.0) and notify that index's listeners.
    ///
    /// Returns the stored value.
    pub fn set(&self, id: ParameterId, value: NormalizedValue) -> NormalizedValue {
        let value = clamp_normalized(value);
        let listeners = {
            let mut entries = self.inner.entries.borrow_mut();
            let entry = entries.entry(id).or_insert_with(StoreEntry::new);
            entry.value = Some(value);
            entry.listeners.snapshot()
        };
        self.notify(id, value, listeners);
        value
    }

    /// Register a listener for one parameter index.
    pub fn subscribe(&self, id: ParameterId, listener: impl Fn(NormalizedValue) + 'static) -> Subscription {
        let listener_id = self
            .inner
            .entries
            .borrow_mut()
            .entry(id)
            .or_insert_with(StoreEntry::new)
            .listeners
            .insert(Rc::new(listener));

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(entry) = inner.entries.borrow_mut().get_mut(&id) {
                    entry.listeners.remove(listener_id);
                }
            }
        })
    }

    /// Bulk-seed values at startup.
    ///
    /// Intended to run once per session. Seeding again overwrites the
    /// previous values. Listeners of seeded indices are notified.
    pub fn initialize_values(&self, values: &HashMap<ParameterId, NormalizedValue>) {
        if self.inner.seeded.replace(true) {
            log::warn!("parameter store seeded more than once; overwriting {} value(s)", values.len());
        }

        let pending: Vec<_> = {
            let mut entries = self.inner.entries.borrow_mut();
            values
                .iter()
                .map(|(&id, &value)| {
                    let value = clamp_normalized(value);
                    let entry = entries.entry(id).or_insert_with(StoreEntry::new);
                    entry.value = Some(value);
                    (id, value, entry.listeners.snapshot())
                })
                .filter(|(_, _, listeners)| !listeners.is_empty())
                .collect()
        };

        for (id, value, listeners) in pending {
            self.notify(id, value, listeners);
        }
    }

    /// Whether [`initialize_values`](Self::initialize_values) has run.
    pub fn is_seeded(&self) -> bool {
        self.inner.seeded.get()
    }

    /// Number of listeners registered for one index.
    pub fn listener_count(&self, id: ParameterId) -> usize {
        self.inner
            .entries
            .borrow()
            .get(&id)
            .map_or(0, |e| e.listeners.len())
    }

    /// Drop every value and listener (end of the UI session).
    pub fn clear(&self) {
        self.inner.entries.borrow_mut().clear();
        self.inner.seeded.set(false);
    }

    fn notify(&self, id: ParameterId, value: NormalizedValue, listeners: Vec<Rc<ValueListener>>) {
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                match &self.inner.reporter {
                    Some(reporter) => reporter.report_with(
                        ErrorKind::HandlerThrew,
                        "parameter listener panicked",
                        &[("paramIdx", id.to_string())],
                    ),
                    None => log::error!("parameter listener for {} panicked", id),
                }
            }
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("parameters", &self.inner.entries.borrow().len())
            .field("seeded", &self.inner.seeded.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unknown_is_none() {
        let store = ParameterStore::new();
        assert_eq!(store.get(3), None);
    }

    #[test]
    fn test_set_clamps() {
        let store = ParameterStore::new();
        assert_eq!(store.set(0, 1.5), 1.0);
        assert_eq!(store.get(0), Some(1.0));
        assert_eq!(store.set(0, -0.2), 0.0);
        assert_eq!(store.set(0, f64::NAN), 0.0);
    }

    #[test]
    fn test_only_matching_index_is_notified() {
        let store = ParameterStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        let _a = store.subscribe(1, move |v| log.borrow_mut().push((1, v)));
        let log = seen.clone();
        let _b = store.subscribe(2, move |v| log.borrow_mut().push((2, v)));

        store.set(2, 0.25);
        assert_eq!(*seen.borrow(), vec![(2, 0.25)]);
    }

    #[test]
    fn test_unsubscribe() {
        let store = ParameterStore::new();
        let count = Rc::new(Cell::new(0));

        let c = count.clone();
        let sub = store.subscribe(0, move |_| c.set(c.get() + 1));
        store.set(0, 0.1);
        assert_eq!(store.listener_count(0), 1);

        sub.unsubscribe();
        store.set(0, 0.2);
        assert_eq!(count.get(), 1);
        assert_eq!(store.listener_count(0), 0);
    }

    #[test]
    fn test_initialize_values_overwrites() {
        let store = ParameterStore::new();
        store.initialize_values(&HashMap::from([(0, 0.5), (1, 0.25)]));
        assert!(store.is_seeded());
        assert_eq!(store.get(1), Some(0.25));

        store.initialize_values(&HashMap::from([(1, 0.75)]));
        assert_eq!(store.get(0), Some(0.5));
        assert_eq!(store.get(1), Some(0.75));
    }

    #[test]
    fn test_seed_notifies_existing_listeners() {
        let store = ParameterStore::new();
        let seen = Rc::new(Cell::new(None));
        let s = seen.clone();
        let _sub = store.subscribe(4, move |v| s.set(Some(v)));

        store.initialize_values(&HashMap::from([(4, 0.4)]));
        assert_eq!(seen.get(), Some(0.4));
    }

    #[test]
    fn test_listener_may_write_other_index() {
        let store = ParameterStore::new();
        let linked = store.clone();
        let _sub = store.subscribe(0, move |v| {
            linked.set(1, 1.0 - v);
        });

        store.set(0, 0.3);
        assert_eq!(store.get(1), Some(0.7));
    }

    #[test]
    fn test_panicking_listener_is_reported() {
        let reporter = ErrorReporter::new();
        let store = ParameterStore::with_reporter(reporter.clone());
        let reached = Rc::new(Cell::new(false));

        let _bad = store.subscribe(0, |_| panic!("widget failed"));
        let r = reached.clone();
        let _good = store.subscribe(0, move |_| r.set(true));

        store.set(0, 0.5);
        assert!(reached.get());
        assert_eq!(reporter.recent()[0].kind, ErrorKind::HandlerThrew);
    }
}
