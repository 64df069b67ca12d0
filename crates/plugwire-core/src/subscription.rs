//! Listener registration handles.

use std::rc::Rc;

/// Handle returned by every `subscribe` call.
///
/// Call [`unsubscribe`](Self::unsubscribe) to remove the listener. Dropping
/// the handle leaves the listener registered.
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a cancellation closure.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that has nothing to remove.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Remove the listener this handle was created for.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Ordered listener list keyed by a monotonically increasing id.
///
/// Shared by the parameter store, the error reporter and the session.
pub struct ListenerList<L: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Rc<L>)>,
}

impl<L: ?Sized> ListenerList<L> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Append a listener, returning its id.
    pub fn insert(&mut self, listener: Rc<L>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Remove the listener `insert` returned `id` for.
    ///
    /// Returns false if it was already gone.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Clone the current listeners so they can be invoked without holding a borrow.
    pub fn snapshot(&self) -> Vec<Rc<L>> {
        self.entries.iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_unsubscribe_runs_cancel_once() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let sub = Subscription::new(move || counter.set(counter.get() + 1));
        sub.unsubscribe();
        assert_eq!(hits.get(), 1);
        Subscription::empty().unsubscribe();
    }

    #[test]
    fn test_listener_list_keeps_insertion_order() {
        let mut list: ListenerList<dyn Fn() -> u32> = ListenerList::new();
        let a = list.insert(Rc::new(|| 1));
        list.insert(Rc::new(|| 2));
        list.insert(Rc::new(|| 3));
        assert!(list.remove(a));
        assert!(!list.remove(a));
        let values: Vec<u32> = list.snapshot().iter().map(|l| l()).collect();
        assert_eq!(values, vec![2, 3]);
        assert_eq!(list.len(), 2);
    }
}
