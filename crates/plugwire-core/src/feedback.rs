//! Echo suppression between engine pushes and UI writes.
//!
//! While an engine-originated value is being applied to the parameter store,
//! listeners react to it like any other change and may call back into the UI
//! write path. The [`FeedbackGuard`] marks that window so the write path can
//! skip re-sending the value to the engine.
//!
//! The flag is cleared by a drop guard, so it is reset on every exit from the
//! guarded region, including unwinding.

use std::cell::Cell;
use std::rc::Rc;

/// Shared suppression flag. One per session; clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct FeedbackGuard {
    updating_from_processor: Rc<Cell<bool>>,
}

impl FeedbackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an engine push is currently being applied.
    pub fn is_engaged(&self) -> bool {
        self.updating_from_processor.get()
    }

    /// Engage the guard until the returned scope is dropped.
    ///
    /// Nested scopes restore the state they found.
    pub fn engage(&self) -> FeedbackScope {
        let previous = self.updating_from_processor.replace(true);
        FeedbackScope {
            flag: self.updating_from_processor.clone(),
            previous,
        }
    }

    /// Run `f` with the guard engaged.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.engage();
        f()
    }
}

/// Drop guard returned by [`FeedbackGuard::engage`].
#[must_use = "the guard is released as soon as the scope is dropped"]
#[derive(Debug)]
pub struct FeedbackScope {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for FeedbackScope {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}
