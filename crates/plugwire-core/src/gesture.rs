//! Change-gesture lifecycle.
//!
//! Hosts record automation as one continuous move only when value changes
//! are bracketed by begin/end notifications. [`GestureTracker`] holds the
//! `Idle`/`Changing` state for every parameter and decides which bracket
//! messages must be emitted:
//!
//! ```text
//!          begin_change (emits BeginParameterChange)
//!   Idle ─────────────────────────────────────────► Changing
//!    ▲                                                 │
//!    └─────────────────────────────────────────────────┘
//!          end_change (emits EndParameterChange)
//! ```
//!
//! Redundant `begin_change` while `Changing` and `end_change` while `Idle`
//! emit nothing. Value changes are legal in either state; instantaneous
//! controls are expected to bracket their single change themselves.

use std::collections::HashMap;

use crate::protocol::UiMessage;
use crate::types::ParameterId;

/// Gesture state of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Changing,
}

/// Per-parameter gesture state machine.
#[derive(Debug, Default)]
pub struct GestureTracker {
    // Only parameters in the middle of a gesture have an entry.
    active: HashMap<ParameterId, GestureState>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a parameter.
    pub fn state(&self, id: ParameterId) -> GestureState {
        self.active.get(&id).copied().unwrap_or_default()
    }

    /// Whether a gesture is in progress for this parameter.
    pub fn is_changing(&self, id: ParameterId) -> bool {
        self.state(id) == GestureState::Changing
    }

    /// `Idle -> Changing`. Returns the message to emit, if any.
    pub fn begin_change(&mut self, id: ParameterId) -> Option<UiMessage> {
        if self.is_changing(id) {
            return None;
        }
        self.active.insert(id, GestureState::Changing);
        Some(UiMessage::BeginParameterChange { param_idx: id })
    }

    /// `Changing -> Idle`. Returns the message to emit, if any.
    pub fn end_change(&mut self, id: ParameterId) -> Option<UiMessage> {
        self.active
            .remove(&id)
            .map(|_| UiMessage::EndParameterChange { param_idx: id })
    }

    /// Parameters with a gesture in progress.
    pub fn changing(&self) -> impl Iterator<Item = ParameterId> + '_ {
        self.active.keys().copied()
    }
}
