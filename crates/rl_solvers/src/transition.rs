//! The sliding window of recent states, actions and rewards.
//!
//! `decide` shifts the window (`s1 -> s0`, `a1 -> a0`) and records the new
//! pick; `learn` records the reward. Only a window in the
//! [`Phase::Learning`] phase with a recorded reward yields a complete
//! [`Transition`] to learn from.

use serde::{Deserialize, Serialize};

/// A complete `(s0, a0, r0, s1, a1)` tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S> {
    /// Previous state.
    pub s0: S,
    /// Action taken in `s0`.
    pub a0: usize,
    /// Reward received for `a0`.
    pub r0: f64,
    /// State reached after `a0`.
    pub s1: S,
    /// Action chosen in `s1`.
    pub a1: usize,
}

impl<S> Transition<S> {
    pub fn new(s0: S, a0: usize, r0: f64, s1: S, a1: usize) -> Self {
        Self { s0, a0, r0, s1, a1 }
    }
}

/// Where a solver is in its decide/learn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing decided since the last reset.
    Idle,
    /// One decision made; there is no previous state yet.
    Observing,
    /// Steady state: both the previous and the current pick are known.
    Learning,
}

#[derive(Debug, Clone, PartialEq)]
enum Window<S> {
    Idle,
    Observing { s1: S, a1: usize },
    Learning { s0: S, a0: usize, s1: S, a1: usize },
}

/// Short-term memory of a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord<S> {
    window: Window<S>,
    r0: Option<f64>,
}

impl<S> Default for TransitionRecord<S> {
    fn default() -> Self {
        Self {
            window: Window::Idle,
            r0: None,
        }
    }
}

impl<S: Clone> TransitionRecord<S> {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record already in the [`Phase::Learning`] phase, e.g. to
    /// resume an interrupted episode.
    pub fn learning(s0: S, a0: usize, r0: f64, s1: S, a1: usize) -> Self {
        Self {
            window: Window::Learning { s0, a0, s1, a1 },
            r0: Some(r0),
        }
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.window = Window::Idle;
        self.r0 = None;
    }

    /// Moves the current pick into the previous slot and records a new one.
    /// The stored reward is kept; it bridges the two picks.
    pub fn shift(&mut self, state: S, action: usize) {
        let window = std::mem::replace(&mut self.window, Window::Idle);
        self.window = match window {
            Window::Idle => Window::Observing {
                s1: state,
                a1: action,
            },
            Window::Observing { s1, a1 } | Window::Learning { s1, a1, .. } => Window::Learning {
                s0: s1,
                a0: a1,
                s1: state,
                a1: action,
            },
        };
    }

    /// Records the latest reward, returning the one it replaces.
    pub fn set_reward(&mut self, reward: f64) -> Option<f64> {
        self.r0.replace(reward)
    }

    /// The complete tuple, if the window holds one.
    pub fn complete(&self) -> Option<Transition<S>> {
        match (&self.window, self.r0) {
            (Window::Learning { s0, a0, s1, a1 }, Some(r0)) => Some(Transition {
                s0: s0.clone(),
                a0: *a0,
                r0,
                s1: s1.clone(),
                a1: *a1,
            }),
            _ => None,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        match self.window {
            Window::Idle => Phase::Idle,
            Window::Observing { .. } => Phase::Observing,
            Window::Learning { .. } => Phase::Learning,
        }
    }

    /// Returns `true` if every field is unset.
    pub fn is_empty(&self) -> bool {
        matches!(self.window, Window::Idle) && self.r0.is_none()
    }

    pub fn s0(&self) -> Option<&S> {
        match &self.window {
            Window::Learning { s0, .. } => Some(s0),
            _ => None,
        }
    }

    pub fn a0(&self) -> Option<usize> {
        match &self.window {
            Window::Learning { a0, .. } => Some(*a0),
            _ => None,
        }
    }

    pub fn r0(&self) -> Option<f64> {
        self.r0
    }

    pub fn s1(&self) -> Option<&S> {
        match &self.window {
            Window::Observing { s1, .. } | Window::Learning { s1, .. } => Some(s1),
            Window::Idle => None,
        }
    }

    pub fn a1(&self) -> Option<usize> {
        match &self.window {
            Window::Observing { a1, .. } | Window::Learning { a1, .. } => Some(*a1),
            Window::Idle => None,
        }
    }
}
