//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use rl_solvers::Environment;

/// A discrete environment with the same allowed actions in every state,
/// optionally overridden per state.
#[derive(Debug, Clone)]
pub struct MockEnv {
    states: usize,
    actions: usize,
    allowed: Option<Vec<usize>>,
    terminal: Vec<usize>,
}

impl MockEnv {
    pub fn new(states: usize, actions: usize) -> Self {
        Self {
            states,
            actions,
            allowed: None,
            terminal: Vec::new(),
        }
    }

    /// Restricts every state to `allowed`.
    pub fn with_allowed(mut self, allowed: Vec<usize>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Gives `state` no allowed actions.
    pub fn with_terminal(mut self, state: usize) -> Self {
        self.terminal.push(state);
        self
    }
}

impl Environment for MockEnv {
    fn number_of_states(&self) -> Option<usize> {
        Some(self.states)
    }

    fn number_of_actions(&self) -> Option<usize> {
        Some(self.actions)
    }

    fn allowed_actions(&self, state: usize) -> Vec<usize> {
        if self.terminal.contains(&state) {
            return Vec::new();
        }
        match &self.allowed {
            Some(allowed) => allowed.clone(),
            None => (0..self.actions).collect(),
        }
    }
}

/// An environment that does not report its dimensions.
pub struct UndefinedEnv;

impl Environment for UndefinedEnv {
    fn number_of_states(&self) -> Option<usize> {
        None
    }

    fn number_of_actions(&self) -> Option<usize> {
        None
    }

    fn allowed_actions(&self, _state: usize) -> Vec<usize> {
        Vec::new()
    }
}

/// A one-dimensional walk: action 1 moves right, action 0 moves left.
/// Reaching the last cell pays 1 and restarts at cell 0.
pub struct Corridor {
    pub length: usize,
    pub position: usize,
}

impl Corridor {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            position: 0,
        }
    }

    /// Applies `action` and returns the reward.
    pub fn step(&mut self, action: usize) -> f64 {
        if action == 1 {
            self.position += 1;
        } else {
            self.position = self.position.saturating_sub(1);
        }
        if self.position == self.length - 1 {
            self.position = 0;
            1.0
        } else {
            0.0
        }
    }

    pub fn env(&self) -> MockEnv {
        MockEnv::new(self.length, 2)
    }
}

/// A one-hot feature vector of length `len`.
pub fn one_hot(len: usize, index: usize) -> Vec<f64> {
    let mut v = vec![0.0; len];
    v[index] = 1.0;
    v
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
