//! Tabular action values and eligibility traces.
//!
//! Both tables are flattened action-major: entry `(s, a)` lives at
//! `a * number_of_states + s`.

use crate::env::EnvironmentShape;
use serde::{Deserialize, Serialize};

/// A lookup table of state-action values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    number_of_states: usize,
    number_of_actions: usize,
    values: Vec<f64>,
}

impl ValueTable {
    /// Creates a table with every entry set to `initial`.
    pub fn filled(shape: &EnvironmentShape, initial: f64) -> Self {
        Self {
            number_of_states: shape.number_of_states,
            number_of_actions: shape.number_of_actions,
            values: vec![initial; shape.table_size()],
        }
    }

    /// Flat index of `(state, action)`.
    pub fn index(&self, state: usize, action: usize) -> usize {
        action * self.number_of_states + state
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[self.index(state, action)]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        let ix = self.index(state, action);
        self.values[ix] = value;
    }

    /// Adds `delta` to `(state, action)`.
    pub fn add(&mut self, state: usize, action: usize, delta: f64) {
        let ix = self.index(state, action);
        self.values[ix] += delta;
    }

    /// `max_a Q(state, a)` over `allowed`, or 0 when `allowed` is empty.
    pub fn max_over(&self, state: usize, allowed: &[usize]) -> f64 {
        allowed
            .iter()
            .map(|&a| self.get(state, a))
            .fold(None, |best: Option<f64>, v| match best {
                Some(b) if b >= v => Some(b),
                _ => Some(v),
            })
            .unwrap_or(0.0)
    }

    /// The values of `allowed` in `state`, in the same order.
    pub fn row(&self, state: usize, allowed: &[usize]) -> Vec<f64> {
        allowed.iter().map(|&a| self.get(state, a)).collect()
    }

    /// Applies `Q += scale * e` element-wise.
    pub fn apply_traces(&mut self, traces: &EligibilityTrace, scale: f64) {
        for (q, e) in self.values.iter_mut().zip(traces.as_slice()) {
            if *e != 0.0 {
                *q += scale * e;
            }
        }
    }

    /// Replaces the whole table. The caller checks the length.
    pub(crate) fn replace(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.values.len());
        self.values = values;
    }

    pub fn number_of_states(&self) -> usize {
        self.number_of_states
    }

    pub fn number_of_actions(&self) -> usize {
        self.number_of_actions
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per state-action credit for the current update.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityTrace {
    number_of_states: usize,
    traces: Vec<f64>,
}

impl EligibilityTrace {
    /// A trace table of zeros.
    pub fn zeros(shape: &EnvironmentShape) -> Self {
        Self {
            number_of_states: shape.number_of_states,
            traces: vec![0.0; shape.table_size()],
        }
    }

    /// Credits `(state, action)`: set to 1 when `replacing`, incremented
    /// otherwise.
    pub fn mark(&mut self, state: usize, action: usize, replacing: bool) {
        let ix = action * self.number_of_states + state;
        if replacing {
            self.traces[ix] = 1.0;
        } else {
            self.traces[ix] += 1.0;
        }
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.traces[action * self.number_of_states + state]
    }

    /// Multiplies every trace by `factor`.
    pub fn decay(&mut self, factor: f64) {
        for e in self.traces.iter_mut() {
            *e *= factor;
        }
    }

    /// Zeros every trace.
    pub fn clear(&mut self) {
        self.traces.iter_mut().for_each(|e| *e = 0.0);
    }

    /// Returns `true` if every trace is zero.
    pub fn is_clear(&self) -> bool {
        self.traces.iter().all(|e| *e == 0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}
