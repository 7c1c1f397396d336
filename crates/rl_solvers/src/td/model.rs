//! The learned environment model used by the Dyna planner.
//!
//! For every visited state-action the model keeps the most recent
//! `(reward, next_state)` outcome, plus a sweep priority used by
//! prioritized planning.

use crate::env::EnvironmentShape;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Priorities at or below this are treated as zero.
pub const PRIORITY_THRESHOLD: f64 = 1e-5;

/// The last observed outcome of a state-action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub reward: f64,
    pub next_state: usize,
}

/// Deterministic last-observation model over a discrete state-action space.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    number_of_states: usize,
    entries: Vec<Option<ModelEntry>>,
    /// Flat indices of the visited state-actions, in first-visit order.
    seen: Vec<usize>,
    priorities: Vec<f64>,
}

impl TransitionModel {
    pub fn new(shape: &EnvironmentShape) -> Self {
        Self {
            number_of_states: shape.number_of_states,
            entries: vec![None; shape.table_size()],
            seen: Vec::new(),
            priorities: vec![0.0; shape.table_size()],
        }
    }

    fn index(&self, state: usize, action: usize) -> usize {
        action * self.number_of_states + state
    }

    fn split(&self, ix: usize) -> (usize, usize) {
        (ix % self.number_of_states, ix / self.number_of_states)
    }

    /// Records (or overwrites) the outcome of `(state, action)`.
    pub fn record(&mut self, state: usize, action: usize, reward: f64, next_state: usize) {
        let ix = self.index(state, action);
        if self.entries[ix].is_none() {
            self.seen.push(ix);
        }
        self.entries[ix] = Some(ModelEntry { reward, next_state });
    }

    /// The stored outcome of `(state, action)`, if it was ever visited.
    pub fn get(&self, state: usize, action: usize) -> Option<ModelEntry> {
        self.entries.get(self.index(state, action)).copied().flatten()
    }

    /// Number of visited state-actions.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forgets every entry and priority.
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.priorities.iter_mut().for_each(|p| *p = 0.0);
        self.seen.clear();
    }

    /// Picks a visited state-action uniformly.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(usize, usize)> {
        if self.seen.is_empty() {
            return None;
        }
        let ix = self.seen[rng.random_range(0..self.seen.len())];
        Some(self.split(ix))
    }

    /// Adds `magnitude` to the priority of every visited state-action whose
    /// recorded next state is `state`.
    ///
    /// Magnitudes below [`PRIORITY_THRESHOLD`] are ignored.
    pub fn add_priority_for_predecessors(&mut self, state: usize, magnitude: f64) {
        if magnitude < PRIORITY_THRESHOLD {
            return;
        }
        for &ix in &self.seen {
            if let Some(entry) = self.entries[ix] {
                if entry.next_state == state {
                    self.priorities[ix] += magnitude;
                }
            }
        }
    }

    pub fn priority(&self, state: usize, action: usize) -> f64 {
        self.priorities[self.index(state, action)]
    }

    /// Removes and returns up to `n` state-actions with the highest priority
    /// above [`PRIORITY_THRESHOLD`], highest first. Their priority is reset
    /// to zero.
    pub fn take_top_priorities(&mut self, n: usize) -> Vec<(usize, usize)> {
        let mut queued: Vec<usize> = self
            .seen
            .iter()
            .copied()
            .filter(|&ix| self.priorities[ix] > PRIORITY_THRESHOLD)
            .collect();
        queued.sort_by(|a, b| self.priorities[*b].total_cmp(&self.priorities[*a]));
        queued.truncate(n);

        queued
            .into_iter()
            .map(|ix| {
                self.priorities[ix] = 0.0;
                self.split(ix)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> TransitionModel {
        TransitionModel::new(&EnvironmentShape {
            number_of_states: 5,
            number_of_actions: 2,
            width: None,
            height: None,
        })
    }

    #[test]
    fn test_record_overwrites_latest() {
        let mut m = model();
        assert!(m.is_empty());

        m.record(1, 0, 1.0, 2);
        m.record(1, 0, -1.0, 3);
        assert_eq!(m.len(), 1);
        assert_eq!(
            m.get(1, 0),
            Some(ModelEntry {
                reward: -1.0,
                next_state: 3
            })
        );
        assert_eq!(m.get(1, 1), None);
    }

    #[test]
    fn test_sample_uniform_only_returns_visited() {
        let mut m = model();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(m.sample_uniform(&mut rng), None);

        m.record(4, 1, 0.0, 0);
        m.record(2, 0, 0.0, 1);
        for _ in 0..50 {
            let pick = m.sample_uniform(&mut rng).unwrap();
            assert!(pick == (4, 1) || pick == (2, 0));
        }
    }

    #[test]
    fn test_predecessor_priorities() {
        let mut m = model();
        m.record(0, 0, 0.0, 3);
        m.record(1, 1, 0.0, 3);
        m.record(2, 0, 0.0, 4);

        m.add_priority_for_predecessors(3, 0.5);
        m.add_priority_for_predecessors(4, 1e-7);
        assert_eq!(m.priority(0, 0), 0.5);
        assert_eq!(m.priority(1, 1), 0.5);
        assert_eq!(m.priority(2, 0), 0.0);

        m.add_priority_for_predecessors(3, 0.25);
        m.record(3, 1, 0.0, 0);
        m.add_priority_for_predecessors(0, 2.0);

        let top = m.take_top_priorities(2);
        assert_eq!(top, vec![(3, 1), (0, 0)]);
        assert_eq!(m.priority(3, 1), 0.0);
        assert_eq!(m.priority(1, 1), 0.75);

        assert_eq!(m.take_top_priorities(10), vec![(1, 1)]);
        assert!(m.take_top_priorities(10).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut m = model();
        m.record(0, 0, 1.0, 1);
        m.add_priority_for_predecessors(1, 1.0);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.get(0, 0), None);
        assert_eq!(m.priority(0, 0), 0.0);
    }
}
