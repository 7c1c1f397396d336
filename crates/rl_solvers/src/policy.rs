//! Action selection shared by both solvers.
//!
//! [`PolicyEngine`] owns the solver's random source and implements
//! epsilon-greedy selection. [`PolicyTable`] stores a per-state distribution
//! over actions; the tabular solver keeps two of them, the uniform random
//! policy computed at reset and the (optionally smoothed) greedy policy.

use crate::env::{ActionSpace, EnvironmentShape};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The outcome of an epsilon-greedy draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A random action.
    Explore(usize),
    /// The best known action.
    Exploit(usize),
}

impl Decision {
    pub fn action(&self) -> usize {
        match self {
            Decision::Explore(a) | Decision::Exploit(a) => *a,
        }
    }

    pub fn explored(&self) -> bool {
        matches!(self, Decision::Explore(_))
    }
}

/// Returns the allowed action with the highest value.
///
/// Ties go to the action listed first in `allowed`. `None` when `allowed` is
/// empty.
pub fn greedy_action<F>(allowed: &[usize], value: F) -> Option<usize>
where
    F: Fn(usize) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    for &action in allowed {
        let v = value(action);
        match best {
            Some((_, best_value)) if v <= best_value => {}
            _ => best = Some((action, v)),
        }
    }
    best.map(|(action, _)| action)
}

/// Epsilon-greedy selection over an injected, seedable random source.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rng: StdRng,
}

impl PolicyEngine {
    /// Creates an engine around an existing generator.
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Creates a reproducible engine.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Creates an engine seeded from the thread-local generator.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_rng(&mut rand::rng()))
    }

    /// Returns `true` with probability `epsilon`.
    pub fn explore(&mut self, epsilon: f64) -> bool {
        epsilon > 0.0 && self.rng.random::<f64>() < epsilon
    }

    /// Picks one of `allowed` uniformly.
    pub fn uniform_choice(&mut self, allowed: &[usize]) -> Option<usize> {
        if allowed.is_empty() {
            return None;
        }
        Some(allowed[self.rng.random_range(0..allowed.len())])
    }

    /// Draws an index with probability proportional to `weights`.
    ///
    /// Falls back to a uniform draw when the weights do not sum to a positive
    /// number.
    pub fn sample_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }

        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return Some(self.rng.random_range(0..weights.len()));
        }

        let mut threshold = self.rng.random::<f64>() * total;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if threshold < w {
                return Some(i);
            }
            threshold -= w;
        }

        // Rounding left us past the end: take the last positive weight.
        weights.iter().rposition(|w| *w > 0.0)
    }

    /// Epsilon-greedy over `allowed`: a uniform random action with
    /// probability `epsilon`, otherwise the greedy one.
    pub fn epsilon_greedy<F>(&mut self, epsilon: f64, allowed: &[usize], value: F) -> Option<Decision>
    where
        F: Fn(usize) -> f64,
    {
        if self.explore(epsilon) {
            self.uniform_choice(allowed).map(Decision::Explore)
        } else {
            greedy_action(allowed, value).map(Decision::Exploit)
        }
    }

    /// Mutable access to the underlying generator, for planners and weight
    /// initialisation.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// A stochastic policy over a discrete state-action space.
///
/// Flattened action-major: entry `(s, a)` lives at `a * number_of_states + s`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    number_of_states: usize,
    number_of_actions: usize,
    probabilities: Vec<f64>,
}

impl PolicyTable {
    /// The uniform random policy: `1 / k` for each of the `k` allowed actions
    /// of a state, 0 for the others.
    pub fn uniform(shape: &EnvironmentShape, actions: &ActionSpace) -> Self {
        let mut table = Self {
            number_of_states: shape.number_of_states,
            number_of_actions: shape.number_of_actions,
            probabilities: vec![0.0; shape.table_size()],
        };

        for state in 0..shape.number_of_states {
            let allowed = actions.allowed(state);
            if allowed.is_empty() {
                continue;
            }
            let p = 1.0 / allowed.len() as f64;
            for &action in allowed {
                let ix = table.index(state, action);
                table.probabilities[ix] = p;
            }
        }

        table
    }

    fn index(&self, state: usize, action: usize) -> usize {
        action * self.number_of_states + state
    }

    /// Probability of `action` in `state`. 0 outside the table.
    pub fn probability(&self, state: usize, action: usize) -> f64 {
        if state >= self.number_of_states || action >= self.number_of_actions {
            return 0.0;
        }
        self.probabilities[self.index(state, action)]
    }

    /// The probabilities of `allowed` in `state`, in the same order.
    pub fn distribution(&self, state: usize, allowed: &[usize]) -> Vec<f64> {
        allowed
            .iter()
            .map(|&action| self.probability(state, action))
            .collect()
    }

    /// Samples an allowed action of `state`.
    pub fn sample(
        &self,
        state: usize,
        allowed: &[usize],
        engine: &mut PolicyEngine,
    ) -> Option<usize> {
        let weights = self.distribution(state, allowed);
        engine.sample_weighted(&weights).map(|i| allowed[i])
    }

    /// Moves the entries of `state` toward the greedy target: `1 / n` for each
    /// of the `n` actions whose value equals the maximum, 0 for the rest.
    ///
    /// `step` of `None` assigns the target outright; `Some(beta)` moves
    /// `beta` of the way there and renormalises.
    pub fn move_toward_greedy(
        &mut self,
        state: usize,
        allowed: &[usize],
        values: &[f64],
        step: Option<f64>,
    ) {
        debug_assert_eq!(allowed.len(), values.len());
        if allowed.is_empty() {
            return;
        }

        let q_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let n_max = values.iter().filter(|v| **v == q_max).count() as f64;

        let mut sum = 0.0;
        for (&action, &value) in allowed.iter().zip(values) {
            let target = if value == q_max { 1.0 / n_max } else { 0.0 };
            let ix = self.index(state, action);
            match step {
                Some(beta) => {
                    self.probabilities[ix] += beta * (target - self.probabilities[ix]);
                    sum += self.probabilities[ix];
                }
                None => self.probabilities[ix] = target,
            }
        }

        if step.is_some() && sum > 0.0 {
            for &action in allowed {
                let ix = self.index(state, action);
                self.probabilities[ix] /= sum;
            }
        }
    }

    /// Flattened probabilities, action-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}
