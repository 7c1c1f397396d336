//! The driver-facing surface shared by every solver.

use crate::dqn::{DqnSolver, QFunction};
use crate::error::Result;
use crate::td::TdSolver;
use crate::types::SolverStats;

/// A learner driven by a strict `decide`, act, `learn` loop.
///
/// `State` is what the environment reports each step: a state index for
/// tabular solvers, a feature vector for function approximators.
pub trait Solver {
    type State<'a>;

    /// Reinitialises learned parameters and memories, enabling training.
    fn reset(&mut self);

    /// Picks an action for `state`.
    fn decide(&mut self, state: Self::State<'_>) -> Result<usize>;

    /// Reports the reward of the last action.
    fn learn(&mut self, reward: f64);

    fn training_mode(&self) -> bool;

    fn set_training_mode(&mut self, training: bool);

    fn stats(&self) -> &SolverStats;
}

impl Solver for TdSolver {
    type State<'a> = usize;

    fn reset(&mut self) {
        TdSolver::reset(self)
    }

    fn decide(&mut self, state: usize) -> Result<usize> {
        TdSolver::decide(self, state)
    }

    fn learn(&mut self, reward: f64) {
        TdSolver::learn(self, reward)
    }

    fn training_mode(&self) -> bool {
        TdSolver::training_mode(self)
    }

    fn set_training_mode(&mut self, training: bool) {
        TdSolver::set_training_mode(self, training)
    }

    fn stats(&self) -> &SolverStats {
        TdSolver::stats(self)
    }
}

impl<Q: QFunction> Solver for DqnSolver<Q> {
    type State<'a> = &'a [f64];

    fn reset(&mut self) {
        DqnSolver::reset(self)
    }

    fn decide(&mut self, state: &[f64]) -> Result<usize> {
        DqnSolver::decide(self, state)
    }

    fn learn(&mut self, reward: f64) {
        DqnSolver::learn(self, reward)
    }

    fn training_mode(&self) -> bool {
        DqnSolver::training_mode(self)
    }

    fn set_training_mode(&mut self, training: bool) {
        DqnSolver::set_training_mode(self, training)
    }

    fn stats(&self) -> &SolverStats {
        DqnSolver::stats(self)
    }
}
