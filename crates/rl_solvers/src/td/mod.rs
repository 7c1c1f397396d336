//! Tabular temporal-difference learning.
//!
//! [`TdSolver`] learns a Q-table over a discrete environment with either
//! rule:
//! - **Q-learning** (off-policy): `Q(s0,a0) += α (r0 + γ max_a Q(s1,a) - Q(s0,a0))`
//! - **SARSA** (on-policy): `Q(s0,a0) += α (r0 + γ Q(s1,a1) - Q(s0,a0))`
//!
//! Optional extras:
//! - eligibility traces (`lambda > 0`), replacing or accumulating
//! - Dyna planning over a [`TransitionModel`], uniform or prioritized sweeping
//! - a smoothed policy table that exploitation samples from
//!
//! ## Example
//!
//! ```rust
//! use rl_solvers::{Environment, TdOptions, TdSolver};
//!
//! struct Corridor;
//!
//! impl Environment for Corridor {
//!     fn number_of_states(&self) -> Option<usize> { Some(5) }
//!     fn number_of_actions(&self) -> Option<usize> { Some(2) }
//!     fn allowed_actions(&self, _state: usize) -> Vec<usize> { vec![0, 1] }
//! }
//!
//! let options = TdOptions::default().with_alpha(0.1).with_epsilon(0.2);
//! let mut solver = TdSolver::with_seed(&Corridor, options, 7).unwrap();
//!
//! let mut state = 0;
//! for _ in 0..100 {
//!     let action = solver.decide(state).unwrap();
//!     state = if action == 1 { (state + 1).min(4) } else { state.saturating_sub(1) };
//!     solver.learn(if state == 4 { 1.0 } else { 0.0 });
//! }
//! assert!(solver.stats().updates > 0);
//! ```

mod model;
mod solver;
mod value_table;

pub use model::{ModelEntry, TransitionModel, PRIORITY_THRESHOLD};
pub use solver::TdSolver;
pub use value_table::{EligibilityTrace, ValueTable};
