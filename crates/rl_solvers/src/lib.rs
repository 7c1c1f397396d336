#![doc = include_str!("../README.md")]
//! # rl_solvers - Tabular TD and DQN learning cores
//!
//! Decision and update machinery for single-agent reinforcement learning.
//!
//! ## Overview
//!
//! Two solvers share one driver contract: the caller alternates
//! `decide(state)`, executes the action in its own environment, then
//! `learn(reward)`.
//!
//! - **[`TdSolver`]**: Q-learning or SARSA over a Q-table, with eligibility
//!   traces, a smoothed policy table and Dyna planning (uniform or
//!   prioritized sweeping)
//! - **[`DqnSolver`]**: Q-learning over feature vectors with a small neural
//!   network, epsilon decay, reward and loss clipping, and experience replay
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Solver                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  decide(state)                         learn(reward)        │
//! │       │                                      │              │
//! │  ┌────▼─────────┐   ┌──────────────┐   ┌─────▼──────────┐   │
//! │  │   Policy     │   │  Transition  │   │ Value update   │   │
//! │  │   Engine     │──►│  Record      │──►│ Q-table / net  │   │
//! │  │ ε-greedy     │   │ s0 a0 r0 s1  │   │ traces         │   │
//! │  └──────────────┘   └──────────────┘   └─────┬──────────┘   │
//! │                                              │              │
//! │                          ┌───────────────────┼─────────┐    │
//! │                          │                   │         │    │
//! │                   ┌──────▼───────┐   ┌───────▼──────┐  │    │
//! │                   │  Transition  │   │   Replay     │  │    │
//! │                   │  Model ──►   │   │   Buffer     │  │    │
//! │                   │  Planner     │   │   (DQN)      │  │    │
//! │                   │  (TD)        │   └──────────────┘  │    │
//! │                   └──────────────┘                     │    │
//! │                                                        │    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rl_solvers::{Environment, TdOptions, TdSolver};
//!
//! struct TwoArmedBandit;
//!
//! impl Environment for TwoArmedBandit {
//!     fn number_of_states(&self) -> Option<usize> { Some(1) }
//!     fn number_of_actions(&self) -> Option<usize> { Some(2) }
//!     fn allowed_actions(&self, _state: usize) -> Vec<usize> { vec![0, 1] }
//! }
//!
//! let options = TdOptions::default().with_alpha(0.2).with_gamma(0.0);
//! let mut solver = TdSolver::with_seed(&TwoArmedBandit, options, 42).unwrap();
//!
//! for _ in 0..500 {
//!     let action = solver.decide(0).unwrap();
//!     solver.learn(if action == 1 { 1.0 } else { 0.0 });
//! }
//!
//! solver.set_training_mode(false);
//! assert_eq!(solver.decide(0).unwrap(), 1);
//! ```
//!
//! ## Snapshots
//!
//! ```rust,ignore
//! use rl_solvers::{Snapshot, ValueTableSnapshot};
//!
//! let json = solver.export_values().to_json()?;
//! // ... later
//! solver.import_values(&ValueTableSnapshot::from_json(&json)?)?;
//! ```

pub mod dqn;
pub mod env;
pub mod error;
pub mod options;
pub mod persistence;
pub mod policy;
pub mod solver;
pub mod td;
pub mod transition;
pub mod types;

pub use dqn::{DqnSolver, Mlp, QFunction, ReplayBuffer};
pub use env::{ActionSpace, Environment, EnvironmentShape};
pub use error::{Error, Result};
pub use options::{DqnOptions, PlanningStrategy, TdOptions, UpdateRule};
pub use persistence::{NetworkSnapshot, Snapshot, ValueTableSnapshot};
pub use policy::{greedy_action, Decision, PolicyEngine, PolicyTable};
pub use solver::Solver;
pub use td::{EligibilityTrace, ModelEntry, TdSolver, TransitionModel, ValueTable};
pub use transition::{Phase, Transition, TransitionRecord};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
