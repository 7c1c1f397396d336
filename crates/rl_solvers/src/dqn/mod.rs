//! Deep Q-learning over state feature vectors.
//!
//! [`DqnSolver`] approximates `Q(s, ·)` with a [`QFunction`] (by default the
//! [`Mlp`] network), explores epsilon-greedily, clips rewards and TD errors,
//! and re-learns from a bounded FIFO [`ReplayBuffer`].

mod network;
mod replay;
mod solver;

pub use network::{Mlp, QFunction};
pub use replay::ReplayBuffer;
pub use solver::DqnSolver;
