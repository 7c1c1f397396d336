//! Small data types shared by both solvers.

use serde::{Deserialize, Serialize};

/// A timestamp in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Returns the current timestamp.
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        let micros = (now.timestamp() as u64) * 1_000_000 + (now.timestamp_subsec_micros() as u64);
        Self(micros)
    }
}

/// Counters for monitoring a solver.
///
/// Reset together with the rest of the solver state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Calls to `decide`.
    pub decisions: u64,
    /// Decisions that took the exploration branch.
    pub explorations: u64,
    /// Full updates driven by real experience.
    pub updates: u64,
    /// Simulated updates performed by the Dyna planner.
    pub planning_updates: u64,
    /// Extra gradient steps drawn from the replay buffer.
    pub replay_updates: u64,
}

impl SolverStats {
    /// Fraction of decisions that explored, or 0 when nothing was decided yet.
    pub fn exploration_rate(&self) -> f64 {
        if self.decisions == 0 {
            return 0.0;
        }
        self.explorations as f64 / self.decisions as f64
    }
}
