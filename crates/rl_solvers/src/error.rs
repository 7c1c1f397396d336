//! Error types for the solvers.

use thiserror::Error;

/// Result type for solver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving a solver.
///
/// Only construction, `decide` and snapshot import are fallible. `learn`,
/// `reset` and `plan` are total over the state the solver owns.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid options or an environment that does not describe its spaces.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tabular state index outside `[0, number_of_states)`.
    #[error("State {state} is out of range (number of states: {number_of_states})")]
    StateOutOfRange {
        state: usize,
        number_of_states: usize,
    },

    /// An action index outside `[0, number_of_actions)`.
    #[error("Action {action} is out of range (number of actions: {number_of_actions})")]
    ActionOutOfRange {
        action: usize,
        number_of_actions: usize,
    },

    /// The environment offers no action in this state.
    #[error("No allowed actions in state {0}")]
    NoAllowedActions(usize),

    /// A state vector or parameter set of the wrong length.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Snapshot (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                Error::Config("alpha must be >= 0".into()),
                "Configuration error: alpha must be >= 0",
            ),
            (
                Error::StateOutOfRange {
                    state: 12,
                    number_of_states: 10,
                },
                "State 12 is out of range (number of states: 10)",
            ),
            (
                Error::ActionOutOfRange {
                    action: 4,
                    number_of_actions: 4,
                },
                "Action 4 is out of range (number of actions: 4)",
            ),
            (Error::NoAllowedActions(3), "No allowed actions in state 3"),
            (
                Error::DimensionMismatch {
                    expected: 10,
                    actual: 3,
                },
                "Dimension mismatch: expected 10, got 3",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(format!("{}", error), expected);
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{invalid}");
        let error: Error = json_result.unwrap_err().into();
        assert!(matches!(error, Error::Serialization(_)));
    }

    #[test]
    fn test_error_is_error_trait() {
        let error = Error::NoAllowedActions(0);
        let _: &dyn std::error::Error = &error;
    }
}
