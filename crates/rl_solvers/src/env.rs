//! The environment capability consumed by the solvers.
//!
//! Solvers never hold on to an environment. It is queried once at
//! construction, validated, and turned into an [`EnvironmentShape`] (plus, for
//! the tabular solver, an [`ActionSpace`]).

use crate::error::{Error, Result};

/// What a solver needs to know about the world it acts in.
///
/// Concrete environments (grid worlds, games, simulators) live outside this
/// crate and implement this trait. Test doubles implement it too.
pub trait Environment {
    /// Number of discrete states for tabular solvers, or the length of the
    /// state feature vector for function-approximation solvers.
    ///
    /// `None` means the environment does not define it, which is a
    /// configuration error.
    fn number_of_states(&self) -> Option<usize>;

    /// Number of discrete actions.
    fn number_of_actions(&self) -> Option<usize>;

    /// The action indices available in `state`.
    fn allowed_actions(&self, state: usize) -> Vec<usize>;

    /// Grid width, for spatial environments.
    fn width(&self) -> Option<usize> {
        None
    }

    /// Grid height, for spatial environments.
    fn height(&self) -> Option<usize> {
        None
    }
}

/// The validated dimensions of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentShape {
    pub number_of_states: usize,
    pub number_of_actions: usize,
    pub width: Option<usize>,
    pub height: Option<usize>,
}

impl EnvironmentShape {
    /// Reads and validates the dimensions of `env`.
    ///
    /// Fails with [`Error::Config`] when either count is undefined or zero.
    pub fn resolve<E: Environment + ?Sized>(env: &E) -> Result<Self> {
        let number_of_states = env
            .number_of_states()
            .ok_or_else(|| Error::Config("environment does not define numberOfStates".into()))?;
        let number_of_actions = env
            .number_of_actions()
            .ok_or_else(|| Error::Config("environment does not define numberOfActions".into()))?;

        if number_of_states == 0 {
            return Err(Error::Config("numberOfStates must be greater than 0".into()));
        }
        if number_of_actions == 0 {
            return Err(Error::Config("numberOfActions must be greater than 0".into()));
        }

        Ok(Self {
            number_of_states,
            number_of_actions,
            width: env.width(),
            height: env.height(),
        })
    }

    /// Size of a flattened state-action table.
    pub fn table_size(&self) -> usize {
        self.number_of_states * self.number_of_actions
    }

    /// Checks a tabular state index.
    pub fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.number_of_states {
            return Err(Error::StateOutOfRange {
                state,
                number_of_states: self.number_of_states,
            });
        }
        Ok(())
    }

    /// Checks an action index.
    pub fn check_action(&self, action: usize) -> Result<()> {
        if action >= self.number_of_actions {
            return Err(Error::ActionOutOfRange {
                action,
                number_of_actions: self.number_of_actions,
            });
        }
        Ok(())
    }
}

/// The allowed actions of every state, captured once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpace {
    allowed: Vec<Vec<usize>>,
}

impl ActionSpace {
    /// Captures `allowed_actions` for every state of `env`.
    ///
    /// Action indices are deduplicated in first-seen order. An index outside
    /// the action range is a configuration error; a state with no actions is
    /// tolerated (terminal states) and only logged.
    pub fn resolve<E: Environment + ?Sized>(env: &E, shape: &EnvironmentShape) -> Result<Self> {
        let mut allowed = Vec::with_capacity(shape.number_of_states);

        for state in 0..shape.number_of_states {
            let mut actions: Vec<usize> = Vec::new();
            for action in env.allowed_actions(state) {
                shape.check_action(action)?;
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
            if actions.is_empty() {
                log::warn!("State {} has no allowed actions", state);
            }
            allowed.push(actions);
        }

        Ok(Self { allowed })
    }

    /// The allowed actions of `state`. Empty for unknown states.
    pub fn allowed(&self, state: usize) -> &[usize] {
        self.allowed.get(state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of states covered.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Returns `true` if no state is covered.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
