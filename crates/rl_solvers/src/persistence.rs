//! Export and import of learned parameters.
//!
//! Storage itself is left to the caller. A solver hands out a snapshot, the
//! caller serializes it wherever it likes (JSON by default), and later feeds
//! it back through the matching `import_*` method, which checks the shape.

use crate::error::{Error, Result};
use crate::types::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A serializable snapshot of learned parameters.
pub trait Snapshot: Serialize + DeserializeOwned + Sized {
    /// Serializes the snapshot to compact JSON.
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the snapshot to pretty-printed JSON.
    fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a snapshot from JSON.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let snapshot = ValueTableSnapshot::from_json(&text)?;
    /// solver.import_values(&snapshot)?;
    /// ```
    fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the snapshot to JSON bytes.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes a snapshot from JSON bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The Q-table of a [`TdSolver`](crate::td::TdSolver), action-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueTableSnapshot {
    pub number_of_states: usize,
    pub number_of_actions: usize,
    pub values: Vec<f64>,
    #[serde(default)]
    pub exported_at: Timestamp,
}

impl ValueTableSnapshot {
    pub fn new(number_of_states: usize, number_of_actions: usize, values: Vec<f64>) -> Self {
        Self {
            number_of_states,
            number_of_actions,
            values,
            exported_at: Timestamp::now(),
        }
    }

    /// Checks that the snapshot fits a table of the given dimensions.
    pub fn check_shape(&self, number_of_states: usize, number_of_actions: usize) -> Result<()> {
        let expected = number_of_states * number_of_actions;
        if self.number_of_states != number_of_states {
            return Err(Error::DimensionMismatch {
                expected: number_of_states,
                actual: self.number_of_states,
            });
        }
        if self.number_of_actions != number_of_actions {
            return Err(Error::DimensionMismatch {
                expected: number_of_actions,
                actual: self.number_of_actions,
            });
        }
        if self.values.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }
}

impl Snapshot for ValueTableSnapshot {}

/// The flattened parameters of a Q-network.
///
/// Parameter order is network specific; for [`Mlp`](crate::dqn::Mlp) it is
/// `w1, b1, w2, b2`, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub input_size: usize,
    pub hidden_units: usize,
    pub output_size: usize,
    pub parameters: Vec<f64>,
    #[serde(default)]
    pub exported_at: Timestamp,
}

impl NetworkSnapshot {
    pub fn new(
        input_size: usize,
        hidden_units: usize,
        output_size: usize,
        parameters: Vec<f64>,
    ) -> Self {
        Self {
            input_size,
            hidden_units,
            output_size,
            parameters,
            exported_at: Timestamp::now(),
        }
    }
}

impl Snapshot for NetworkSnapshot {}
