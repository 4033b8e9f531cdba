//! The finite-state controller synthesized by [`super::driver::SynthesizerPomdp`],
//! serialized as `{num_nodes, num_observations, action_function, update_function}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthesisError};

/// One `action_function[n][z]` entry: either a single action chosen
/// deterministically, or a randomization over actions with given
/// probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionEntry {
    Deterministic(usize),
    Randomized(HashMap<usize, f64>),
}

/// A finite-state controller: `num_nodes` memory nodes observing one of
/// `num_observations` classes, choosing an action and a successor node
/// per (node, observation) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fsc {
    pub num_nodes: usize,
    pub num_observations: usize,
    pub action_function: Vec<Vec<ActionEntry>>,
    pub update_function: Vec<Vec<usize>>,
}

impl Fsc {
    /// Builds an FSC, validating its shape and that every randomized action
    /// entry's probabilities sum to `1 ± 1e-9`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::InvalidSpecification`] if a row's length
    /// does not match `num_observations`, a next-node index is out of
    /// range, or a randomized entry's probabilities do not sum to one.
    pub fn new(
        num_nodes: usize,
        num_observations: usize,
        action_function: Vec<Vec<ActionEntry>>,
        update_function: Vec<Vec<usize>>,
    ) -> Result<Self> {
        if action_function.len() != num_nodes || update_function.len() != num_nodes {
            return Err(SynthesisError::invalid_specification(
                "FSC action/update function does not have num_nodes rows",
            ));
        }
        for row in &action_function {
            if row.len() != num_observations {
                return Err(SynthesisError::invalid_specification(
                    "FSC action function row does not have num_observations columns",
                ));
            }
            for entry in row {
                if let ActionEntry::Randomized(probabilities) = entry {
                    let sum: f64 = probabilities.values().sum();
                    if (sum - 1.0).abs() > 1e-9 {
                        return Err(SynthesisError::invalid_specification(format!(
                            "randomized action entry probabilities sum to {}, expected 1",
                            sum
                        )));
                    }
                }
            }
        }
        for row in &update_function {
            if row.len() != num_observations {
                return Err(SynthesisError::invalid_specification(
                    "FSC update function row does not have num_observations columns",
                ));
            }
            if row.iter().any(|&next| next >= num_nodes) {
                return Err(SynthesisError::invalid_specification(
                    "FSC update function refers to an out-of-range node",
                ));
            }
        }
        Ok(Self {
            num_nodes,
            num_observations,
            action_function,
            update_function,
        })
    }

    /// Serializes this controller to the canonical JSON form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SynthesisError::invalid_specification(format!("failed to serialize FSC: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_fsc_round_trips_through_json() {
        let fsc = Fsc::new(
            2,
            1,
            vec![vec![ActionEntry::Deterministic(0)], vec![ActionEntry::Deterministic(1)]],
            vec![vec![1], vec![0]],
        )
        .unwrap();
        let json = fsc.to_json().unwrap();
        let parsed: Fsc = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.num_nodes, 2);
        assert_eq!(parsed.update_function, vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_randomized_entry_must_sum_to_one() {
        let mut probabilities = HashMap::new();
        probabilities.insert(0, 0.3);
        probabilities.insert(1, 0.3);
        let result = Fsc::new(1, 1, vec![vec![ActionEntry::Randomized(probabilities)]], vec![vec![0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_next_node_is_rejected() {
        let result = Fsc::new(1, 1, vec![vec![ActionEntry::Deterministic(0)]], vec![vec![5]]);
        assert!(result.is_err());
    }
}
