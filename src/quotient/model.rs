//! Explicit-state substitutes for the probabilistic model checker: a sparse
//! MDP representation plus value iteration to a fixed relative precision.
//!
//! No model-checking library is part of this crate's dependency stack (see
//! `SPEC_FULL.md` §3), so bounded/unbounded reachability and expected-reward
//! properties are evaluated here directly: a fixed-point value-iteration
//! operator is applied to convergence, followed by post-hoc greedy
//! strategy extraction from the converged value vector.

use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use log::trace;

use crate::error::{Result, SynthesisError};
use crate::specification::{CheckableModel, DirectionalResult, Formula, FormulaKind, OptimizationDirection};

/// Relative precision to which value iteration is run.
const CONVERGENCE_EPSILON: f64 = 1e-8;
/// Hard cap on value iteration sweeps, guarding against formulas this
/// substitute model checker cannot actually solve (e.g. a reward objective
/// with no proper scheduler).
const MAX_ITERATIONS: usize = 100_000;

/// One action choice available at some state: a (sub-)probability
/// distribution over successor state indices, plus any reward structures
/// attached to it.
#[derive(Debug, Clone)]
pub struct Choice {
    pub successors: Vec<(usize, f64)>,
    /// Reward earned by taking this choice, per named reward structure.
    pub rewards: HashMap<String, f64>,
    /// The quotient-level choice this was built from, used to map a
    /// scheduler back onto hole options via [`super::coloring::Coloring`].
    pub quotient_choice: usize,
}

/// An explicit-state Markov decision process: states numbered
/// `0..num_states`, with a CSR-style grouping of [`Choice`]s per state.
///
/// [`ExplicitDtmc`] is the special case where every state has exactly one
/// choice — produced by [`super::QuotientMdp::build_chain`] instead of
/// [`super::QuotientMdp::build`].
#[derive(Debug, Clone)]
pub struct ExplicitMdp {
    pub num_states: usize,
    /// `row_starts[s]..row_starts[s + 1]` indexes into `choices` for the
    /// choices available at state `s`.
    pub row_starts: Vec<usize>,
    pub choices: Vec<Choice>,
    /// Target labels evaluated over this model's states, keyed by label
    /// name (almost always just `"goal"` for the sketches this crate reads).
    pub labels: HashMap<String, FixedBitSet>,
    pub initial_state: usize,
    /// For each model state, the quotient state it was built from.
    pub quotient_state_map: Vec<usize>,
}

/// A Markov chain: the special case of [`ExplicitMdp`] with one choice per
/// state. Kept as a type alias rather than a separate type since every
/// operation on it is just `ExplicitMdp` model checking with a
/// single-choice invariant.
pub type ExplicitDtmc = ExplicitMdp;

impl ExplicitMdp {
    pub fn choices_of(&self, state: usize) -> &[Choice] {
        &self.choices[self.row_starts[state]..self.row_starts[state + 1]]
    }

    pub fn is_deterministic(&self) -> bool {
        (0..self.num_states).all(|s| self.choices_of(s).len() <= 1)
    }

    fn target_set(&self, label: &str) -> Result<&FixedBitSet> {
        self.labels
            .get(label)
            .ok_or_else(|| SynthesisError::model_checker_failure(format!("undeclared label \"{}\"", label)))
    }

    /// Runs value iteration for `P(F target)`, optimizing over choices in
    /// `direction`.
    fn reachability_values(&self, target: &FixedBitSet, direction: OptimizationDirection) -> (Vec<f64>, Vec<usize>) {
        let mut values = vec![0.0; self.num_states];
        for s in target.ones() {
            values[s] = 1.0;
        }
        let mut scheduler = vec![0usize; self.num_states];

        for iteration in 0..MAX_ITERATIONS {
            let mut max_diff = 0.0f64;
            for s in 0..self.num_states {
                if target.contains(s) {
                    continue;
                }
                let choices = self.choices_of(s);
                if choices.is_empty() {
                    continue;
                }
                let (best_value, best_choice) = optimize_choices(choices, &values, direction);
                let diff = (best_value - values[s]).abs();
                if diff > max_diff {
                    max_diff = diff;
                }
                values[s] = best_value;
                scheduler[s] = best_choice;
            }
            if max_diff < CONVERGENCE_EPSILON {
                trace!("reachability value iteration converged after {} sweeps", iteration + 1);
                break;
            }
        }
        (values, scheduler)
    }

    /// Runs value iteration for the expected accumulated `reward` until
    /// `target` is reached, optimizing over choices in `direction`.
    fn reward_values(
        &self,
        reward: &str,
        target: &FixedBitSet,
        direction: OptimizationDirection,
    ) -> (Vec<f64>, Vec<usize>) {
        let mut values = vec![0.0; self.num_states];
        let mut scheduler = vec![0usize; self.num_states];

        for iteration in 0..MAX_ITERATIONS {
            let mut max_diff = 0.0f64;
            for s in 0..self.num_states {
                if target.contains(s) {
                    continue;
                }
                let choices = self.choices_of(s);
                if choices.is_empty() {
                    continue;
                }
                let (best_value, best_choice) = optimize_reward_choices(choices, reward, &values, direction);
                let diff = (best_value - values[s]).abs();
                if diff > max_diff {
                    max_diff = diff;
                }
                values[s] = best_value;
                scheduler[s] = best_choice;
            }
            if max_diff < CONVERGENCE_EPSILON {
                trace!("reward value iteration converged after {} sweeps", iteration + 1);
                break;
            }
        }
        (values, scheduler)
    }
}

fn optimize_choices(choices: &[Choice], values: &[f64], direction: OptimizationDirection) -> (f64, usize) {
    let mut best = match direction {
        OptimizationDirection::Maximize => f64::NEG_INFINITY,
        OptimizationDirection::Minimize => f64::INFINITY,
    };
    let mut best_choice = 0;
    for (index, choice) in choices.iter().enumerate() {
        let value: f64 = choice.successors.iter().map(|&(s, p)| p * values[s]).sum();
        let better = match direction {
            OptimizationDirection::Maximize => value > best,
            OptimizationDirection::Minimize => value < best,
        };
        if better {
            best = value;
            best_choice = index;
        }
    }
    (best, best_choice)
}

fn optimize_reward_choices(
    choices: &[Choice],
    reward: &str,
    values: &[f64],
    direction: OptimizationDirection,
) -> (f64, usize) {
    let mut best = match direction {
        OptimizationDirection::Maximize => f64::NEG_INFINITY,
        OptimizationDirection::Minimize => f64::INFINITY,
    };
    let mut best_choice = 0;
    for (index, choice) in choices.iter().enumerate() {
        let immediate = choice.rewards.get(reward).copied().unwrap_or(0.0);
        let future: f64 = choice.successors.iter().map(|&(s, p)| p * values[s]).sum();
        let value = immediate + future;
        let better = match direction {
            OptimizationDirection::Maximize => value > best,
            OptimizationDirection::Minimize => value < best,
        };
        if better {
            best = value;
            best_choice = index;
        }
    }
    (best, best_choice)
}

impl CheckableModel for ExplicitMdp {
    fn check_formula(&self, formula: &Formula, direction: OptimizationDirection) -> Result<DirectionalResult> {
        let (values, local_scheduler) = match &formula.kind {
            FormulaKind::Reachability { target_label } => {
                let target = self.target_set(target_label)?;
                self.reachability_values(target, direction)
            }
            FormulaKind::Reward {
                reward_name,
                target_label,
            } => {
                let target = self.target_set(target_label)?;
                self.reward_values(reward_name, target, direction)
            }
        };

        let scheduler = (0..self.num_states)
            .map(|s| {
                let choices = self.choices_of(s);
                choices
                    .get(local_scheduler[s])
                    .map(|c| c.quotient_choice)
                    .unwrap_or(usize::MAX)
            })
            .collect();

        Ok(DirectionalResult {
            value_at_initial: values[self.initial_state],
            values,
            scheduler,
        })
    }

    fn initial_state(&self) -> usize {
        self.initial_state
    }

    fn is_deterministic(&self) -> bool {
        ExplicitMdp::is_deterministic(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A two-state chain 0 -> 1(goal) with probability 0.5 of self-looping,
    /// so P(F goal) = 1 from state 0 regardless.
    fn looping_chain() -> ExplicitMdp {
        let mut labels = HashMap::new();
        let mut goal = FixedBitSet::with_capacity(2);
        goal.set(1, true);
        labels.insert("goal".to_string(), goal);

        ExplicitMdp {
            num_states: 2,
            row_starts: vec![0, 1, 2],
            choices: vec![
                Choice {
                    successors: vec![(0, 0.5), (1, 0.5)],
                    rewards: HashMap::new(),
                    quotient_choice: 0,
                },
                Choice {
                    successors: vec![(1, 1.0)],
                    rewards: HashMap::new(),
                    quotient_choice: 1,
                },
            ],
            labels,
            initial_state: 0,
            quotient_state_map: vec![0, 1],
        }
    }

    #[test]
    fn test_reachability_converges_to_one() {
        let mdp = looping_chain();
        let formula = Formula {
            kind: FormulaKind::Reachability {
                target_label: "goal".to_string(),
            },
        };
        let result = mdp
            .check_formula(&formula, OptimizationDirection::Maximize)
            .unwrap();
        assert!((result.value_at_initial - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nondeterministic_choice_between_two_actions() {
        // state 0 has two choices: go straight to goal, or to a dead end
        let mut labels = HashMap::new();
        let mut goal = FixedBitSet::with_capacity(3);
        goal.set(1, true);
        labels.insert("goal".to_string(), goal);

        let mdp = ExplicitMdp {
            num_states: 3,
            row_starts: vec![0, 2, 2, 2],
            choices: vec![
                Choice {
                    successors: vec![(1, 1.0)],
                    rewards: HashMap::new(),
                    quotient_choice: 0,
                },
                Choice {
                    successors: vec![(2, 1.0)],
                    rewards: HashMap::new(),
                    quotient_choice: 1,
                },
            ],
            labels,
            initial_state: 0,
            quotient_state_map: vec![0, 1, 2],
        };
        let formula = Formula {
            kind: FormulaKind::Reachability {
                target_label: "goal".to_string(),
            },
        };
        let max_result = mdp
            .check_formula(&formula, OptimizationDirection::Maximize)
            .unwrap();
        assert!((max_result.value_at_initial - 1.0).abs() < 1e-6);
        let min_result = mdp
            .check_formula(&formula, OptimizationDirection::Minimize)
            .unwrap();
        assert!(min_result.value_at_initial.abs() < 1e-6);
    }
}
