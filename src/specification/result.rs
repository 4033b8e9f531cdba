//! Formulas, model-checking results, and the [`CheckableModel`] trait that
//! lets [`check_specification`] run against either a quotient MDP or a
//! single DTMC without caring which.

use std::fmt;

use crate::error::Result;

use super::Specification;

/// The kind of formula a [`super::Property`] evaluates.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaKind {
    /// Probability of eventually reaching the labeled target state set.
    Reachability { target_label: String },
    /// Expected accumulated value of the named reward structure until the
    /// labeled target state set is reached.
    Reward {
        reward_name: String,
        target_label: String,
    },
}

/// A raw formula together with the state/choice data it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub kind: FormulaKind,
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FormulaKind::Reachability { target_label } => write!(f, "P=? [F \"{}\"]", target_label),
            FormulaKind::Reward {
                reward_name,
                target_label,
            } => write!(f, "R{{\"{}\"}}=? [F \"{}\"]", reward_name, target_label),
        }
    }
}

/// The direction in which a formula is evaluated over the nondeterminism of
/// a quotient MDP (irrelevant, but harmless, for a DTMC with one choice per
/// state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationDirection {
    Minimize,
    Maximize,
}

impl OptimizationDirection {
    /// The direction that proves the opposite bound, used to compute the
    /// secondary result needed to decide rejection.
    pub fn opposite(self) -> Self {
        match self {
            Self::Minimize => Self::Maximize,
            Self::Maximize => Self::Minimize,
        }
    }
}

/// The outcome of model checking one formula in one direction: a value per
/// model state, the value at the initial state, and the scheduler that
/// attains it (one globally-numbered quotient choice per state).
#[derive(Debug, Clone)]
pub struct DirectionalResult {
    pub values: Vec<f64>,
    pub value_at_initial: f64,
    /// For each model state, the quotient choice index chosen by the
    /// optimizing scheduler at that state.
    pub scheduler: Vec<usize>,
}

/// A model that [`check_specification`] can evaluate a [`Formula`] against.
///
/// Implemented by [`crate::quotient::model::ExplicitMdp`] (and, since
/// [`crate::quotient::model::ExplicitDtmc`] is the single-choice-per-state
/// special case of the same structure, by it as well).
pub trait CheckableModel {
    /// Evaluates `formula` in the given `direction`, returning the value at
    /// every model state plus the optimizing scheduler.
    fn check_formula(&self, formula: &Formula, direction: OptimizationDirection) -> Result<DirectionalResult>;

    /// The model state corresponding to the sketch's initial valuation.
    fn initial_state(&self) -> usize;

    /// Whether this model has exactly one choice per state (a DTMC), in
    /// which case `direction` is immaterial and only one model-checking
    /// pass per formula is needed.
    fn is_deterministic(&self) -> bool;
}

/// Whether a property was decided to be satisfied, violated, or remains
/// undecided pending further refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    Violated,
    Undecided,
}

/// The result of checking one constraint property against a model.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    pub verdict: Verdict,
    pub primary: DirectionalResult,
    pub secondary: Option<DirectionalResult>,
}

impl PropertyResult {
    /// The directional result to use for extracting a scheduler/hole
    /// selection when this property is the one driving `split`: the primary
    /// result if the verdict is undecided and we have not yet disproved the
    /// accept bound, otherwise the secondary (reject-direction) result.
    pub fn selection_result(&self) -> &DirectionalResult {
        if self.verdict == Verdict::Undecided {
            &self.primary
        } else {
            self.secondary.as_ref().unwrap_or(&self.primary)
        }
    }
}

/// Whether every constraint is satisfied, some constraint is violated, or
/// the outcome remains undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility {
    Satisfied,
    Violated,
    Undecided,
}

/// The aggregate result of checking every constraint property.
#[derive(Debug, Clone, Default)]
pub struct ConstraintsResult {
    /// One entry per constraint; `None` for constraints skipped by
    /// short-circuit evaluation once a violation was already found.
    pub results: Vec<Option<PropertyResult>>,
}

impl ConstraintsResult {
    /// A `None` entry means that constraint was not re-checked this round
    /// (either skipped by `short_evaluation` after an earlier violation, or
    /// outside the `property_indices` subset a parent family already proved
    /// satisfied for every member — see `check_specification`), so it
    /// counts neither against nor for `Undecided`: a missing entry is only
    /// ever produced when the constraint is already known-satisfied or the
    /// family is already known-violated by some other entry.
    pub fn feasibility(&self) -> Feasibility {
        if self
            .results
            .iter()
            .flatten()
            .any(|r| r.verdict == Verdict::Violated)
        {
            return Feasibility::Violated;
        }
        if self
            .results
            .iter()
            .all(|r| !matches!(r, Some(r) if r.verdict == Verdict::Undecided))
        {
            return Feasibility::Satisfied;
        }
        Feasibility::Undecided
    }

    /// Indices of constraints whose verdict is still genuinely undecided —
    /// a skipped (`None`) entry is never undecided: `property_indices`
    /// propagation relies on this to not re-widen an already-narrowed
    /// undecided set.
    pub fn undecided_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Some(r) if r.verdict == Verdict::Undecided))
            .map(|(i, _)| i)
            .collect()
    }
}

/// The result of checking the optimality property against a model.
#[derive(Debug, Clone)]
pub struct OptimalityEvalResult {
    pub property_result: PropertyResult,
    /// Whether the family can still possibly beat the current optimum
    /// (false means this family/assignment can be pruned outright).
    pub can_improve: bool,
    /// Whether the primary (optimistic) value already improves on the
    /// current optimum — only meaningful once the family is a single
    /// assignment.
    pub improves_optimum: bool,
}

/// The full result of evaluating a [`Specification`] against a model.
#[derive(Debug, Clone)]
pub struct SpecificationResult {
    pub constraints_result: ConstraintsResult,
    pub optimality_result: Option<OptimalityEvalResult>,
}

impl SpecificationResult {
    /// Whether every constraint is satisfied and, if present, the
    /// optimality property cannot be improved any further for a concrete
    /// assignment.
    pub fn sat(&self) -> bool {
        self.constraints_result.feasibility() == Feasibility::Satisfied
    }

    /// Whether any constraint was violated.
    pub fn unsat(&self) -> bool {
        self.constraints_result.feasibility() == Feasibility::Violated
    }

    /// The first result (among undecided constraints, else optimality) that
    /// `split` should draw its hole selection from.
    pub fn undecided_result(&self) -> Option<&PropertyResult> {
        self.constraints_result
            .undecided_indices()
            .first()
            .and_then(|&i| self.constraints_result.results[i].as_ref())
            .or_else(|| self.optimality_result.as_ref().map(|o| &o.property_result))
    }
}

fn decide_constraint(
    primary: DirectionalResult,
    secondary: Option<DirectionalResult>,
    comparison: &super::Comparison,
) -> PropertyResult {
    let primary_satisfied = comparison.satisfied_by(primary.value_at_initial);
    if primary_satisfied {
        return PropertyResult {
            verdict: Verdict::Satisfied,
            primary,
            secondary,
        };
    }
    let verdict = match &secondary {
        Some(secondary) if !comparison.satisfied_by(secondary.value_at_initial) => Verdict::Violated,
        Some(_) => Verdict::Undecided,
        // No secondary direction was computed because the model is
        // deterministic (a DTMC, or a quotient that happens to have only
        // one live choice per state): there is only one value, so failing
        // to satisfy it is a definitive violation, not pending refinement.
        None => Verdict::Violated,
    };
    PropertyResult {
        verdict,
        primary,
        secondary,
    }
}

/// Checks `spec` against `model`.
///
/// `property_indices`, when given, restricts which constraint properties
/// are (re-)evaluated — a parent family's already-decided constraints are
/// skipped and carried over as `None` so `short_evaluation` can still short
/// circuit the remaining ones. When `short_evaluation` is set, checking
/// stops at the first constraint found violated (used by AR/CEGIS, which
/// only need to know *that* a family is rejected, not by how much).
pub fn check_specification<M: CheckableModel>(
    model: &M,
    spec: &mut Specification,
    property_indices: Option<&[usize]>,
    short_evaluation: bool,
) -> Result<SpecificationResult> {
    let indices: Vec<usize> = match property_indices {
        Some(indices) => indices.to_vec(),
        None => (0..spec.constraints.len()).collect(),
    };

    let mut results = vec![None; spec.constraints.len()];
    let mut violated = false;
    for &index in &indices {
        let constraint = spec.constraints[index].clone();
        let primary_direction = constraint.comparison.primary_direction();
        let primary = model.check_formula(&constraint.formula, primary_direction)?;

        let secondary = if model.is_deterministic() {
            None
        } else {
            Some(model.check_formula(&constraint.formula, primary_direction.opposite())?)
        };

        let result = decide_constraint(primary, secondary, &constraint.comparison);
        if result.verdict == Verdict::Violated {
            violated = true;
        }
        results[index] = Some(result);
        if violated && short_evaluation {
            break;
        }
    }

    let constraints_result = ConstraintsResult { results };

    let optimality_result = if violated {
        None
    } else if let Some(optimality) = spec.optimality.clone() {
        let direction = optimality.direction;
        let primary = model.check_formula(&optimality.formula, direction)?;
        let secondary = if model.is_deterministic() {
            None
        } else {
            Some(model.check_formula(&optimality.formula, direction.opposite())?)
        };

        let can_improve = match &secondary {
            Some(_) => spec.improves_optimum(primary.value_at_initial, direction),
            None => true,
        };
        let improves_optimum = model.is_deterministic()
            && spec.improves_optimum(primary.value_at_initial, direction);

        let verdict = if model.is_deterministic() {
            Verdict::Satisfied
        } else if can_improve {
            Verdict::Undecided
        } else {
            Verdict::Violated
        };

        Some(OptimalityEvalResult {
            property_result: PropertyResult {
                verdict,
                primary,
                secondary,
            },
            can_improve,
            improves_optimum,
        })
    } else {
        None
    };

    Ok(SpecificationResult {
        constraints_result,
        optimality_result,
    })
}

impl super::Comparison {
    pub(super) fn satisfied_by(&self, value: f64) -> bool {
        match self {
            Self::AtLeast(bound) => value >= *bound,
            Self::AtMost(bound) => value <= *bound,
        }
    }

    /// The direction that, if it satisfies the comparison, proves *every*
    /// member of a family satisfies it.
    pub(super) fn primary_direction(&self) -> OptimizationDirection {
        match self {
            Self::AtLeast(_) => OptimizationDirection::Minimize,
            Self::AtMost(_) => OptimizationDirection::Maximize,
        }
    }
}
