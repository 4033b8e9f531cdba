//! Properties, the specification they form, and the process-wide optimum
//! tracked while synthesizing against an optimality objective.

pub mod result;

use std::fmt;

pub use result::{
    check_specification, CheckableModel, ConstraintsResult, DirectionalResult, Feasibility,
    Formula, FormulaKind, OptimalityEvalResult, OptimizationDirection, PropertyResult,
    SpecificationResult, Verdict,
};

/// A bound on a constraint property's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    /// The formula's value must be at least this bound.
    AtLeast(f64),
    /// The formula's value must be at most this bound.
    AtMost(f64),
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast(bound) => write!(f, ">= {}", bound),
            Self::AtMost(bound) => write!(f, "<= {}", bound),
        }
    }
}

/// A hard constraint every synthesized assignment must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintProperty {
    pub formula: Formula,
    pub comparison: Comparison,
}

impl fmt::Display for ConstraintProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.formula, self.comparison)
    }
}

/// The single optimality objective a specification may carry.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimalityProperty {
    pub formula: Formula,
    pub direction: OptimizationDirection,
    /// Relative-error threshold below which a newly found value is no
    /// longer considered an improvement over the current optimum.
    pub epsilon: f64,
}

impl fmt::Display for OptimalityProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            OptimizationDirection::Minimize => "min",
            OptimizationDirection::Maximize => "max",
        };
        write!(f, "{} {} {{{}}}", dir, self.formula, self.epsilon)
    }
}

/// A full specification: zero or more constraints plus an optional
/// optimality objective, and the process-wide optimum found so far.
///
/// The optimum is mutated in place as synthesis progresses rather than
/// threaded through return values, since every synthesizer shares the same
/// running best value for the duration of a run.
#[derive(Debug, Clone)]
pub struct Specification {
    pub constraints: Vec<ConstraintProperty>,
    pub optimality: Option<OptimalityProperty>,
    optimum: Option<f64>,
}

impl Specification {
    pub fn new(constraints: Vec<ConstraintProperty>, optimality: Option<OptimalityProperty>) -> Self {
        Self {
            constraints,
            optimality,
            optimum: None,
        }
    }

    /// The best value found so far for the optimality objective, if any.
    pub fn optimum(&self) -> Option<f64> {
        self.optimum
    }

    /// Whether `value` would improve on the current optimum in `direction`,
    /// subject to the optimality objective's relative-error tolerance: a
    /// value only counts as an improvement once `|value - current| >
    /// epsilon * |current|` (epsilon = 0 recovers strict improvement).
    pub fn improves_optimum(&self, value: f64, direction: OptimizationDirection) -> bool {
        match self.optimum {
            None => true,
            Some(current) => {
                let better = match direction {
                    OptimizationDirection::Maximize => value > current,
                    OptimizationDirection::Minimize => value < current,
                };
                if !better {
                    return false;
                }
                let epsilon = self.optimality.as_ref().map_or(0.0, |o| o.epsilon);
                (value - current).abs() > epsilon * current.abs()
            }
        }
    }

    /// Records `value` as the new optimum if it improves on the current
    /// one. Returns whether it did.
    pub fn update_optimum(&mut self, value: f64) -> bool {
        let direction = self
            .optimality
            .as_ref()
            .expect("update_optimum called without an optimality objective")
            .direction;
        if self.improves_optimum(value, direction) {
            self.optimum = Some(value);
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for constraint in &self.constraints {
            writeln!(f, "{}", constraint)?;
        }
        if let Some(optimality) = &self.optimality {
            writeln!(f, "{}", optimality)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improves_optimum_maximize() {
        let mut spec = Specification::new(
            vec![],
            Some(OptimalityProperty {
                formula: Formula {
                    kind: FormulaKind::Reachability {
                        target_label: "goal".into(),
                    },
                },
                direction: OptimizationDirection::Maximize,
                epsilon: 1e-4,
            }),
        );
        assert!(spec.update_optimum(0.5));
        assert!(!spec.update_optimum(0.3));
        assert!(spec.update_optimum(0.9));
        assert_eq!(spec.optimum(), Some(0.9));
    }

    #[test]
    fn test_epsilon_tolerance_blocks_small_improvements() {
        let mut spec = Specification::new(
            vec![],
            Some(OptimalityProperty {
                formula: Formula {
                    kind: FormulaKind::Reward {
                        reward_name: "cost".into(),
                        target_label: "goal".into(),
                    },
                },
                direction: OptimizationDirection::Minimize,
                epsilon: 0.05,
            }),
        );
        assert!(spec.update_optimum(10.0));
        // 10.0 -> 9.7: gap 0.3 <= 0.05 * 10.0 = 0.5, not a real improvement
        assert!(!spec.improves_optimum(9.7, OptimizationDirection::Minimize));
        // 10.0 -> 9.4: gap 0.6 > 0.5, counts as an improvement
        assert!(spec.improves_optimum(9.4, OptimizationDirection::Minimize));
    }
}
