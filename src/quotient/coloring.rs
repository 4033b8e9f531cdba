//! Maps each quotient choice to the set of hole-option pairs that enable
//! it, and answers the "which holes does this scheduler commit to" queries
//! `split` needs.
//!
//! Represented directly as a conjunction of `(hole, option)` pairs per
//! choice rather than via an SMT-backed object, since our quotient is
//! built by literal command expansion (see `sketch::build`) instead of by
//! coloring an externally-built MDP.

use std::collections::{BTreeSet, HashMap};

use crate::family::DesignSpace;

/// For each quotient choice, the hole-option pairs whose conjunction must
/// hold for that choice to be enabled. An empty vector means the choice is
/// always enabled (it does not depend on any hole).
#[derive(Debug, Clone, Default)]
pub struct Coloring {
    requirements: Vec<Vec<(usize, usize)>>,
}

impl Coloring {
    pub fn new(requirements: Vec<Vec<(usize, usize)>>) -> Self {
        Self { requirements }
    }

    pub fn num_choices(&self) -> usize {
        self.requirements.len()
    }

    pub fn requirements(&self, choice: usize) -> &[(usize, usize)] {
        &self.requirements[choice]
    }

    /// Whether `choice` can be enabled under `family`, i.e. every hole it
    /// depends on still has the required option available.
    pub fn compatible(&self, choice: usize, family: &DesignSpace) -> bool {
        self.requirements[choice]
            .iter()
            .all(|&(hole, option)| family.hole(hole).contains(option))
    }

    /// For the given set of quotient choices (typically a scheduler's
    /// per-state selection), returns, per hole, the sorted set of options
    /// the scheduler committed to.
    ///
    /// A hole absent from a choice's requirement set is not constrained by
    /// that choice and does not contribute an entry.
    pub fn hole_selection(&self, choices: &[usize], num_holes: usize) -> Vec<BTreeSet<usize>> {
        let mut selection: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); num_holes];
        for &choice in choices {
            for &(hole, option) in &self.requirements[choice] {
                selection[hole].insert(option);
            }
        }
        selection
    }

    /// Whether the given scheduler (one quotient choice per state) commits
    /// to exactly one option for every hole it constrains, i.e. it could be
    /// realized by a single concrete assignment.
    pub fn is_consistent(&self, choices: &[usize], num_holes: usize) -> bool {
        self.hole_selection(choices, num_holes)
            .iter()
            .all(|options| options.len() <= 1)
    }

    /// Builds the coloring requirement for a command variant that depends
    /// on the given hole assignments (a convenience constructor used by the
    /// sketch loader when expanding a command over its referenced holes'
    /// options).
    pub fn requirement_from(assignment: &HashMap<usize, usize>) -> Vec<(usize, usize)> {
        let mut requirement: Vec<_> = assignment.iter().map(|(&h, &o)| (h, o)).collect();
        requirement.sort_unstable();
        requirement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Hole;

    fn family() -> DesignSpace {
        DesignSpace::new(vec![
            Hole::new("h0", vec!["a".into(), "b".into()]),
            Hole::new("h1", vec!["x".into(), "y".into()]),
        ])
    }

    #[test]
    fn test_compatible_checks_every_pair() {
        let coloring = Coloring::new(vec![vec![(0, 1)], vec![(0, 0), (1, 1)]]);
        let family = family().subholes(0, vec![0]);
        assert!(!coloring.compatible(0, &family));
        assert!(coloring.compatible(1, &family));
    }

    #[test]
    fn test_hole_selection_and_consistency() {
        let coloring = Coloring::new(vec![vec![(0, 0)], vec![(0, 1)]]);
        let selection = coloring.hole_selection(&[0, 1], 2);
        assert_eq!(selection[0].len(), 2);
        assert!(selection[1].is_empty());
        assert!(!coloring.is_consistent(&[0, 1], 2));
        assert!(coloring.is_consistent(&[0], 2));
    }
}
