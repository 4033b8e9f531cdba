//! Incremental SAT encoding of a family, used to enumerate and exclude
//! assignments during CEGIS/Hybrid search.
//!
//! One boolean variable is created per hole-option pair, an exactly-one
//! clause is emitted per hole at encoding time, and one clause is appended
//! per excluded conflict thereafter, reusing the same incremental
//! `varisat::Solver` instance across the whole search.

use std::collections::HashMap;

use log::trace;
use varisat::{ExtendFormula, Lit, Solver};

use super::design_space::{Assignment, DesignSpace};

/// An incremental SAT context tied to a specific family.
///
/// Created once via [`DesignSpace::encode`] (or equivalently
/// [`Encoding::new`]) and reused across `pick_assignment`/`exclude_assignment`
/// calls for the lifetime of that family's CEGIS/Hybrid exploration.
pub struct Encoding {
    solver: Solver<'static>,
    /// `vars[hole][option_position]` is the literal for hole `hole` taking
    /// its `option_position`-th currently available option.
    vars: Vec<Vec<Lit>>,
}

impl Encoding {
    /// Builds a fresh encoding for `family`: one exactly-one clause per hole
    /// over that hole's currently available options.
    pub fn new(family: &DesignSpace) -> Self {
        let mut solver = Solver::new();
        let vars: Vec<Vec<Lit>> = family
            .holes()
            .iter()
            .map(|hole| (0..hole.size()).map(|_| solver.new_lit()).collect())
            .collect();

        for hole_vars in &vars {
            // at least one option selected
            solver.add_clause(hole_vars);
            // at most one option selected
            for i in 0..hole_vars.len() {
                for j in (i + 1)..hole_vars.len() {
                    solver.add_clause(&[!hole_vars[i], !hole_vars[j]]);
                }
            }
        }

        Self { solver, vars }
    }

    /// Finds the next satisfying assignment of `family` not yet excluded by
    /// a prior call to [`Encoding::exclude_assignment`], or `None` if the
    /// family has been exhausted.
    pub fn pick_assignment(&mut self, family: &DesignSpace) -> Option<Assignment> {
        match self.solver.solve() {
            Ok(true) => {
                let model = self.solver.model().expect("sat model after Ok(true)");
                let positive: std::collections::HashSet<_> = model
                    .iter()
                    .filter(|lit| lit.is_positive())
                    .map(|lit| lit.index())
                    .collect();

                let mut indices = Vec::with_capacity(family.num_holes());
                for hole_vars in &self.vars {
                    let position = hole_vars
                        .iter()
                        .position(|lit| positive.contains(&lit.index()))
                        .expect("exactly one option selected per hole");
                    indices.push(position);
                }
                Some(family.construct_assignment(&indices))
            }
            Ok(false) => None,
            Err(err) => {
                trace!("sat solver error while picking assignment: {}", err);
                None
            }
        }
    }

    /// Excludes every assignment that agrees with `assignment` on the given
    /// `conflict` hole indices, regardless of the values of any other hole.
    ///
    /// Returns the number of assignments thereby pruned from the family,
    /// computed combinatorially (the product of the option counts of the
    /// holes *not* in `conflict`) rather than by re-solving, since computing
    /// it exactly would require enumerating models.
    pub fn exclude_assignment(
        &mut self,
        family: &DesignSpace,
        assignment: &Assignment,
        conflict: &[usize],
    ) -> u128 {
        let clause: Vec<Lit> = conflict
            .iter()
            .map(|&hole| {
                let option = assignment.option(hole);
                let position = family
                    .hole(hole)
                    .options()
                    .iter()
                    .position(|&o| o == option)
                    .expect("conflicting hole option is part of the family");
                !self.vars[hole][position]
            })
            .collect();
        self.solver.add_clause(&clause);

        let conflict_set: HashMap<usize, ()> = conflict.iter().map(|&h| (h, ())).collect();
        family
            .holes()
            .iter()
            .enumerate()
            .filter(|(index, _)| !conflict_set.contains_key(index))
            .map(|(_, hole)| hole.size() as u128)
            .product()
    }
}

impl DesignSpace {
    /// Builds a fresh incremental SAT [`Encoding`] for this family.
    pub fn encode(&self) -> Encoding {
        Encoding::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::hole::Hole;

    fn two_hole_family() -> DesignSpace {
        DesignSpace::new(vec![
            Hole::new("a", vec!["0".into(), "1".into()]),
            Hole::new("b", vec!["x".into(), "y".into(), "z".into()]),
        ])
    }

    #[test]
    fn test_pick_assignment_enumerates_whole_family() {
        let family = two_hole_family();
        let mut encoding = family.encode();
        let mut seen = std::collections::HashSet::new();
        // `pick_assignment` does not advance past what it just returned on
        // its own (see its doc comment); the caller is the one that
        // excludes it, same as every real CEGIS loop does.
        while let Some(assignment) = encoding.pick_assignment(&family) {
            seen.insert((assignment.option(0), assignment.option(1)));
            encoding.exclude_assignment(&family, &assignment, &[0, 1]);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_exclude_assignment_removes_matching_assignments() {
        let family = two_hole_family();
        let mut encoding = family.encode();
        let target = family.construct_assignment(&[0, 0]);
        let pruned = encoding.exclude_assignment(&family, &target, &[0]);
        // excluding hole 0 = its current option removes all 3 assignments
        // with that hole value, regardless of hole 1's value
        assert_eq!(pruned, 3);

        let mut seen = std::collections::HashSet::new();
        while let Some(assignment) = encoding.pick_assignment(&family) {
            seen.insert((assignment.option(0), assignment.option(1)));
            encoding.exclude_assignment(&family, &assignment, &[0, 1]);
        }
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|&(a, _)| a != 0));
    }
}
