//! The design space: a cartesian product of holes, and the concrete
//! assignments drawn from it.

use std::fmt;

use super::hole::Hole;

/// A family of hole assignments: the cartesian product of each hole's
/// currently available options.
///
/// Holes keep a stable index across every sub-family derived from the same
/// root by [`DesignSpace::subholes`] — a hole is never removed, only its
/// option set narrowed, so indices into the root family remain valid for
/// every descendant.
#[derive(Debug, Clone)]
pub struct DesignSpace {
    holes: Vec<Hole>,
}

/// A design space in which every hole has exactly one option selected.
///
/// A thin wrapper distinguishing assignments from general families at the
/// type level; all hole-indexed accessors are shared with [`DesignSpace`].
#[derive(Debug, Clone)]
pub struct Assignment(DesignSpace);

impl DesignSpace {
    /// Creates a design space from the given holes.
    pub fn new(holes: Vec<Hole>) -> Self {
        Self { holes }
    }

    /// The number of holes in this family.
    pub fn num_holes(&self) -> usize {
        self.holes.len()
    }

    /// The holes of this family, in stable index order.
    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    /// The hole at the given stable index.
    pub fn hole(&self, index: usize) -> &Hole {
        &self.holes[index]
    }

    /// The number of assignments in this family, i.e. the product of every
    /// hole's option count.
    ///
    /// Returned as `u128` since the product can vastly exceed `usize` for
    /// sketches with many holes, and callers only ever compare or log it.
    pub fn size(&self) -> u128 {
        self.holes.iter().map(|h| h.size() as u128).product()
    }

    /// Whether every hole in this family has exactly one option, i.e. this
    /// family denotes a single concrete assignment.
    pub fn is_assignment(&self) -> bool {
        self.holes.iter().all(Hole::is_fixed)
    }

    /// Converts this family into an [`Assignment`], if it denotes exactly
    /// one concrete assignment.
    pub fn into_assignment(self) -> Option<Assignment> {
        if self.is_assignment() {
            Some(Assignment(self))
        } else {
            None
        }
    }

    /// Returns an arbitrary single assignment from this family, by picking
    /// the lowest available option for every hole.
    pub fn pick_any(&self) -> Assignment {
        let holes = self
            .holes
            .iter()
            .map(|h| h.restrict(vec![h.options()[0]]))
            .collect();
        Assignment(DesignSpace::new(holes))
    }

    /// Constructs the assignment selecting, for each hole, the option at
    /// `indices[hole]` within that hole's *currently available* options
    /// (mixed-radix decoding, not a raw option index).
    pub fn construct_assignment(&self, indices: &[usize]) -> Assignment {
        debug_assert_eq!(indices.len(), self.holes.len());
        let holes = self
            .holes
            .iter()
            .zip(indices)
            .map(|(h, &i)| h.restrict(vec![h.options()[i]]))
            .collect();
        Assignment(DesignSpace::new(holes))
    }

    /// Returns a copy of this family with `hole_index` restricted to
    /// `suboptions`.
    pub fn subholes(&self, hole_index: usize, suboptions: Vec<usize>) -> Self {
        let mut holes = self.holes.clone();
        holes[hole_index] = holes[hole_index].restrict(suboptions);
        Self { holes }
    }

    /// Iterates over every assignment in this family, in mixed-radix
    /// counting order over the holes' currently available options.
    pub fn all_combinations(&self) -> AllCombinations<'_> {
        AllCombinations::new(self)
    }
}

impl fmt::Display for DesignSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.holes.iter().map(Hole::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

impl Assignment {
    /// The number of holes in the underlying family.
    pub fn num_holes(&self) -> usize {
        self.0.num_holes()
    }

    /// The selected option for `hole_index`.
    pub fn option(&self, hole_index: usize) -> usize {
        self.0.hole(hole_index).fixed_option().expect("assignment hole is fixed")
    }

    /// The selected option's label for `hole_index`.
    pub fn label(&self, hole_index: usize) -> &str {
        let hole = self.0.hole(hole_index);
        hole.label_of(hole.fixed_option().expect("assignment hole is fixed"))
    }

    /// Borrows the underlying single-valued family.
    pub fn as_design_space(&self) -> &DesignSpace {
        &self.0
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Iterator over every assignment of a [`DesignSpace`], in mixed-radix
/// counting order.
pub struct AllCombinations<'a> {
    family: &'a DesignSpace,
    counter: Option<Vec<usize>>,
}

impl<'a> AllCombinations<'a> {
    fn new(family: &'a DesignSpace) -> Self {
        let counter = if family.holes.iter().any(|h| h.size() == 0) {
            None
        } else {
            Some(vec![0; family.holes.len()])
        };
        Self { family, counter }
    }
}

impl<'a> Iterator for AllCombinations<'a> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Self::Item> {
        let counter = self.counter.as_mut()?;
        let result = self.family.construct_assignment(counter);

        // advance the mixed-radix counter, carrying over on overflow
        let mut carry_index = 0;
        loop {
            if carry_index == counter.len() {
                self.counter = None;
                break;
            }
            counter[carry_index] += 1;
            if counter[carry_index] < self.family.hole(carry_index).size() {
                break;
            }
            counter[carry_index] = 0;
            carry_index += 1;
        }

        Some(result)
    }
}
