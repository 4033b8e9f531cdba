//! A single hole: a named decision point with a fixed list of option labels.

use std::fmt;

/// A hole declared by a sketch.
///
/// The full list of option labels is fixed at parse time (`option_labels`)
/// and never changes; what changes as families are split is the subset of
/// option *indices* (into that fixed list) still available, stored in
/// `options`. Identity (the label/index mapping) stays stable while the
/// live subset narrows.
#[derive(Debug, Clone)]
pub struct Hole {
    name: String,
    option_labels: Vec<String>,
    options: Vec<usize>,
}

impl Hole {
    /// Creates a hole with the full option range selected.
    pub fn new(name: impl Into<String>, option_labels: Vec<String>) -> Self {
        let options = (0..option_labels.len()).collect();
        Self {
            name: name.into(),
            option_labels,
            options,
        }
    }

    /// Creates a hole restricted to the given subset of option indices.
    ///
    /// `options` must be a subset of `0..option_labels.len()`, sorted and
    /// deduplicated by the caller.
    pub fn with_options(name: impl Into<String>, option_labels: Vec<String>, options: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            option_labels,
            options,
        }
    }

    /// The hole's name, as declared in the sketch.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full, fixed list of option labels for this hole.
    pub fn option_labels(&self) -> &[String] {
        &self.option_labels
    }

    /// The label for a given option index, from the fixed label list.
    pub fn label_of(&self, option: usize) -> &str {
        &self.option_labels[option]
    }

    /// The currently available option indices, in ascending order.
    pub fn options(&self) -> &[usize] {
        &self.options
    }

    /// The number of currently available options.
    pub fn size(&self) -> usize {
        self.options.len()
    }

    /// Whether this hole currently has exactly one available option, i.e.
    /// it is resolved as part of a concrete assignment.
    pub fn is_fixed(&self) -> bool {
        self.options.len() == 1
    }

    /// Whether `option` is among the currently available options.
    pub fn contains(&self, option: usize) -> bool {
        self.options.binary_search(&option).is_ok()
    }

    /// The sole selected option, if this hole is fixed.
    pub fn fixed_option(&self) -> Option<usize> {
        if self.options.len() == 1 {
            Some(self.options[0])
        } else {
            None
        }
    }

    /// Returns a copy of this hole restricted to `options`.
    ///
    /// `options` must be a non-empty subset of the hole's current options.
    pub fn restrict(&self, options: Vec<usize>) -> Self {
        debug_assert!(!options.is_empty());
        debug_assert!(options.iter().all(|o| self.contains(*o)));
        Self {
            name: self.name.clone(),
            option_labels: self.option_labels.clone(),
            options,
        }
    }
}

impl fmt::Display for Hole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(option) = self.fixed_option() {
            write!(f, "{}={}", self.name, self.label_of(option))
        } else {
            let labels: Vec<_> = self.options.iter().map(|&o| self.label_of(o)).collect();
            write!(f, "{}∈{{{}}}", self.name, labels.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_hole_selects_all_options() {
        let hole = Hole::new("x", vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(hole.size(), 3);
        assert!(!hole.is_fixed());
    }

    #[test]
    fn test_restrict_narrows_options() {
        let hole = Hole::new("x", vec!["a".into(), "b".into(), "c".into()]);
        let restricted = hole.restrict(vec![1]);
        assert!(restricted.is_fixed());
        assert_eq!(restricted.fixed_option(), Some(1));
        assert_eq!(restricted.label_of(1), "b");
    }

    #[test]
    fn test_contains() {
        let hole = Hole::new("x", vec!["a".into(), "b".into()]).restrict(vec![0]);
        assert!(hole.contains(0));
        assert!(!hole.contains(1));
    }
}
