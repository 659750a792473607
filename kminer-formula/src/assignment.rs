//! Truth assignments used when evaluating formulas.
use std::iter::FromIterator;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

/// Maps variable names to truth values.
///
/// Names without an explicit value evaluate to the assignment's default. The default is `false`
/// unless the assignment was created with [`with_default`](Assignment::with_default), so an
/// unassigned configuration symbol counts as disabled.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    values: HashMap<Arc<str>, bool>,
    default: bool,
}

impl Assignment {
    /// Create an empty assignment that defaults to `false`.
    pub fn new() -> Assignment {
        Assignment::default()
    }

    /// Create an empty assignment with the given default for unassigned variables.
    pub fn with_default(default: bool) -> Assignment {
        Assignment {
            values: HashMap::default(),
            default,
        }
    }

    /// Assign a value to a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<Arc<str>>, value: bool) {
        self.values.insert(name.into(), value);
    }

    /// The explicitly assigned value of a variable.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).cloned()
    }

    /// The value of a variable, falling back to the default.
    pub fn value(&self, name: &str) -> bool {
        self.get(name).unwrap_or(self.default)
    }

    /// Value used for unassigned variables.
    pub fn default_value(&self) -> bool {
        self.default
    }

    /// Number of explicitly assigned variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterator over all explicitly assigned variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.values.iter().map(|(name, &value)| (&**name, value))
    }
}

impl<N: Into<Arc<str>>> FromIterator<(N, bool)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (N, bool)>>(iter: I) -> Assignment {
        let mut assignment = Assignment::new();
        for (name, value) in iter {
            assignment.set(name, value);
        }
        assignment
    }
}
