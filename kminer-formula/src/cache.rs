//! Per-session interning of variables.
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::formula::Variable;

/// Hands out one shared [`Variable`] per name.
///
/// A cache is meant to live for a single parsing session, e.g. one presence condition or one
/// file. Repeated occurrences of a symbol within the session then share their identity, while
/// unrelated formulas never observe each other's variables.
#[derive(Default)]
pub struct VariableCache {
    variables: HashMap<Arc<str>, Variable>,
}

impl VariableCache {
    /// Create an empty cache.
    pub fn new() -> VariableCache {
        VariableCache::default()
    }

    /// The variable for `name`, creating it on first use.
    pub fn variable(&mut self, name: &str) -> Variable {
        if let Some(var) = self.variables.get(name) {
            return var.clone();
        }
        let name: Arc<str> = name.into();
        let var = Variable::new(name.clone());
        self.variables.insert(name, var.clone());
        var
    }

    /// Number of distinct variables handed out.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Forget all variables.
    pub fn clear(&mut self) {
        self.variables.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_identity() {
        let mut cache = VariableCache::new();
        let a1 = cache.variable("A");
        let a2 = cache.variable("A");
        let b = cache.variable("B");

        assert!(a1.ptr_eq(&a2));
        assert!(!a1.ptr_eq(&b));
        assert_eq!(cache.len(), 2);

        let mut other = VariableCache::new();
        let a3 = other.variable("A");
        assert_eq!(a1, a3);
        assert!(!a1.ptr_eq(&a3));

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.variable("A").ptr_eq(&a1));
    }
}
