//! Mapping between variable names and DIMACS variable numbers.
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use varisat_formula::Var;

/// A variable name has no DIMACS number.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Variable not found in DIMACS model: {}", name)]
pub struct VariableNotFound {
    pub name: String,
}

/// Bidirectional map between variable names and solver variables.
///
/// Besides the named variables the map tracks a high-water mark of used variable numbers.
/// [`add_variable`](VariableMap::add_variable) allocates above that mark, so new variables never
/// collide with numbers that are in use without having a name.
#[derive(Clone, Debug, Default)]
pub struct VariableMap {
    by_name: HashMap<String, Var>,
    by_var: HashMap<Var, String>,
    var_count: usize,
}

impl VariableMap {
    pub fn new() -> VariableMap {
        VariableMap::default()
    }

    /// Maps `name` to `var`, replacing previous mappings of either.
    ///
    /// Returns the variable previously mapped to `name`.
    pub fn insert(&mut self, name: impl Into<String>, var: Var) -> Option<Var> {
        let name = name.into();

        if let Some(old_name) = self.by_var.remove(&var) {
            self.by_name.remove(&old_name);
        }
        let previous = self.by_name.insert(name.clone(), var);
        if let Some(previous) = previous {
            self.by_var.remove(&previous);
        }
        self.by_var.insert(var, name);
        self.reserve(var.index() + 1);

        previous
    }

    /// The variable mapped to `name`.
    pub fn var(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).cloned()
    }

    /// The variable mapped to `name` or an error naming the missing variable.
    pub fn lookup(&self, name: &str) -> Result<Var, VariableNotFound> {
        self.var(name).ok_or_else(|| VariableNotFound {
            name: name.to_owned(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The name mapped to `var`.
    pub fn name(&self, var: Var) -> Option<&str> {
        self.by_var.get(&var).map(|name| &name[..])
    }

    /// Returns the variable for `name`, allocating the next unused number if necessary.
    pub fn add_variable(&mut self, name: &str) -> Var {
        if let Some(var) = self.var(name) {
            return var;
        }
        let var = Var::from_index(self.var_count);
        self.insert(name, var);
        var
    }

    /// One more than the largest variable index in use.
    pub fn max_var_count(&self) -> usize {
        self.var_count
    }

    /// Marks all variables with an index below `count` as used.
    pub fn reserve(&mut self, count: usize) {
        self.var_count = self.var_count.max(count);
    }

    /// Number of named variables.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Named variables ordered by variable number.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Var)> {
        let mut entries: Vec<_> = self
            .by_var
            .iter()
            .map(|(&var, name)| (&name[..], var))
            .collect();
        entries.sort_unstable_by_key(|&(_, var)| var);
        entries.into_iter()
    }
}
