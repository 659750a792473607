//! Boolean formulas over named variables.
use std::sync::Arc;
use std::{fmt, ops};

use rustc_hash::FxHashSet as HashSet;

use crate::assignment::Assignment;

/// A named boolean variable.
///
/// Variables compare and hash by name. Variables handed out by the same
/// [`VariableCache`](crate::cache::VariableCache) additionally share their name allocation, which
/// can be checked with [`ptr_eq`](Variable::ptr_eq).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    name: Arc<str>,
}

impl Variable {
    /// Creates a variable with the given name.
    pub fn new(name: impl Into<Arc<str>>) -> Variable {
        Variable { name: name.into() }
    }

    /// The name of this variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both variables were handed out by the same cache entry.
    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A boolean formula.
///
/// Formulas are immutable trees: every node owns its children. Equality is structural and
/// order-sensitive, i.e. `A && B` and `B && A` are different formulas.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// The constant `true` or `false`.
    Constant(bool),
    /// A named variable.
    Variable(Variable),
    /// Negation of the inner formula.
    Negation(Box<Formula>),
    /// Conjunction (AND) of two formulas.
    Conjunction(Box<Formula>, Box<Formula>),
    /// Disjunction (OR) of two formulas.
    Disjunction(Box<Formula>, Box<Formula>),
}

impl Formula {
    /// The constant `true`.
    pub const TRUE: Formula = Formula::Constant(true);
    /// The constant `false`.
    pub const FALSE: Formula = Formula::Constant(false);

    /// Creates a constant.
    pub fn constant(value: bool) -> Formula {
        Formula::Constant(value)
    }

    /// Creates a variable node for a fresh, uncached variable.
    pub fn variable(name: impl Into<Arc<str>>) -> Formula {
        Formula::Variable(Variable::new(name))
    }

    /// Creates the negation of `inner`.
    pub fn negation(inner: Formula) -> Formula {
        Formula::Negation(Box::new(inner))
    }

    /// Creates the conjunction of `left` and `right`.
    pub fn conjunction(left: Formula, right: Formula) -> Formula {
        Formula::Conjunction(Box::new(left), Box::new(right))
    }

    /// Creates the disjunction of `left` and `right`.
    pub fn disjunction(left: Formula, right: Formula) -> Formula {
        Formula::Disjunction(Box::new(left), Box::new(right))
    }

    /// Evaluates the formula under the given assignment.
    ///
    /// Variables without an assigned value evaluate to the assignment's default value, which is
    /// `false` for [`Assignment::new`].
    pub fn evaluate(&self, assignment: &Assignment) -> bool {
        match self {
            Formula::Constant(value) => *value,
            Formula::Variable(var) => assignment.value(var.name()),
            Formula::Negation(inner) => !inner.evaluate(assignment),
            Formula::Conjunction(left, right) => {
                left.evaluate(assignment) && right.evaluate(assignment)
            }
            Formula::Disjunction(left, right) => {
                left.evaluate(assignment) || right.evaluate(assignment)
            }
        }
    }

    /// Whether this is a variable or a negated variable.
    pub fn is_literal(&self) -> bool {
        match self {
            Formula::Variable(_) => true,
            Formula::Negation(inner) => matches!(**inner, Formula::Variable(_)),
            _ => false,
        }
    }

    /// Whether this is a single clause, i.e. literals joined by disjunctions only.
    pub fn is_clause(&self) -> bool {
        match self {
            Formula::Disjunction(left, right) => left.is_clause() && right.is_clause(),
            other => other.is_literal(),
        }
    }

    /// Whether a constant appears anywhere in the formula.
    pub fn contains_constants(&self) -> bool {
        self.subformulas()
            .any(|node| matches!(node, Formula::Constant(_)))
    }

    /// Distinct variables of the formula in order of first occurrence.
    pub fn variables(&self) -> Vec<Variable> {
        let mut seen = HashSet::default();
        let mut vars = vec![];
        for node in self.subformulas() {
            if let Formula::Variable(var) = node {
                if seen.insert(var.name()) {
                    vars.push(var.clone());
                }
            }
        }
        vars
    }

    /// Nesting depth; constants and variables have depth 1.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            match node {
                Formula::Constant(_) | Formula::Variable(_) => (),
                Formula::Negation(inner) => stack.push((&**inner, depth + 1)),
                Formula::Conjunction(left, right) | Formula::Disjunction(left, right) => {
                    stack.push((&**right, depth + 1));
                    stack.push((&**left, depth + 1));
                }
            }
        }
        max_depth
    }

    /// Number of constant and variable occurrences.
    pub fn literal_count(&self) -> usize {
        self.subformulas()
            .filter(|node| matches!(node, Formula::Constant(_) | Formula::Variable(_)))
            .count()
    }

    /// All nodes of the tree in pre-order, left before right.
    ///
    /// Walks the tree with an explicit stack, so arbitrarily deep formulas can be inspected.
    pub fn subformulas(&self) -> Subformulas<'_> {
        Subformulas { stack: vec![self] }
    }
}

/// Pre-order iterator over the nodes of a [`Formula`].
pub struct Subformulas<'a> {
    stack: Vec<&'a Formula>,
}

impl<'a> Iterator for Subformulas<'a> {
    type Item = &'a Formula;

    fn next(&mut self) -> Option<&'a Formula> {
        let node = self.stack.pop()?;
        match node {
            Formula::Constant(_) | Formula::Variable(_) => (),
            Formula::Negation(inner) => self.stack.push(inner),
            Formula::Conjunction(left, right) | Formula::Disjunction(left, right) => {
                self.stack.push(right);
                self.stack.push(left);
            }
        }
        Some(node)
    }
}

impl From<Variable> for Formula {
    fn from(var: Variable) -> Formula {
        Formula::Variable(var)
    }
}

impl From<bool> for Formula {
    fn from(value: bool) -> Formula {
        Formula::Constant(value)
    }
}

impl ops::Not for Formula {
    type Output = Formula;

    fn not(self) -> Formula {
        Formula::negation(self)
    }
}

impl ops::BitAnd for Formula {
    type Output = Formula;

    fn bitand(self, rhs: Formula) -> Formula {
        Formula::conjunction(self, rhs)
    }
}

impl ops::BitOr for Formula {
    type Output = Formula;

    fn bitor(self, rhs: Formula) -> Formula {
        Formula::disjunction(self, rhs)
    }
}

/// Canonical, fully parenthesized C-style rendering.
///
/// The output is accepted by the C-style grammar of the parser crate and parses back into an
/// equal formula.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Formula::Constant(true) => f.write_str("1"),
            Formula::Constant(false) => f.write_str("0"),
            Formula::Variable(var) => f.write_str(var.name()),
            Formula::Negation(inner) => write!(f, "!{}", inner),
            Formula::Conjunction(left, right) => write!(f, "({} && {})", left, right),
            Formula::Disjunction(left, right) => write!(f, "({} || {})", left, right),
        }
    }
}

/// Uses the canonical rendering.
impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;
    use proptest::{prelude::*, *};

    /// Variables named `X0`, `X1`, ... drawn from `0..var_count`.
    pub fn variable(var_count: usize) -> impl Strategy<Value = Formula> {
        (0..var_count).prop_map(|index| Formula::variable(format!("X{}", index)))
    }

    /// Formulas without constants.
    pub fn constant_free_formula(var_count: usize, depth: u32) -> impl Strategy<Value = Formula> {
        variable(var_count).prop_recursive(depth, 64, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(Formula::negation),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Formula::conjunction(l, r)),
                (inner.clone(), inner).prop_map(|(l, r)| Formula::disjunction(l, r)),
            ]
        })
    }

    /// Formulas that may contain constants.
    pub fn formula(var_count: usize, depth: u32) -> impl Strategy<Value = Formula> {
        let leaf = prop_oneof![
            1 => bool::ANY.prop_map(Formula::Constant),
            6 => variable(var_count),
        ];
        leaf.prop_recursive(depth, 64, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(Formula::negation),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Formula::conjunction(l, r)),
                (inner.clone(), inner).prop_map(|(l, r)| Formula::disjunction(l, r)),
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Formula {
        Formula::variable("A")
    }

    fn b() -> Formula {
        Formula::variable("B")
    }

    #[test]
    fn canonical_rendering() {
        let formula = (a() & !b()) | !(Formula::TRUE & Formula::FALSE);
        assert_eq!(formula.to_string(), "((A && !B) || !(1 && 0))");
        assert_eq!(format!("{:?}", !!a()), "!!A");
    }

    #[test]
    fn equality_is_order_sensitive() {
        assert_eq!(a() & b(), a() & b());
        assert_ne!(a() & b(), b() & a());
        assert_ne!(a() | b(), a() & b());
        assert_eq!(Formula::variable("A"), Formula::from(Variable::new("A")));
        assert_ne!(Formula::TRUE, Formula::FALSE);
    }

    #[test]
    fn evaluation() {
        let formula = (a() & !b()) | Formula::FALSE;

        let mut assignment = Assignment::new();
        assignment.set("A", true);
        assert!(formula.evaluate(&assignment));

        assignment.set("B", true);
        assert!(!formula.evaluate(&assignment));
    }

    #[test]
    fn unassigned_variables_use_default() {
        let formula = !a();
        assert!(formula.evaluate(&Assignment::new()));
        assert!(!formula.evaluate(&Assignment::with_default(true)));
    }

    #[test]
    fn shape_queries() {
        assert!(a().is_literal());
        assert!((!a()).is_literal());
        assert!(!(!!a()).is_literal());
        assert!((a() | (!b() | a())).is_clause());
        assert!(!(a() | (b() & a())).is_clause());
        assert!(!Formula::TRUE.is_clause());

        let formula = (a() & Formula::TRUE) | !(b() & a());
        assert!(formula.contains_constants());
        assert!(!(a() | b()).contains_constants());
        assert_eq!(formula.variables(), vec![Variable::new("A"), Variable::new("B")]);
        assert_eq!(formula.depth(), 4);
        assert_eq!(formula.literal_count(), 4);
    }

    #[test]
    fn deep_formulas_are_walked_iteratively() {
        let formula = crate::test::deep_conjunction(200_000);
        assert_eq!(formula.depth(), 200_001);
        assert_eq!(formula.literal_count(), 200_001);
        assert_eq!(formula.variables().len(), 4);
        assert!(!formula.contains_constants());
        std::mem::forget(formula);
    }
}
