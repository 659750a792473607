//! Conversion of formulas into conjunctive normal form.
use std::borrow::Cow;

use log::trace;
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kminer_dimacs::VariableMap;
use kminer_formula::{Formula, Variable};

/// Name of the variable standing in for the constant `true`.
pub const PSEUDO_TRUE: &str = "PSEUDO_TRUE";
/// Name of the variable standing in for the constant `false`.
pub const PSEUDO_FALSE: &str = "PSEUDO_FALSE";

/// Nesting depth accepted by [`CnfConverter::new`].
pub const DEFAULT_MAX_DEPTH: usize = 1000;

const TEMP_PREFIX: &str = "temp_";

/// A formula the converter can't handle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Constant {} left after constant replacement", value)]
    UnexpectedConstant { value: bool },
    #[error("Not a clause: {}", clause)]
    NotAClause { clause: String },
    #[error("Formula nesting exceeds the maximum depth of {}", max_depth)]
    TooDeep { max_depth: usize },
}

/// How disjunctions of complex operands are converted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Distribute disjunctions over conjunctions.
    ///
    /// The result is equivalent to the input, but the number of clauses can grow exponentially.
    Distributive,
    /// Introduce a fresh variable for disjunctions of two complex operands.
    ///
    /// The result is equisatisfiable with the input and grows polynomially.
    Replacing,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Distributive => "distributive",
            Strategy::Replacing => "replacing",
        }
    }
}

/// Converts formulas into lists of clauses.
///
/// Every clause in the result is a variable, a negated variable or a disjunction of those. The
/// conjunction of all clauses is equisatisfiable with the converted formula.
///
/// Constants are replaced by the variables [`PSEUDO_TRUE`] and [`PSEUDO_FALSE`]. In that case the
/// unit clauses `PSEUDO_TRUE` and `!PSEUDO_FALSE` are the first two clauses of the result.
#[derive(Clone, Debug)]
pub struct CnfConverter {
    strategy: Strategy,
    max_depth: usize,
}

impl CnfConverter {
    pub fn new(strategy: Strategy) -> CnfConverter {
        CnfConverter {
            strategy,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Changes the maximal nesting depth of converted formulas.
    pub fn with_max_depth(mut self, max_depth: usize) -> CnfConverter {
        self.max_depth = max_depth;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Converts a formula without registering introduced variables anywhere.
    ///
    /// Introduced variables never share a name with a variable of `formula`.
    pub fn convert(&self, formula: &Formula) -> Result<Vec<Formula>, ConstraintError> {
        self.run(formula, None)
    }

    /// Converts a formula, adding all introduced variables to `variables`.
    ///
    /// Introduced variables never share a name with a variable of `formula` or a variable that
    /// is already present in `variables`.
    pub fn convert_with_variables(
        &self,
        formula: &Formula,
        variables: &mut VariableMap,
    ) -> Result<Vec<Formula>, ConstraintError> {
        self.run(formula, Some(variables))
    }

    fn run(
        &self,
        formula: &Formula,
        variables: Option<&mut VariableMap>,
    ) -> Result<Vec<Formula>, ConstraintError> {
        // The root is converted at depth 0, leaves count as depth 1.
        if formula.depth() > self.max_depth.saturating_add(1) {
            return Err(ConstraintError::TooDeep {
                max_depth: self.max_depth,
            });
        }

        let mut session = Session {
            strategy: self.strategy,
            max_depth: self.max_depth,
            taken: formula
                .variables()
                .iter()
                .map(|var| var.name().to_owned())
                .collect(),
            variables,
            temp_counter: 0,
        };

        let mut clauses = vec![];

        let formula = if formula.contains_constants() {
            let pseudo_true = session.register(PSEUDO_TRUE);
            let pseudo_false = session.register(PSEUDO_FALSE);
            clauses.push(Formula::Variable(pseudo_true.clone()));
            clauses.push(Formula::negation(Formula::Variable(pseudo_false.clone())));
            Cow::Owned(replace_constants(
                formula,
                &pseudo_true,
                &pseudo_false,
                0,
                self.max_depth,
            )?)
        } else {
            Cow::Borrowed(formula)
        };

        clauses.extend(session.convert(&formula, 0)?);

        trace!(
            "Converted formula into {} clauses using {} temporary variables",
            clauses.len(),
            session.temp_counter
        );

        Ok(clauses)
    }
}

impl Default for CnfConverter {
    fn default() -> CnfConverter {
        CnfConverter::new(Strategy::Replacing)
    }
}

/// Replaces the constants of the whole tree by the pseudo variables.
fn replace_constants(
    formula: &Formula,
    pseudo_true: &Variable,
    pseudo_false: &Variable,
    depth: usize,
    max_depth: usize,
) -> Result<Formula, ConstraintError> {
    if depth > max_depth {
        return Err(ConstraintError::TooDeep { max_depth });
    }
    let replace = |inner: &Formula| {
        replace_constants(inner, pseudo_true, pseudo_false, depth + 1, max_depth)
    };
    Ok(match formula {
        Formula::Constant(true) => Formula::Variable(pseudo_true.clone()),
        Formula::Constant(false) => Formula::Variable(pseudo_false.clone()),
        Formula::Variable(var) => Formula::Variable(var.clone()),
        Formula::Negation(inner) => Formula::negation(replace(inner)?),
        Formula::Conjunction(left, right) => Formula::conjunction(replace(left)?, replace(right)?),
        Formula::Disjunction(left, right) => Formula::disjunction(replace(left)?, replace(right)?),
    })
}

/// Whether the formula is more than a possibly negated variable.
fn is_complex(formula: &Formula) -> bool {
    match formula {
        Formula::Negation(inner) => is_complex(inner),
        Formula::Variable(_) | Formula::Constant(_) => false,
        Formula::Conjunction(..) | Formula::Disjunction(..) => true,
    }
}

/// State of a single conversion.
struct Session<'a> {
    strategy: Strategy,
    max_depth: usize,
    taken: HashSet<String>,
    variables: Option<&'a mut VariableMap>,
    temp_counter: usize,
}

impl<'a> Session<'a> {
    fn register(&mut self, name: &str) -> Variable {
        if let Some(variables) = self.variables.as_mut() {
            variables.add_variable(name);
        }
        self.taken.insert(name.to_owned());
        Variable::new(name)
    }

    fn fresh_variable(&mut self) -> Variable {
        loop {
            let name = format!("{}{}", TEMP_PREFIX, self.temp_counter);
            self.temp_counter += 1;
            let in_map = self
                .variables
                .as_ref()
                .map_or(false, |variables| variables.contains(&name));
            if !in_map && !self.taken.contains(&name) {
                return self.register(&name);
            }
        }
    }

    fn convert(&mut self, formula: &Formula, depth: usize) -> Result<Vec<Formula>, ConstraintError> {
        if depth > self.max_depth {
            return Err(ConstraintError::TooDeep {
                max_depth: self.max_depth,
            });
        }

        match formula {
            Formula::Variable(_) => Ok(vec![formula.clone()]),
            Formula::Constant(value) => {
                Err(ConstraintError::UnexpectedConstant { value: *value })
            }
            Formula::Negation(inner) => match &**inner {
                Formula::Variable(_) => Ok(vec![formula.clone()]),
                Formula::Negation(inner) => self.convert(inner, depth + 2),
                Formula::Disjunction(left, right) => {
                    let left = Formula::negation((**left).clone());
                    let right = Formula::negation((**right).clone());
                    let mut clauses = self.convert(&left, depth + 1)?;
                    clauses.extend(self.convert(&right, depth + 1)?);
                    Ok(clauses)
                }
                Formula::Conjunction(left, right) => {
                    let left = Formula::negation((**left).clone());
                    let right = Formula::negation((**right).clone());
                    self.convert_disjunction(&left, &right, depth)
                }
                Formula::Constant(value) => {
                    Err(ConstraintError::UnexpectedConstant { value: !*value })
                }
            },
            Formula::Conjunction(left, right) => {
                let mut clauses = self.convert(left, depth + 1)?;
                clauses.extend(self.convert(right, depth + 1)?);
                Ok(clauses)
            }
            Formula::Disjunction(left, right) => self.convert_disjunction(left, right, depth),
        }
    }

    fn convert_disjunction(
        &mut self,
        left: &Formula,
        right: &Formula,
        depth: usize,
    ) -> Result<Vec<Formula>, ConstraintError> {
        if self.strategy == Strategy::Replacing && is_complex(left) && is_complex(right) {
            // (!z || left) && (z || right)
            let z = Formula::Variable(self.fresh_variable());
            let not_z = Formula::negation(z.clone());

            let left = self.convert(left, depth + 1)?;
            let right = self.convert(right, depth + 1)?;

            let mut clauses = distribute(&[not_z], &left);
            clauses.extend(distribute(&[z], &right));
            return Ok(clauses);
        }

        let left = self.convert(left, depth + 1)?;
        let right = self.convert(right, depth + 1)?;
        Ok(distribute(&left, &right))
    }
}

/// Joins every clause of `left` with every clause of `right`.
fn distribute(left: &[Formula], right: &[Formula]) -> Vec<Formula> {
    let mut clauses = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            clauses.push(Formula::disjunction(l.clone(), r.clone()));
        }
    }
    clauses
}
