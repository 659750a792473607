//! Numbering of clauses for the SAT engine.
use thiserror::Error;

use varisat_formula::Lit;

use kminer_dimacs::{VariableMap, VariableNotFound};
use kminer_formula::Formula;

use crate::cnf::ConstraintError;

/// Possible errors while numbering a clause.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClauseError {
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    VariableNotFound(#[from] VariableNotFound),
}

/// Turns a clause into DIMACS literals.
///
/// Variables become positive literals and negated variables negative literals. Disjunctions
/// contribute the literals of both operands, left to right.
pub fn clause_to_lits(variables: &VariableMap, clause: &Formula) -> Result<Vec<Lit>, ClauseError> {
    let mut lits = vec![];
    let mut stack = vec![clause];

    while let Some(node) = stack.pop() {
        match node {
            Formula::Variable(var) => lits.push(variables.lookup(var.name())?.positive()),
            Formula::Negation(inner) => match &**inner {
                Formula::Variable(var) => lits.push(variables.lookup(var.name())?.negative()),
                _ => return Err(not_a_clause(clause)),
            },
            Formula::Disjunction(left, right) => {
                stack.push(right);
                stack.push(left);
            }
            _ => return Err(not_a_clause(clause)),
        }
    }

    Ok(lits)
}

fn not_a_clause(clause: &Formula) -> ClauseError {
    ClauseError::Constraint(ConstraintError::NotAClause {
        clause: clause.to_string(),
    })
}
