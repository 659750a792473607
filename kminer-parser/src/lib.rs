//! Grammar driven parser for presence condition expressions.
//!
//! The [`Parser`] is independent of any concrete syntax. Character classification and the
//! construction of formula nodes are delegated to a [`Grammar`]. Three grammars are provided:
//!
//! * [`CStyleGrammar`] for generic C-style boolean expressions (`A && !(B || C)`),
//! * [`KbuildGrammar`] for the build-system dialect (`SYM == "y"`, `SYM != "m"`, `[TRUE]`),
//! * [`TypeChefGrammar`] for the extraction tool's dialect (`definedEx(SYM)`).
use thiserror::Error;

use kminer_formula::Formula;

pub mod grammar;
pub mod parser;
pub mod token;

pub use grammar::{CStyleGrammar, Grammar, KbuildGrammar, TypeChefGrammar};
pub use parser::{Parser, DEFAULT_MAX_DEPTH};
pub use token::{lex, Arity, Bracket, Operator, Token};

/// Possible errors while lexing or parsing an expression.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExpressionFormatError {
    #[error(
        "Invalid character in expression at position {}: '{}'",
        position,
        character
    )]
    InvalidCharacter { position: usize, character: char },
    #[error("Expected identifier")]
    MissingIdentifier,
    #[error("Expected identifier, got {}", found)]
    ExpectedIdentifier { found: String },
    #[error("Unbalanced brackets")]
    UnbalancedBrackets,
    #[error("Couldn't find operator")]
    MissingOperator,
    #[error("Unary operator '{}' is not on the left", operator)]
    MisplacedUnaryOperator { operator: String },
    #[error("Unknown operator '{}'", operator)]
    UnknownOperator { operator: String },
    #[error("Invalid identifier: {}", identifier)]
    InvalidIdentifier { identifier: String },
    #[error("Expression nesting exceeds the maximum depth of {}", max_depth)]
    TooDeep { max_depth: usize },
}

/// Parses a C-style boolean expression.
///
/// Shortcut for `Parser::new(CStyleGrammar).parse(text)`.
pub fn parse(text: &str) -> Result<Formula, ExpressionFormatError> {
    Parser::new(CStyleGrammar).parse(text)
}
