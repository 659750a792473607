//! Grammars describing the textual formats of expressions.
use kminer_formula::{Formula, VariableCache};

use crate::token::{Arity, Operator};
use crate::ExpressionFormatError;

mod cstyle;
mod kbuild;
mod typechef;

pub use cstyle::CStyleGrammar;
pub use kbuild::KbuildGrammar;
pub use typechef::TypeChefGrammar;

/// Negation as written in C.
pub const NOT: Operator = Operator::unary("!", 1);
/// Conjunction as written in C.
pub const AND: Operator = Operator::binary("&&", 2);
/// Disjunction as written in C.
pub const OR: Operator = Operator::binary("||", 3);

/// Describes a format for expressions to be parsed by a [`Parser`](crate::Parser).
///
/// The format consists of identifiers, operators and brackets. Unary operators are always on the
/// left side of the expression they are applied to, binary operators are always between their
/// two operands.
///
/// The classification methods receive the whole input and a cursor position, so a grammar may
/// inspect the surrounding characters. The construction methods build the formula nodes.
pub trait Grammar {
    /// The operator starting at `pos`, if any.
    fn operator(&self, input: &[char], pos: usize) -> Option<Operator>;

    /// Whether the character at `pos` is ignored whitespace.
    fn is_whitespace(&self, input: &[char], pos: usize) -> bool;

    fn is_opening_bracket(&self, input: &[char], pos: usize) -> bool;

    fn is_closing_bracket(&self, input: &[char], pos: usize) -> bool;

    /// Whether the character at `pos` is part of an identifier.
    fn is_identifier_char(&self, input: &[char], pos: usize) -> bool;

    /// Builds the node for a unary operator applied to `child`.
    ///
    /// Only called with operators returned by [`operator`](Grammar::operator).
    fn make_unary(
        &self,
        operator: &Operator,
        child: Formula,
    ) -> Result<Formula, ExpressionFormatError> {
        make_c_style_unary(operator, child)
    }

    /// Builds the node for a binary operator.
    ///
    /// Only called with operators returned by [`operator`](Grammar::operator).
    fn make_binary(
        &self,
        operator: &Operator,
        left: Formula,
        right: Formula,
    ) -> Result<Formula, ExpressionFormatError> {
        make_c_style_binary(operator, left, right)
    }

    /// Builds the node for an identifier.
    ///
    /// Variables should be obtained from `cache`, which is scoped to the current parse.
    fn make_identifier(
        &self,
        identifier: &str,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError>;
}

/// Whether `symbol` occurs in `input` starting at `pos`.
pub fn starts_with(input: &[char], pos: usize, symbol: &str) -> bool {
    let mut chars = input[pos.min(input.len())..].iter();
    symbol.chars().all(|expected| chars.next() == Some(&expected))
}

/// Recognizes `!`, `&&` and `||`.
pub fn c_style_operator(input: &[char], pos: usize) -> Option<Operator> {
    [NOT, AND, OR]
        .iter()
        .find(|op| starts_with(input, pos, op.symbol()))
        .cloned()
}

/// Whether the character is allowed in a C identifier.
pub fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether the text is a non-empty C identifier.
pub fn is_symbol(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_symbol_char)
}

fn make_c_style_unary(operator: &Operator, child: Formula) -> Result<Formula, ExpressionFormatError> {
    match (operator.arity(), operator.symbol()) {
        (Arity::Unary, "!") => Ok(Formula::negation(child)),
        _ => Err(ExpressionFormatError::UnknownOperator {
            operator: operator.symbol().to_owned(),
        }),
    }
}

fn make_c_style_binary(
    operator: &Operator,
    left: Formula,
    right: Formula,
) -> Result<Formula, ExpressionFormatError> {
    match (operator.arity(), operator.symbol()) {
        (Arity::Binary, "&&") => Ok(Formula::conjunction(left, right)),
        (Arity::Binary, "||") => Ok(Formula::disjunction(left, right)),
        _ => Err(ExpressionFormatError::UnknownOperator {
            operator: operator.symbol().to_owned(),
        }),
    }
}
