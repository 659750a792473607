//! Presence conditions as emitted by the variability-aware extraction tool.
use kminer_formula::{Formula, VariableCache};

use super::{c_style_operator, is_symbol, is_symbol_char, Grammar};
use crate::token::Operator;
use crate::ExpressionFormatError;

/// Function-call forms that test whether a symbol is defined.
const DEFINED_CALLS: [&str; 2] = ["defined", "definedEx"];

/// Grammar for `defined(SYM)`-style presence conditions.
///
/// `defined(SYM)` and `definedEx(SYM)` both become the variable `SYM`. Bare identifiers are plain
/// variables and `1`/`0` are constants. Other function-call forms are rejected.
#[derive(Copy, Clone, Debug, Default)]
pub struct TypeChefGrammar;

/// The run of identifier characters ending right before `end`.
fn word_before(input: &[char], end: usize) -> &[char] {
    let start = input[..end]
        .iter()
        .rposition(|&c| !is_symbol_char(c))
        .map_or(0, |pos| pos + 1);
    &input[start..end]
}

/// Whether the `(` at `pos` opens a `defined(...)` call.
fn opens_call(input: &[char], pos: usize) -> bool {
    if input[pos] != '(' {
        return false;
    }
    let word = word_before(input, pos);
    DEFINED_CALLS
        .iter()
        .any(|call| word.iter().cloned().eq(call.chars()))
}

/// Whether the `)` at `pos` closes a `defined(...)` call.
fn closes_call(input: &[char], pos: usize) -> bool {
    if input[pos] != ')' {
        return false;
    }
    let start = pos - word_before(input, pos).len();
    start > 0 && opens_call(input, start - 1)
}

impl Grammar for TypeChefGrammar {
    fn operator(&self, input: &[char], pos: usize) -> Option<Operator> {
        c_style_operator(input, pos)
    }

    fn is_whitespace(&self, input: &[char], pos: usize) -> bool {
        matches!(input[pos], ' ' | '\t' | '\r' | '\n')
    }

    fn is_opening_bracket(&self, input: &[char], pos: usize) -> bool {
        input[pos] == '(' && !opens_call(input, pos)
    }

    fn is_closing_bracket(&self, input: &[char], pos: usize) -> bool {
        input[pos] == ')' && !closes_call(input, pos)
    }

    fn is_identifier_char(&self, input: &[char], pos: usize) -> bool {
        is_symbol_char(input[pos]) || opens_call(input, pos) || closes_call(input, pos)
    }

    fn make_identifier(
        &self,
        identifier: &str,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
        for call in DEFINED_CALLS.iter() {
            let argument = identifier
                .strip_prefix(call)
                .and_then(|rest| rest.strip_prefix('('))
                .and_then(|rest| rest.strip_suffix(')'));

            if let Some(symbol) = argument {
                if is_symbol(symbol) {
                    return Ok(Formula::Variable(cache.variable(symbol)));
                }
            }
        }

        match identifier {
            "1" => Ok(Formula::TRUE),
            "0" => Ok(Formula::FALSE),
            symbol if is_symbol(symbol) => Ok(Formula::Variable(cache.variable(symbol))),
            _ => Err(ExpressionFormatError::InvalidIdentifier {
                identifier: identifier.to_owned(),
            }),
        }
    }
}
