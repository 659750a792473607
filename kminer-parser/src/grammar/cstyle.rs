//! Generic C-style boolean expressions.
use kminer_formula::{Formula, VariableCache};

use super::{c_style_operator, is_symbol, is_symbol_char, Grammar};
use crate::token::Operator;
use crate::ExpressionFormatError;

/// Grammar for C-style boolean expressions.
///
/// Examples: `A && B`, `AaA_bcd || D && !E`, `((A && B) || !(C || B)) && !E`.
///
/// Identifiers consist of `[a-zA-Z0-9_]`. The identifiers `1` and `0` denote the constants
/// `true` and `false`, matching how formulas are rendered.
#[derive(Copy, Clone, Debug, Default)]
pub struct CStyleGrammar;

impl Grammar for CStyleGrammar {
    fn operator(&self, input: &[char], pos: usize) -> Option<Operator> {
        c_style_operator(input, pos)
    }

    fn is_whitespace(&self, input: &[char], pos: usize) -> bool {
        matches!(input[pos], ' ' | '\t' | '\r' | '\n')
    }

    fn is_opening_bracket(&self, input: &[char], pos: usize) -> bool {
        input[pos] == '('
    }

    fn is_closing_bracket(&self, input: &[char], pos: usize) -> bool {
        input[pos] == ')'
    }

    fn is_identifier_char(&self, input: &[char], pos: usize) -> bool {
        is_symbol_char(input[pos])
    }

    fn make_identifier(
        &self,
        identifier: &str,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
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
