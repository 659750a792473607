//! Presence conditions as emitted by the build-system fact miner.
use kminer_formula::{Formula, VariableCache};

use super::{c_style_operator, is_symbol, is_symbol_char, Grammar};
use crate::token::Operator;
use crate::ExpressionFormatError;

/// Prefix used for configuration symbols by default.
pub const DEFAULT_PREFIX: &str = "CONFIG_";

/// Grammar for the build-system dialect.
///
/// Comparisons of a symbol against a tristate value are mapped onto variables:
///
/// * `SYM == "y"` and `SYM == "yes"` become `CONFIG_SYM`,
/// * `SYM == "m"` becomes `CONFIG_SYM_MODULE`,
/// * `SYM != ...` becomes the negation of the corresponding `==` comparison,
/// * `[TRUE]` is the constant `true`.
///
/// Operators are `!`, `&&` and `||` as in C. Bare identifiers are plain variables, except for `1`
/// and `0`, which are the constants as in rendered formulas.
#[derive(Clone, Debug)]
pub struct KbuildGrammar {
    prefix: String,
}

impl Default for KbuildGrammar {
    fn default() -> KbuildGrammar {
        KbuildGrammar::new()
    }
}

impl KbuildGrammar {
    /// Grammar using the `CONFIG_` prefix.
    pub fn new() -> KbuildGrammar {
        KbuildGrammar::with_prefix(DEFAULT_PREFIX)
    }

    /// Grammar prepending `prefix` to compared symbols.
    pub fn with_prefix(prefix: impl Into<String>) -> KbuildGrammar {
        KbuildGrammar {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn comparison(
        &self,
        identifier: &str,
        symbol: &str,
        value: &str,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
        if !is_symbol(symbol) {
            return Err(invalid(identifier));
        }
        let name = match value {
            "\"y\"" | "\"yes\"" => format!("{}{}", self.prefix, symbol),
            "\"m\"" => format!("{}{}_MODULE", self.prefix, symbol),
            _ => return Err(invalid(identifier)),
        };
        Ok(Formula::Variable(cache.variable(&name)))
    }
}

fn invalid(identifier: &str) -> ExpressionFormatError {
    ExpressionFormatError::InvalidIdentifier {
        identifier: identifier.to_owned(),
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Whether the blank at `pos` sits inside a comparison like `SYM == "y"`.
fn inside_comparison(input: &[char], pos: usize) -> bool {
    let previous = input[..pos].iter().rev().find(|&&c| !is_blank(c));
    let next = input[pos + 1..].iter().position(|&c| !is_blank(c));

    if previous == Some(&'=') {
        return true;
    }

    match next.map(|offset| pos + 1 + offset) {
        Some(next) => {
            input[next] == '=' || (input[next] == '!' && input.get(next + 1) == Some(&'='))
        }
        None => false,
    }
}

impl Grammar for KbuildGrammar {
    fn operator(&self, input: &[char], pos: usize) -> Option<Operator> {
        if input[pos] == '!' && input.get(pos + 1) == Some(&'=') {
            return None;
        }
        c_style_operator(input, pos)
    }

    fn is_whitespace(&self, input: &[char], pos: usize) -> bool {
        is_blank(input[pos]) && !inside_comparison(input, pos)
    }

    fn is_opening_bracket(&self, input: &[char], pos: usize) -> bool {
        input[pos] == '('
    }

    fn is_closing_bracket(&self, input: &[char], pos: usize) -> bool {
        input[pos] == ')'
    }

    fn is_identifier_char(&self, input: &[char], pos: usize) -> bool {
        match input[pos] {
            '!' | '=' | '"' | '[' | ']' => true,
            c if is_blank(c) => inside_comparison(input, pos),
            c => is_symbol_char(c),
        }
    }

    fn make_identifier(
        &self,
        identifier: &str,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
        let compact: String = identifier.chars().filter(|&c| !is_blank(c)).collect();

        if compact.contains('[') || compact.contains(']') {
            return if compact == "[TRUE]" {
                Ok(Formula::TRUE)
            } else {
                Err(invalid(identifier))
            };
        }

        match compact.as_str() {
            "1" => return Ok(Formula::TRUE),
            "0" => return Ok(Formula::FALSE),
            _ => (),
        }

        if let Some(pos) = compact.find("==") {
            self.comparison(identifier, &compact[..pos], &compact[pos + 2..], cache)
        } else if let Some(pos) = compact.find("!=") {
            let equal = self.comparison(identifier, &compact[..pos], &compact[pos + 2..], cache)?;
            Ok(Formula::negation(equal))
        } else if is_symbol(&compact) {
            Ok(Formula::Variable(cache.variable(&compact)))
        } else {
            Err(invalid(identifier))
        }
    }
}
