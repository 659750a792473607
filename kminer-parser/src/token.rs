//! Tokens and the grammar driven lexer.
use std::fmt;

use crate::grammar::Grammar;
use crate::ExpressionFormatError;

/// Whether an operator takes one or two operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    /// Prefix operator applied to the expression on its right.
    Unary,
    /// Infix operator between two expressions.
    Binary,
}

/// An operator recognized by a grammar.
///
/// Among the operators found at the lowest bracket depth of an expression, the one with the
/// highest precedence value becomes the root of the parsed tree, i.e. a higher value means the
/// operator binds looser.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    symbol: &'static str,
    arity: Arity,
    precedence: u32,
}

impl Operator {
    /// Creates a unary operator.
    pub const fn unary(symbol: &'static str, precedence: u32) -> Operator {
        Operator {
            symbol,
            arity: Arity::Unary,
            precedence,
        }
    }

    /// Creates a binary operator.
    pub const fn binary(symbol: &'static str, precedence: u32) -> Operator {
        Operator {
            symbol,
            arity: Arity::Binary,
            precedence,
        }
    }

    /// The text of this operator as it appears in an expression.
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    /// Number of characters the operator occupies in the input.
    pub fn width(&self) -> usize {
        self.symbol.chars().count()
    }
}

/// An opening or closing bracket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bracket {
    Opening,
    Closing,
}

/// A token produced by [`lex`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Bracket(Bracket),
    Operator(Operator),
    Identifier(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Bracket(Bracket::Opening) => write!(f, "opening bracket"),
            Token::Bracket(Bracket::Closing) => write!(f, "closing bracket"),
            Token::Operator(op) => write!(f, "operator '{}'", op.symbol()),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
        }
    }
}

/// Splits an expression into tokens.
///
/// At each position the grammar is asked, in this order, whether an operator starts there,
/// whether the character is whitespace, an opening bracket, a closing bracket or an identifier
/// character. Consecutive identifier characters form a single identifier token.
pub fn lex<G: Grammar + ?Sized>(
    grammar: &G,
    expression: &str,
) -> Result<Vec<Token>, ExpressionFormatError> {
    let input: Vec<char> = expression.chars().collect();
    let mut tokens = vec![];
    let mut in_identifier = false;

    let mut pos = 0;
    while pos < input.len() {
        if let Some(op) = grammar.operator(&input, pos) {
            in_identifier = false;
            pos += op.width().max(1);
            tokens.push(Token::Operator(op));
        } else if grammar.is_whitespace(&input, pos) {
            in_identifier = false;
            pos += 1;
        } else if grammar.is_opening_bracket(&input, pos) {
            in_identifier = false;
            tokens.push(Token::Bracket(Bracket::Opening));
            pos += 1;
        } else if grammar.is_closing_bracket(&input, pos) {
            in_identifier = false;
            tokens.push(Token::Bracket(Bracket::Closing));
            pos += 1;
        } else if grammar.is_identifier_char(&input, pos) {
            match tokens.last_mut() {
                Some(Token::Identifier(name)) if in_identifier => name.push(input[pos]),
                _ => {
                    tokens.push(Token::Identifier(input[pos].to_string()));
                    in_identifier = true;
                }
            }
            pos += 1;
        } else {
            return Err(ExpressionFormatError::InvalidCharacter {
                position: pos,
                character: input[pos],
            });
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grammar::{CStyleGrammar, AND, NOT, OR};

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_owned())
    }

    #[test]
    fn lex_c_style() {
        let tokens = lex(&CStyleGrammar, "!(A_1 &&B)|| c").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Operator(NOT),
                Token::Bracket(Bracket::Opening),
                ident("A_1"),
                Token::Operator(AND),
                ident("B"),
                Token::Bracket(Bracket::Closing),
                Token::Operator(OR),
                ident("c"),
            ]
        );
    }

    #[test]
    fn whitespace_splits_identifiers() {
        let tokens = lex(&CStyleGrammar, "A B").unwrap();
        assert_eq!(tokens, vec![ident("A"), ident("B")]);
    }

    #[test]
    fn invalid_character() {
        assert_eq!(
            lex(&CStyleGrammar, "A & B"),
            Err(ExpressionFormatError::InvalidCharacter {
                position: 2,
                character: '&'
            })
        );
        assert!(lex(&CStyleGrammar, "A ∧ B").is_err());
    }

    #[test]
    fn empty_input() {
        assert_eq!(lex(&CStyleGrammar, "").unwrap(), vec![]);
    }
}
