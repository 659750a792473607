//! Precedence driven recursive parser.
use kminer_formula::{Formula, VariableCache};

use crate::grammar::Grammar;
use crate::token::{lex, Arity, Bracket, Operator, Token};
use crate::ExpressionFormatError;

/// Nesting depth accepted by [`Parser::new`].
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Parses expressions into formulas using a [`Grammar`].
///
/// The token sequence is split at the operator with the lowest bracket depth. Among operators of
/// equal depth the one with the highest precedence value is chosen, and among those the leftmost.
/// This makes chains of equal operators right-leaning: `A && B && C` parses as `A && (B && C)`.
#[derive(Clone, Debug)]
pub struct Parser<G> {
    grammar: G,
    max_depth: usize,
}

impl<G: Grammar + Default> Default for Parser<G> {
    fn default() -> Parser<G> {
        Parser::new(G::default())
    }
}

impl<G: Grammar> Parser<G> {
    pub fn new(grammar: G) -> Parser<G> {
        Parser {
            grammar,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Changes the maximal nesting depth.
    ///
    /// Inputs nested deeper fail with [`ExpressionFormatError::TooDeep`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Parser<G> {
        self.max_depth = max_depth;
        self
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parses an expression.
    ///
    /// Equal identifiers within the expression share a single variable.
    pub fn parse(&self, text: &str) -> Result<Formula, ExpressionFormatError> {
        let mut cache = VariableCache::new();
        self.parse_with_cache(text, &mut cache)
    }

    /// Parses an expression, taking variables from and adding them to `cache`.
    pub fn parse_with_cache(
        &self,
        text: &str,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
        let tokens = lex(&self.grammar, text)?;
        self.parse_tokens(&tokens, 0, cache)
    }

    fn parse_tokens(
        &self,
        tokens: &[Token],
        depth: usize,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
        if depth > self.max_depth {
            return Err(ExpressionFormatError::TooDeep {
                max_depth: self.max_depth,
            });
        }

        match tokens {
            [] => return Err(ExpressionFormatError::MissingIdentifier),
            [Token::Identifier(name)] => return self.grammar.make_identifier(name, cache),
            [other] => {
                return Err(ExpressionFormatError::ExpectedIdentifier {
                    found: other.to_string(),
                })
            }
            _ => (),
        }

        match find_split(tokens)? {
            Some((index, op)) => self.split_at(tokens, index, &op, depth, cache),
            None => {
                let first = &tokens[0];
                let last = &tokens[tokens.len() - 1];
                match (first, last) {
                    (Token::Bracket(Bracket::Opening), Token::Bracket(Bracket::Closing)) => {
                        self.parse_tokens(&tokens[1..tokens.len() - 1], depth + 1, cache)
                    }
                    (Token::Bracket(_), Token::Bracket(_)) => {
                        Err(ExpressionFormatError::UnbalancedBrackets)
                    }
                    _ => Err(ExpressionFormatError::MissingOperator),
                }
            }
        }
    }

    fn split_at(
        &self,
        tokens: &[Token],
        index: usize,
        op: &Operator,
        depth: usize,
        cache: &mut VariableCache,
    ) -> Result<Formula, ExpressionFormatError> {
        match op.arity() {
            Arity::Unary => {
                if index != 0 {
                    return Err(ExpressionFormatError::MisplacedUnaryOperator {
                        operator: op.symbol().to_owned(),
                    });
                }
                let child = self.parse_tokens(&tokens[1..], depth + 1, cache)?;
                self.grammar.make_unary(op, child)
            }
            Arity::Binary => {
                let left = self.parse_tokens(&tokens[..index], depth + 1, cache)?;
                let right = self.parse_tokens(&tokens[index + 1..], depth + 1, cache)?;
                self.grammar.make_binary(op, left, right)
            }
        }
    }
}

/// Finds the operator at which the outermost level of `tokens` is split.
///
/// Returns `None` when no operator appears outside of brackets.
fn find_split(tokens: &[Token]) -> Result<Option<(usize, Operator)>, ExpressionFormatError> {
    let mut level: isize = 0;
    let mut best: Option<(usize, isize, Operator)> = None;

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Bracket(Bracket::Opening) => level += 1,
            Token::Bracket(Bracket::Closing) => {
                level -= 1;
                if level < 0 {
                    return Err(ExpressionFormatError::UnbalancedBrackets);
                }
            }
            Token::Operator(op) => {
                let better = match &best {
                    None => true,
                    Some((_, best_level, best_op)) => {
                        level < *best_level
                            || (level == *best_level && op.precedence() > best_op.precedence())
                    }
                };
                if better {
                    best = Some((index, level, *op));
                }
            }
            Token::Identifier(_) => (),
        }
    }

    if level != 0 {
        return Err(ExpressionFormatError::UnbalancedBrackets);
    }

    Ok(best
        .filter(|&(_, level, _)| level == 0)
        .map(|(index, _, op)| (index, op)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use kminer_formula::{formula::strategy::formula, var, Variable};

    use crate::grammar::CStyleGrammar;

    fn parse(text: &str) -> Result<Formula, ExpressionFormatError> {
        Parser::new(CStyleGrammar).parse(text)
    }

    #[test]
    fn precedence() {
        assert_eq!(parse("!A && B").unwrap(), !var!("A") & var!("B"));
        assert_eq!(
            parse("A && B || C").unwrap(),
            (var!("A") & var!("B")) | var!("C")
        );
        assert_eq!(
            parse("A || B && C").unwrap(),
            var!("A") | (var!("B") & var!("C"))
        );
        assert_eq!(parse("!!A").unwrap(), !!var!("A"));
    }

    #[test]
    fn chains_lean_right() {
        assert_eq!(
            parse("(A && B && (!A || B))").unwrap(),
            var!("A") & (var!("B") & (!var!("A") | var!("B")))
        );
        assert_eq!(
            parse("A || B || C").unwrap(),
            var!("A") | (var!("B") | var!("C"))
        );
    }

    #[test]
    fn redundant_brackets() {
        assert_eq!(parse("((A))").unwrap(), var!("A"));
        assert_eq!(parse("(A) && ((B))").unwrap(), var!("A") & var!("B"));
        assert_eq!(parse("!(A || B)").unwrap(), !(var!("A") | var!("B")));
    }

    #[test]
    fn unbalanced_brackets() {
        assert_eq!(parse("((A)"), Err(ExpressionFormatError::UnbalancedBrackets));
        assert_eq!(parse("(A))"), Err(ExpressionFormatError::UnbalancedBrackets));
        assert_eq!(parse(")A("), Err(ExpressionFormatError::UnbalancedBrackets));
        assert_eq!(
            parse("(A) (B)"),
            Err(ExpressionFormatError::UnbalancedBrackets)
        );
    }

    #[test]
    fn missing_parts() {
        assert_eq!(parse(""), Err(ExpressionFormatError::MissingIdentifier));
        assert_eq!(parse("()"), Err(ExpressionFormatError::MissingIdentifier));
        assert_eq!(parse("A &&"), Err(ExpressionFormatError::MissingIdentifier));
        assert_eq!(parse("&& A"), Err(ExpressionFormatError::MissingIdentifier));
        assert!(parse("||").is_err());
        assert_eq!(
            parse("(||)"),
            Err(ExpressionFormatError::ExpectedIdentifier {
                found: "operator '||'".to_owned()
            })
        );
        assert_eq!(parse("A B"), Err(ExpressionFormatError::MissingOperator));
        assert_eq!(
            parse("(A && B) C"),
            Err(ExpressionFormatError::MissingOperator)
        );
        assert_eq!(
            parse("!"),
            Err(ExpressionFormatError::ExpectedIdentifier {
                found: "operator '!'".to_owned()
            })
        );
    }

    #[test]
    fn misplaced_unary_operator() {
        assert_eq!(
            parse("A !"),
            Err(ExpressionFormatError::MisplacedUnaryOperator {
                operator: "!".to_owned()
            })
        );
    }

    #[test]
    fn depth_limit() {
        let parser = Parser::new(CStyleGrammar).with_max_depth(3);
        assert_eq!(parser.parse("!!A").unwrap(), !!var!("A"));
        assert_eq!(
            parser.parse("!!!!A"),
            Err(ExpressionFormatError::TooDeep { max_depth: 3 })
        );

        let nested = format!("{}A{}", "(".repeat(1500), ")".repeat(1500));
        assert_eq!(
            parse(&nested),
            Err(ExpressionFormatError::TooDeep {
                max_depth: DEFAULT_MAX_DEPTH
            })
        );
    }

    #[test]
    fn variables_are_shared() {
        let parser = Parser::<CStyleGrammar>::default();
        let mut cache = VariableCache::new();

        let first = parser.parse_with_cache("A && B", &mut cache).unwrap();
        let second = parser.parse_with_cache("!A", &mut cache).unwrap();
        assert_eq!(cache.len(), 2);

        let a1: Vec<Variable> = first.variables();
        let a2: Vec<Variable> = second.variables();
        assert!(a1[0].ptr_eq(&a2[0]));
        assert!(!a1[1].ptr_eq(&a2[0]));
    }

    proptest! {
        #[test]
        fn rendering_parses_back(formula in formula(5, 6)) {
            let text = formula.to_string();
            prop_assert_eq!(parse(&text).unwrap(), formula);
        }
    }
}
