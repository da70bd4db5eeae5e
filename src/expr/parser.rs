//! # Expression Parser
//!
//! Recursive-descent parser from the token stream to [`Expr`].
//!
//! Precedence, loosest first: `||`, `&&`, `==`/`!=`, comparisons,
//! `+`/`-`, `*`/`/`, unary `!`/`-`, then postfix `.property` /
//! `.method(args)`. Parentheses group.

use thiserror::Error;

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::token::{Delimiter, Operator, Token};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("parse error at token {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("unexpected end of expression")]
    UnexpectedEof,
    #[error("parse error at token {position}: trailing input after expression")]
    TrailingTokens { position: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a complete expression; the whole token stream must be consumed.
pub fn parse_expression(tokens: &[Token]) -> ParseResult<Expr> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return Err(ParseError::TrailingTokens {
            position: parser.pos,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> ParseResult<&'a Token> {
        let token = self.tokens.get(self.pos).ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.to_string(),
                position: self.pos,
            },
            None => ParseError::UnexpectedEof,
        }
    }

    /// Consumes the operator if it is next and reports whether it did.
    fn eat_operator(&mut self, op: &Operator) -> bool {
        if self.peek() == Some(&Token::Operator(op.clone())) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_delimiter(&mut self, delim: &Delimiter) -> bool {
        if self.peek() == Some(&Token::Delimiter(delim.clone())) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_delimiter(&mut self, delim: Delimiter) -> ParseResult<()> {
        if self.eat_delimiter(&delim) {
            Ok(())
        } else {
            Err(self.unexpected(delim.as_ref()))
        }
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_operator(&Operator::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat_operator(&Operator::And) {
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.eat_operator(&Operator::EqualEqual) {
                BinaryOperator::Equal
            } else if self.eat_operator(&Operator::NotEqual) {
                BinaryOperator::NotEqual
            } else {
                return Ok(left);
            };
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_operator(&Operator::Less) {
                BinaryOperator::LessThan
            } else if self.eat_operator(&Operator::LessEqual) {
                BinaryOperator::LessThanEqual
            } else if self.eat_operator(&Operator::Greater) {
                BinaryOperator::GreaterThan
            } else if self.eat_operator(&Operator::GreaterEqual) {
                BinaryOperator::GreaterThanEqual
            } else {
                return Ok(left);
            };
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_operator(&Operator::Plus) {
                BinaryOperator::Add
            } else if self.eat_operator(&Operator::Minus) {
                BinaryOperator::Subtract
            } else {
                return Ok(left);
            };
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_operator(&Operator::Multiply) {
                BinaryOperator::Multiply
            } else if self.eat_operator(&Operator::Divide) {
                BinaryOperator::Divide
            } else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.eat_operator(&Operator::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        if self.eat_operator(&Operator::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat_operator(&Operator::Dot) {
            let name = match self.advance()? {
                Token::Identifier(name) => name.clone(),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("property or method name"));
                }
            };
            if self.eat_delimiter(&Delimiter::OpenParen) {
                let arguments = self.parse_arguments()?;
                expr = Expr::MethodCall {
                    target: Box::new(expr),
                    method: name,
                    arguments,
                };
            } else {
                expr = Expr::Property {
                    target: Box::new(expr),
                    name,
                };
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(Token::Literal(lit)) => {
                self.pos += 1;
                Ok(Expr::Literal(lit.clone()))
            }
            Some(Token::Variable(name)) => {
                self.pos += 1;
                Ok(Expr::Variable(name.clone()))
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                if self.eat_delimiter(&Delimiter::OpenParen) {
                    let arguments = self.parse_arguments()?;
                    Ok(Expr::FunctionCall {
                        function: name,
                        arguments,
                    })
                } else {
                    self.pos -= 1;
                    Err(self.unexpected("function call, #variable or literal"))
                }
            }
            Some(Token::Delimiter(Delimiter::OpenParen)) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.expect_delimiter(Delimiter::CloseParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parses a `(`-consumed argument list up to and including `)`.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut arguments = Vec::new();
        if self.eat_delimiter(&Delimiter::CloseParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_or()?);
            if self.eat_delimiter(&Delimiter::Comma) {
                continue;
            }
            self.expect_delimiter(Delimiter::CloseParen)?;
            return Ok(arguments);
        }
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::token::Literal;
    use crate::expr::tokenizer::Tokenizer;

    fn parse(input: &str) -> ParseResult<Expr> {
        let tokens = Tokenizer::new().tokenize(input).expect("tokenize");
        parse_expression(&tokens)
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            parse("'hello'").unwrap(),
            Expr::Literal(Literal::String("hello".to_string()))
        );
        assert_eq!(parse("null").unwrap(), Expr::Literal(Literal::Null));
    }

    #[test]
    fn test_parse_condition() {
        let expr = parse("#result != null").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::NotEqual,
                left: Box::new(Expr::Variable("result".to_string())),
                right: Box::new(Expr::Literal(Literal::Null)),
            }
        );
    }

    #[test]
    fn test_parse_method_call() {
        let expr = parse("#result.size() > 0").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::GreaterThan,
                left: Box::new(Expr::MethodCall {
                    target: Box::new(Expr::Variable("result".to_string())),
                    method: "size".to_string(),
                    arguments: vec![],
                }),
                right: Box::new(Expr::Literal(Literal::Integer(0))),
            }
        );
    }

    #[test]
    fn test_parse_property_chain() {
        let expr = parse("#order.customer.name").unwrap();
        assert_eq!(
            expr,
            Expr::Property {
                target: Box::new(Expr::Property {
                    target: Box::new(Expr::Variable("order".to_string())),
                    name: "customer".to_string(),
                }),
                name: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_precedence() {
        // a || b && c  =>  a || (b && c)
        let expr = parse("#a || #b && #c").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                left: Box::new(Expr::Variable("a".to_string())),
                right: Box::new(Expr::BinaryOp {
                    op: BinaryOperator::And,
                    left: Box::new(Expr::Variable("b".to_string())),
                    right: Box::new(Expr::Variable("c".to_string())),
                }),
            }
        );

        // 1 + 2 * 3  =>  1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        assert!(matches!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_grouping() {
        // (1 + 2) * 3
        let expr = parse("(1 + 2) * 3").unwrap();
        assert!(matches!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_function_call() {
        let expr = parse("len(#items, )").unwrap_err();
        assert!(matches!(expr, ParseError::UnexpectedToken { .. }));

        let expr = parse("len(#items)").unwrap();
        assert_eq!(
            expr,
            Expr::FunctionCall {
                function: "len".to_string(),
                arguments: vec![Expr::Variable("items".to_string())],
            }
        );
    }

    #[test]
    fn test_parse_unary() {
        let expr = parse("!#flag").unwrap();
        assert_eq!(
            expr,
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(Expr::Variable("flag".to_string())),
            }
        );
    }

    #[test]
    fn test_bare_identifier_is_error() {
        assert!(matches!(
            parse("result"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_trailing_tokens() {
        assert!(matches!(
            parse("#a #b"),
            Err(ParseError::TrailingTokens { .. })
        ));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(parse("#a +"), Err(ParseError::UnexpectedEof)));
        assert!(matches!(parse(""), Err(ParseError::UnexpectedEof)));
    }
}
