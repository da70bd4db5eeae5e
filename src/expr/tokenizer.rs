//! # Expression Tokenizer
//!
//! Transforms a field-expression string into a stream of [`Token`]s.
//! Whitespace is not significant in expressions and is skipped rather than
//! preserved. Symbols are matched longest-first so that multi-character
//! operators like `>=` are recognized before `>`.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, recognize},
    error::context,
    sequence::{delimited, pair, preceded, tuple},
};
use thiserror::Error;

use super::token::{Delimiter, Literal, Operator, ParserResult, Token, TokenizerResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenizeError {
    #[error("tokenize error at column {column}: {message}, found: {found}")]
    ParseError {
        message: String,
        found: String,
        column: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    current_column: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokenize(&mut self, input: &str) -> TokenizerResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut remaining = input.trim_start();
        self.current_column = input.len() - remaining.len();

        while !remaining.is_empty() {
            match parse_token(remaining) {
                Ok((new_remaining, token)) => {
                    self.current_column += remaining.len() - new_remaining.len();
                    tokens.push(token);
                    let trimmed = new_remaining.trim_start();
                    self.current_column += new_remaining.len() - trimmed.len();
                    remaining = trimmed;
                }
                Err(_) => {
                    let found = remaining.chars().take(20).collect::<String>();
                    let error = TokenizeError::ParseError {
                        message: "unrecognized input".to_string(),
                        found,
                        column: self.current_column,
                    };
                    tracing::error!("{}", error);
                    return Err(error);
                }
            }
        }

        Ok(tokens)
    }
}

fn parse_token(input: &str) -> ParserResult<Token> {
    alt((
        parse_literal,
        parse_variable,
        parse_identifier,
        parse_operator,
        parse_delimiter,
    ))(input)
}

fn parse_string_literal(input: &str) -> ParserResult<Literal> {
    context(
        "string literal",
        map(
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            |content: &str| Literal::String(content.to_string()),
        ),
    )(input)
}

fn parse_float_literal(input: &str) -> ParserResult<Literal> {
    context(
        "float literal",
        map_res(
            recognize(tuple((digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(Literal::Float),
        ),
    )(input)
}

fn parse_integer_literal(input: &str) -> ParserResult<Literal> {
    context(
        "integer literal",
        map_res(digit1, |s: &str| s.parse::<i64>().map(Literal::Integer)),
    )(input)
}

fn parse_literal(input: &str) -> ParserResult<Token> {
    context(
        "literal",
        map(
            alt((
                parse_string_literal,
                parse_float_literal,
                parse_integer_literal,
            )),
            Token::Literal,
        ),
    )(input)
}

fn parse_variable(input: &str) -> ParserResult<Token> {
    context(
        "variable",
        map(
            preceded(
                char('#'),
                recognize(pair(
                    take_while1(|c: char| c.is_alphabetic() || c == '_'),
                    take_while(|c: char| c.is_alphanumeric() || c == '_'),
                )),
            ),
            |name: &str| Token::Variable(name.to_string()),
        ),
    )(input)
}

fn parse_identifier(input: &str) -> ParserResult<Token> {
    let (input, id) = context(
        "identifier",
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
    )(input)?;

    // true/false/null read as identifiers but are literals
    let token = match id {
        "true" => Token::Literal(Literal::Boolean(true)),
        "false" => Token::Literal(Literal::Boolean(false)),
        "null" => Token::Literal(Literal::Null),
        _ => Token::Identifier(id.to_string()),
    };

    Ok((input, token))
}

fn parse_operator(input: &str) -> ParserResult<Token> {
    context(
        "operator",
        map(
            alt((
                // 2文字の演算子を先に
                map(tag("=="), |_| Operator::EqualEqual),
                map(tag("!="), |_| Operator::NotEqual),
                map(tag(">="), |_| Operator::GreaterEqual),
                map(tag("<="), |_| Operator::LessEqual),
                map(tag("&&"), |_| Operator::And),
                map(tag("||"), |_| Operator::Or),
                map(tag(">"), |_| Operator::Greater),
                map(tag("<"), |_| Operator::Less),
                map(tag("+"), |_| Operator::Plus),
                map(tag("-"), |_| Operator::Minus),
                map(tag("*"), |_| Operator::Multiply),
                map(tag("/"), |_| Operator::Divide),
                map(tag("!"), |_| Operator::Not),
                map(tag("."), |_| Operator::Dot),
            )),
            Token::Operator,
        ),
    )(input)
}

fn parse_delimiter(input: &str) -> ParserResult<Token> {
    context(
        "delimiter",
        map(
            alt((
                map(tag("("), |_| Delimiter::OpenParen),
                map(tag(")"), |_| Delimiter::CloseParen),
                map(tag(","), |_| Delimiter::Comma),
            )),
            Token::Delimiter,
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string() {
        let input = "'hello world'";
        let (rest, result) = parse_string_literal(input).unwrap();
        assert_eq!(rest, "");
        assert_eq!(result, Literal::String("hello world".to_string()));
    }

    #[test]
    fn test_number_literals() {
        let (rest, result) = parse_integer_literal("123").unwrap();
        assert_eq!(result, Literal::Integer(123));
        assert_eq!(rest, "");

        let (rest, result) = parse_float_literal("123.45").unwrap();
        assert_eq!(result, Literal::Float(123.45));
        assert_eq!(rest, "");
    }

    #[test]
    fn test_variable() {
        let (rest, token) = parse_variable("#order_id > 0").unwrap();
        assert_eq!(token, Token::Variable("order_id".to_string()));
        assert_eq!(rest, " > 0");
    }

    #[test]
    fn test_keyword_literals() {
        let mut tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("true false null").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal(Literal::Boolean(true)),
                Token::Literal(Literal::Boolean(false)),
                Token::Literal(Literal::Null),
            ]
        );
    }

    #[test]
    fn test_tokenize_expression() {
        let mut tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("#result.size() > 0").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Variable("result".to_string()),
                Token::Operator(Operator::Dot),
                Token::Identifier("size".to_string()),
                Token::Delimiter(Delimiter::OpenParen),
                Token::Delimiter(Delimiter::CloseParen),
                Token::Operator(Operator::Greater),
                Token::Literal(Literal::Integer(0)),
            ]
        );
    }

    #[test]
    fn test_tokenize_concat() {
        let mut tokenizer = Tokenizer::new();
        let tokens = tokenizer
            .tokenize("'found ' + #result.size() + ' items'")
            .unwrap();
        assert_eq!(tokens.len(), 9);
        assert_eq!(
            tokens[0],
            Token::Literal(Literal::String("found ".to_string()))
        );
        assert_eq!(tokens[1], Token::Operator(Operator::Plus));
    }

    #[test]
    fn test_longest_match() {
        let mut tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("#a != null && #b >= 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Variable("a".to_string()),
                Token::Operator(Operator::NotEqual),
                Token::Literal(Literal::Null),
                Token::Operator(Operator::And),
                Token::Variable("b".to_string()),
                Token::Operator(Operator::GreaterEqual),
                Token::Literal(Literal::Integer(2)),
            ]
        );
    }

    #[test]
    fn test_tokenize_error() {
        let mut tokenizer = Tokenizer::new();
        let result = tokenizer.tokenize("#a ~ 1");
        assert!(matches!(
            result,
            Err(TokenizeError::ParseError { column: 3, .. })
        ));
    }
}
