//! # Expression Token Model
//!
//! Tokens recognized by the field-expression language. Expressions are short,
//! single-line formulas (`#result.size() > 0`), so the token set is small:
//! context variables, identifiers, literals, operators and delimiters.

use nom::{error::VerboseError, IResult};
use strum_macros::{AsRefStr, Display, EnumString};

use super::tokenizer::TokenizeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Context variable reference (`#name`)
    Variable(String),
    /// Bare identifier, used for function names, property and method names
    Identifier(String),
    Literal(Literal),
    Operator(Operator),
    Delimiter(Delimiter),
}

/// Literal values shared between the tokenizer and the AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Single-quoted string (`'found'`)
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

/// Operators of the expression language.
///
/// Matched longest-first so that `!=` is not read as `!` followed by `=`.
#[derive(Debug, Clone, PartialEq, EnumString, Display, AsRefStr)]
pub enum Operator {
    /// Member access operator (`.`)
    #[strum(serialize = ".")]
    Dot,

    /// Equality comparison operator (`==`)
    #[strum(serialize = "==")]
    EqualEqual,
    /// Inequality comparison operator (`!=`)
    #[strum(serialize = "!=")]
    NotEqual,
    /// Greater than comparison operator (`>`)
    #[strum(serialize = ">")]
    Greater,
    /// Greater than or equal comparison operator (`>=`)
    #[strum(serialize = ">=")]
    GreaterEqual,
    /// Less than comparison operator (`<`)
    #[strum(serialize = "<")]
    Less,
    /// Less than or equal comparison operator (`<=`)
    #[strum(serialize = "<=")]
    LessEqual,

    /// Addition and string concatenation operator (`+`)
    #[strum(serialize = "+")]
    Plus,
    /// Subtraction operator (`-`)
    #[strum(serialize = "-")]
    Minus,
    /// Multiplication operator (`*`)
    #[strum(serialize = "*")]
    Multiply,
    /// Division operator (`/`)
    #[strum(serialize = "/")]
    Divide,

    /// Logical AND operator (`&&`)
    #[strum(serialize = "&&")]
    And,
    /// Logical OR operator (`||`)
    #[strum(serialize = "||")]
    Or,
    /// Logical NOT operator (`!`)
    #[strum(serialize = "!")]
    Not,
}

/// Delimiters of the expression language.
#[derive(Debug, Clone, PartialEq, EnumString, Display, AsRefStr)]
pub enum Delimiter {
    /// Opening parenthesis (`(`) for grouping and call arguments
    #[strum(serialize = "(")]
    OpenParen,
    /// Closing parenthesis (`)`)
    #[strum(serialize = ")")]
    CloseParen,
    /// Argument separator (`,`)
    #[strum(serialize = ",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Variable(name) => write!(f, "#{}", name),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Literal(Literal::String(s)) => write!(f, "'{}'", s),
            Token::Literal(Literal::Integer(i)) => write!(f, "{}", i),
            Token::Literal(Literal::Float(v)) => write!(f, "{}", v),
            Token::Literal(Literal::Boolean(b)) => write!(f, "{}", b),
            Token::Literal(Literal::Null) => write!(f, "null"),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Delimiter(delim) => write!(f, "{}", delim),
        }
    }
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type TokenizerResult<T> = Result<T, TokenizeError>;
