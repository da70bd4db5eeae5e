//! # Field Expression Language
//!
//! A small expression language for deriving audit fields from call-scoped
//! variables, e.g. `#order.id`, `#result.size() > 0`,
//! `'found ' + #result.size() + ' items'`.
//!
//! Pipeline: [`tokenizer`] → [`parser`] → [`evaluator`].

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod token;
pub mod tokenizer;
pub mod value;

pub use evaluator::{EvalError, EvalResult, ExpressionEvaluator, VariableScope};
pub use functions::{CustomFunction, FunctionRegistry};
pub use value::Value;
