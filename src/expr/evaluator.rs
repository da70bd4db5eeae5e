//! # Expression Evaluator
//!
//! Evaluates parsed field expressions against a variable scope. Parsed ASTs
//! are cached per expression string, since the same operation definitions are
//! evaluated on every call.
//!
//! The callable surface is deliberately narrow: a fixed set of value methods
//! (`size`, `length`, `isEmpty`, `contains`, `toString`), the built-in
//! functions `len`/`sum`/`avg`, and functions registered through
//! [`FunctionRegistry`]. Expressions cannot reach anything else.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::functions::FunctionRegistry;
use super::parser::{parse_expression, ParseError};
use super::tokenizer::{TokenizeError, Tokenizer};
use super::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("eval error: {0}")]
    Eval(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid function name: {0}")]
    InvalidFunctionName(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Read access to call-scoped variables (`#name`).
pub trait VariableScope {
    fn lookup_variable(&self, name: &str) -> Option<Value>;
}

impl VariableScope for HashMap<String, Value> {
    fn lookup_variable(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

pub struct ExpressionEvaluator {
    cache: DashMap<String, Arc<Expr>>,
    functions: FunctionRegistry,
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new(FunctionRegistry::new())
    }
}

impl ExpressionEvaluator {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self {
            cache: DashMap::new(),
            functions,
        }
    }

    /// Parses an expression, reusing the cached AST when available.
    pub fn parse(&self, expression: &str) -> EvalResult<Arc<Expr>> {
        if let Some(cached) = self.cache.get(expression) {
            return Ok(cached.value().clone());
        }
        let tokens = Tokenizer::new().tokenize(expression)?;
        let parsed = Arc::new(parse_expression(&tokens)?);
        self.cache
            .insert(expression.to_string(), parsed.clone());
        Ok(parsed)
    }

    pub fn eval(&self, expression: &str, scope: &dyn VariableScope) -> EvalResult<Value> {
        let expr = self.parse(expression)?;
        self.eval_expr(&expr, scope)
    }

    /// Evaluates `condition`/`success` expressions: only boolean `true` is
    /// true, a null or non-boolean result is `false`.
    pub fn eval_boolean(&self, expression: &str, scope: &dyn VariableScope) -> EvalResult<bool> {
        let value = self.eval(expression, scope)?;
        Ok(matches!(value, Value::Boolean(true)))
    }

    /// Evaluates `bizId`/`bizType`/`tag`/`operatorId` expressions: null
    /// yields `None`, strings pass through, other values are rendered.
    pub fn eval_string(
        &self,
        expression: &str,
        scope: &dyn VariableScope,
    ) -> EvalResult<Option<String>> {
        match self.eval(expression, scope)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Evaluates `msg`/`extra` expressions: strings pass through, anything
    /// else is serialized to JSON, null yields `None`.
    pub fn eval_string_or_json(
        &self,
        expression: &str,
        scope: &dyn VariableScope,
    ) -> EvalResult<Option<String>> {
        match self.eval(expression, scope)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => other
                .to_json_string()
                .map(Some)
                .map_err(|e| EvalError::Eval(format!("serialize to json: {}", e))),
        }
    }

    fn eval_expr(&self, expr: &Expr, scope: &dyn VariableScope) -> EvalResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            // 未定義の変数はnull
            Expr::Variable(name) => Ok(scope.lookup_variable(name).unwrap_or_default()),
            Expr::Property { target, name } => {
                let target = self.eval_expr(target, scope)?;
                self.eval_property(&target, name)
            }
            Expr::MethodCall {
                target,
                method,
                arguments,
            } => {
                let target = self.eval_expr(target, scope)?;
                let arguments = self.eval_arguments(arguments, scope)?;
                self.eval_method(&target, method, &arguments)
            }
            Expr::FunctionCall {
                function,
                arguments,
            } => {
                let arguments = self.eval_arguments(arguments, scope)?;
                self.eval_function_call(function, &arguments)
            }
            Expr::UnaryOp { op, operand } => {
                let operand = self.eval_expr(operand, scope)?;
                self.eval_unary_op(*op, &operand)
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.eval_expr(left, scope)?;
                let right = self.eval_expr(right, scope)?;
                self.eval_binary_op(*op, &left, &right)
            }
        }
    }

    fn eval_arguments(
        &self,
        arguments: &[Expr],
        scope: &dyn VariableScope,
    ) -> EvalResult<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.eval_expr(argument, scope))
            .collect()
    }

    fn eval_property(&self, target: &Value, name: &str) -> EvalResult<Value> {
        match target {
            Value::Map(fields) => Ok(fields.get(name).cloned().unwrap_or_default()),
            Value::Null => Err(EvalError::Eval(format!(
                "property '{}' accessed on null",
                name
            ))),
            other => Err(EvalError::Eval(format!(
                "property '{}' requires a map, but got {:?}",
                name, other
            ))),
        }
    }

    fn eval_method(&self, target: &Value, method: &str, args: &[Value]) -> EvalResult<Value> {
        match (method, args) {
            ("size" | "length", []) => match target {
                Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
                Value::List(l) => Ok(Value::Integer(l.len() as i64)),
                Value::Map(m) => Ok(Value::Integer(m.len() as i64)),
                other => Err(EvalError::Eval(format!(
                    "{} requires string, list, or map, but got {:?}",
                    method, other
                ))),
            },
            ("isEmpty", []) => match target {
                Value::String(s) => Ok(Value::Boolean(s.is_empty())),
                Value::List(l) => Ok(Value::Boolean(l.is_empty())),
                Value::Map(m) => Ok(Value::Boolean(m.is_empty())),
                other => Err(EvalError::Eval(format!(
                    "isEmpty requires string, list, or map, but got {:?}",
                    other
                ))),
            },
            ("contains", [needle]) => match (target, needle) {
                (Value::String(s), Value::String(sub)) => Ok(Value::Boolean(s.contains(sub))),
                (Value::List(l), needle) => Ok(Value::Boolean(l.contains(needle))),
                (Value::Map(m), Value::String(key)) => Ok(Value::Boolean(m.contains_key(key))),
                (target, needle) => Err(EvalError::Eval(format!(
                    "contains not supported for {:?} and {:?}",
                    target, needle
                ))),
            },
            ("toString", []) => Ok(Value::String(target.to_string())),
            _ => Err(EvalError::Eval(format!(
                "unknown method '{}' with {} argument(s)",
                method,
                args.len()
            ))),
        }
    }

    fn eval_function_call(&self, function: &str, args: &[Value]) -> EvalResult<Value> {
        match function {
            "len" => self.eval_len_function(args),
            "sum" => self.eval_sum_function(args),
            "avg" => self.eval_avg_function(args),
            _ => match self.functions.lookup(function) {
                Some(custom) => custom(args),
                None => Err(EvalError::UnknownFunction(function.to_string())),
            },
        }
    }

    // 以下、組み込み関数の実装

    fn eval_len_function(&self, args: &[Value]) -> EvalResult<Value> {
        if args.len() != 1 {
            return Err(EvalError::Eval(
                "len function requires exactly one argument".to_string(),
            ));
        }

        match &args[0] {
            Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
            Value::List(l) => Ok(Value::Integer(l.len() as i64)),
            Value::Map(m) => Ok(Value::Integer(m.len() as i64)),
            _ => Err(EvalError::Eval(format!(
                "len function requires string, list, or map, but got {:?}",
                args[0]
            ))),
        }
    }

    fn eval_sum_function(&self, args: &[Value]) -> EvalResult<Value> {
        if args.len() != 1 {
            return Err(EvalError::Eval(
                "sum function requires exactly one argument".to_string(),
            ));
        }

        match &args[0] {
            Value::List(list) => {
                let mut sum_int = 0i64;
                let mut sum_float = 0.0;
                let mut using_float = false;

                for value in list {
                    match value {
                        Value::Integer(i) => {
                            if using_float {
                                sum_float += *i as f64;
                            } else {
                                sum_int += i;
                            }
                        }
                        Value::Float(f) => {
                            if !using_float {
                                sum_float = sum_int as f64;
                                using_float = true;
                            }
                            sum_float += f;
                        }
                        _ => {
                            return Err(EvalError::Eval(format!(
                                "sum function requires list of numbers, but got {:?}",
                                value
                            )));
                        }
                    }
                }

                if using_float {
                    Ok(Value::Float(sum_float))
                } else {
                    Ok(Value::Integer(sum_int))
                }
            }
            _ => Err(EvalError::Eval(format!(
                "sum function requires list of numbers, but got {:?}",
                args[0]
            ))),
        }
    }

    fn eval_avg_function(&self, args: &[Value]) -> EvalResult<Value> {
        if args.len() != 1 {
            return Err(EvalError::Eval(
                "avg function requires exactly one argument".to_string(),
            ));
        }

        match &args[0] {
            Value::List(list) => {
                if list.is_empty() {
                    return Err(EvalError::Eval(
                        "cannot calculate average of empty list".to_string(),
                    ));
                }

                let sum = self.eval_sum_function(args)?;
                match sum {
                    Value::Integer(i) => Ok(Value::Float(i as f64 / list.len() as f64)),
                    Value::Float(f) => Ok(Value::Float(f / list.len() as f64)),
                    _ => unreachable!(),
                }
            }
            _ => Err(EvalError::Eval(format!(
                "avg function requires list of numbers, but got {:?}",
                args[0]
            ))),
        }
    }

    fn eval_unary_op(&self, op: UnaryOperator, operand: &Value) -> EvalResult<Value> {
        match op {
            UnaryOperator::Not => match operand {
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                other => Err(EvalError::Eval(format!("!{:?}", other))),
            },
            UnaryOperator::Negate => match operand {
                Value::Integer(i) => Ok(Value::Integer(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(EvalError::Eval(format!("-{:?}", other))),
            },
        }
    }

    fn eval_binary_op(&self, op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
        match op {
            BinaryOperator::Add => self.eval_add(left, right),
            BinaryOperator::Subtract => self.eval_subtract(left, right),
            BinaryOperator::Multiply => self.eval_multiply(left, right),
            BinaryOperator::Divide => self.eval_divide(left, right),
            BinaryOperator::Equal => self.eval_equal(left, right),
            BinaryOperator::NotEqual => self.eval_not_equal(left, right),
            BinaryOperator::LessThan => self.eval_less_than(left, right),
            BinaryOperator::GreaterThan => self.eval_greater_than(left, right),
            BinaryOperator::LessThanEqual => self.eval_less_than_equal(left, right),
            BinaryOperator::GreaterThanEqual => self.eval_greater_than_equal(left, right),
            BinaryOperator::And => self.eval_and(left, right),
            BinaryOperator::Or => self.eval_or(left, right),
        }
    }

    // 二項演算子の実装

    fn eval_add(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l + r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l + r)),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(*l as f64 + r)),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(l + *r as f64)),
            (Value::String(l), Value::String(r)) => Ok(Value::String(l.clone() + r)),
            // 文字列連結は非文字列側を描画する
            (Value::String(l), r) => Ok(Value::String(format!("{}{}", l, r))),
            (l, Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
            _ => Err(EvalError::Eval(format!("{:?} + {:?}", left, right))),
        }
    }

    fn eval_subtract(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l - r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l - r)),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(*l as f64 - r)),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(l - *r as f64)),
            _ => Err(EvalError::Eval(format!("{:?} - {:?}", left, right))),
        }
    }

    fn eval_multiply(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l * r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l * r)),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(*l as f64 * r)),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(l * *r as f64)),
            _ => Err(EvalError::Eval(format!("{:?} * {:?}", left, right))),
        }
    }

    fn eval_divide(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => {
                if *r == 0 {
                    return Err(EvalError::Eval("division by zero".to_string()));
                }
                Ok(Value::Float(*l as f64 / *r as f64))
            }
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l / r)),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(*l as f64 / r)),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(l / *r as f64)),
            _ => Err(EvalError::Eval(format!("{:?} / {:?}", left, right))),
        }
    }

    fn eval_equal(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        Ok(Value::Boolean(left == right))
    }

    fn eval_not_equal(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        Ok(Value::Boolean(left != right))
    }

    fn eval_less_than(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        self.compare_values(left, right, |ordering| ordering.is_lt())
    }

    fn eval_greater_than(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        self.compare_values(left, right, |ordering| ordering.is_gt())
    }

    fn eval_less_than_equal(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        self.compare_values(left, right, |ordering| ordering.is_le())
    }

    fn eval_greater_than_equal(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        self.compare_values(left, right, |ordering| ordering.is_ge())
    }

    fn eval_and(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(*l && *r)),
            _ => Err(EvalError::Eval(format!("{:?} && {:?}", left, right))),
        }
    }

    fn eval_or(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(*l || *r)),
            _ => Err(EvalError::Eval(format!("{:?} || {:?}", left, right))),
        }
    }

    fn compare_values<F>(&self, left: &Value, right: &Value, check: F) -> EvalResult<Value>
    where
        F: Fn(std::cmp::Ordering) -> bool,
    {
        let ordering = match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => l.partial_cmp(r),
            (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
            (Value::Integer(l), Value::Float(r)) => (*l as f64).partial_cmp(r),
            (Value::Float(l), Value::Integer(r)) => l.partial_cmp(&(*r as f64)),
            (Value::String(l), Value::String(r)) => l.partial_cmp(r),
            _ => None,
        };
        match ordering {
            Some(ordering) => Ok(Value::Boolean(check(ordering))),
            None => Err(EvalError::Eval(format!(
                "cannot compare {:?} and {:?}",
                left, right
            ))),
        }
    }
}
