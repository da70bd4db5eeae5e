//! # Custom Function Registry
//!
//! Named functions callable from field expressions, e.g. `maskPhone(#phone)`.
//! Built-in functions (`len`, `sum`, `avg`) are handled by the evaluator;
//! the registry holds application-registered extensions.

use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::evaluator::{EvalError, EvalResult};
use super::value::Value;

lazy_static! {
    static ref FUNCTION_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid function name pattern");
}

pub type CustomFunction = dyn Fn(&[Value]) -> EvalResult<Value> + Send + Sync;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: Arc<DashMap<String, Arc<CustomFunction>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under `name`. Re-registering replaces the
    /// previous function.
    pub fn register<F>(&self, name: &str, function: F) -> EvalResult<()>
    where
        F: Fn(&[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    {
        if !FUNCTION_NAME.is_match(name) {
            return Err(EvalError::InvalidFunctionName(name.to_string()));
        }
        self.functions
            .insert(name.to_string(), Arc::new(function));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<CustomFunction>> {
        self.functions.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .functions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
