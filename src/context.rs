//! # Invocation Context
//!
//! Call-scoped state shared between the orchestrator, the wrapped operation
//! and the expression evaluator: bound arguments, the reserved return-value
//! and error-message variables, and accumulated diff entries.
//!
//! Every wrapped call owns its own context behind an `Arc`; nothing is
//! process-global, so concurrent calls cannot observe each other.

use std::sync::Mutex;

use dashmap::DashMap;
use serde::Serialize;

use crate::expr::{Value, VariableScope};
use crate::record::DiffEntry;

/// Reserved variable holding the operation's return value (`#result`),
/// available to after-phase expressions on the success path.
pub const RESULT_KEY: &str = "result";

/// Reserved variable holding the error's message (`#errorMsg`), available
/// to after-phase expressions on the failure path.
pub const ERROR_MSG_KEY: &str = "errorMsg";

/// One bound call argument. Named arguments are referenced as `#name`;
/// positional arguments fall back to `#p0`, `#p1`, … in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Named { name: String, value: Value },
    Positional(Value),
}

impl Argument {
    pub fn named<T: Serialize>(name: impl Into<String>, value: &T) -> Self {
        Self::Named {
            name: name.into(),
            value: lossy_value(value),
        }
    }

    pub fn positional<T: Serialize>(value: &T) -> Self {
        Self::Positional(lossy_value(value))
    }
}

/// Binds named call arguments by identifier: `args![order, reason]` is
/// shorthand for `vec![Argument::named("order", &order), …]`.
#[macro_export]
macro_rules! args {
    ($($name:ident),* $(,)?) => {
        vec![ $( $crate::context::Argument::named(stringify!($name), &$name) ),* ]
    };
}

fn lossy_value<T: Serialize>(value: &T) -> Value {
    match Value::from_serialize(value) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "context value failed to serialize, binding null");
            Value::Null
        }
    }
}

#[derive(Debug, Default)]
pub struct InvocationContext {
    variables: DashMap<String, Value>,
    diffs: Mutex<Vec<DiffEntry>>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs call arguments: named ones under their name, positional ones
    /// under `p{index}` where the index is the argument's position.
    pub fn bind_arguments(&self, arguments: Vec<Argument>) {
        for (index, argument) in arguments.into_iter().enumerate() {
            match argument {
                Argument::Named { name, value } => {
                    self.variables.insert(name, value);
                }
                Argument::Positional(value) => {
                    self.variables.insert(format!("p{}", index), value);
                }
            }
        }
    }

    /// Binds a serializable value under `name`, for application code adding
    /// variables mid-call. A value that fails to serialize binds null.
    pub fn put_variable<T: Serialize>(&self, name: impl Into<String>, value: &T) {
        self.put_value(name, lossy_value(value));
    }

    pub fn put_value(&self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables.get(name).map(|entry| entry.value().clone())
    }

    /// Records a field-level change for the next assembled record.
    pub fn push_diff(&self, diff: DiffEntry) {
        self.diffs.lock().expect("diff list poisoned").push(diff);
    }

    /// Takes the accumulated diff entries, leaving the list empty. Called
    /// once per definition evaluation, so only the first assembled record
    /// of a call carries the entries.
    pub fn take_diffs(&self) -> Vec<DiffEntry> {
        std::mem::take(&mut *self.diffs.lock().expect("diff list poisoned"))
    }

    /// Drops all bindings and diff entries. The orchestrator calls this
    /// unconditionally at call exit.
    pub fn clear(&self) {
        self.variables.clear();
        self.diffs.lock().expect("diff list poisoned").clear();
    }
}

impl VariableScope for InvocationContext {
    fn lookup_variable(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bind_named_and_positional() {
        let context = InvocationContext::new();
        context.bind_arguments(vec![
            Argument::named("order", &"o-1"),
            Argument::positional(&42),
        ]);

        assert_eq!(context.get("order"), Some(Value::String("o-1".to_string())));
        // 位置引数はp{index}
        assert_eq!(context.get("p1"), Some(Value::Integer(42)));
        assert_eq!(context.get("p0"), None);
    }

    #[test]
    fn test_args_macro_captures_names() {
        let order = "o-9".to_string();
        let amount = 3;
        let context = InvocationContext::new();
        context.bind_arguments(args![order, amount]);

        assert_eq!(context.get("order"), Some(Value::String("o-9".to_string())));
        assert_eq!(context.get("amount"), Some(Value::Integer(3)));
    }

    #[test]
    fn test_put_and_get_variable() {
        let context = InvocationContext::new();
        context.put_variable("count", &7);
        assert_eq!(context.get("count"), Some(Value::Integer(7)));
        assert_eq!(context.get("missing"), None);
    }

    #[test]
    fn test_take_diffs_clears() {
        let context = InvocationContext::new();
        context.push_diff(DiffEntry::new("status", &"NEW", &"PAID"));
        context.push_diff(DiffEntry::new("amount", &1, &2));

        let taken = context.take_diffs();
        assert_eq!(taken.len(), 2);
        assert!(context.take_diffs().is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let context = InvocationContext::new();
        context.put_variable("a", &1);
        context.push_diff(DiffEntry::new("f", &0, &1));

        context.clear();
        assert_eq!(context.get("a"), None);
        assert!(context.take_diffs().is_empty());
    }

    #[test]
    fn test_contexts_are_isolated() {
        let first = InvocationContext::new();
        let second = InvocationContext::new();
        first.put_variable("shared", &"first");
        second.put_variable("shared", &"second");

        assert_eq!(
            first.get("shared"),
            Some(Value::String("first".to_string()))
        );
        assert_eq!(
            second.get("shared"),
            Some(Value::String("second".to_string()))
        );
    }
}
