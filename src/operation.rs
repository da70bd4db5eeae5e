//! # Operation Definitions
//!
//! Declarative per-call-site configuration: which audit fields to derive and
//! when to evaluate them. Definitions are plain values handed to
//! [`OperationRecorder::record`](crate::recorder::OperationRecorder::record),
//! and deserialize from config files.

use serde::{Deserialize, Serialize};

/// One audit-log definition for a wrapped operation.
///
/// Every expression field is optional; an absent or blank expression simply
/// leaves that record field empty. `execute_before` moves evaluation ahead
/// of the operation (return value and error are not yet visible there).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationLog {
    pub biz_id: Option<String>,
    pub biz_type: Option<String>,
    pub tag: Option<String>,
    pub msg: Option<String>,
    pub extra: Option<String>,
    pub operator_id: Option<String>,
    pub condition: Option<String>,
    pub success: Option<String>,
    pub execute_before: bool,
    pub record_return_value: bool,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn biz_id(mut self, expression: impl Into<String>) -> Self {
        self.biz_id = Some(expression.into());
        self
    }

    pub fn biz_type(mut self, expression: impl Into<String>) -> Self {
        self.biz_type = Some(expression.into());
        self
    }

    pub fn tag(mut self, expression: impl Into<String>) -> Self {
        self.tag = Some(expression.into());
        self
    }

    pub fn msg(mut self, expression: impl Into<String>) -> Self {
        self.msg = Some(expression.into());
        self
    }

    pub fn extra(mut self, expression: impl Into<String>) -> Self {
        self.extra = Some(expression.into());
        self
    }

    pub fn operator_id(mut self, expression: impl Into<String>) -> Self {
        self.operator_id = Some(expression.into());
        self
    }

    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.condition = Some(expression.into());
        self
    }

    pub fn success(mut self, expression: impl Into<String>) -> Self {
        self.success = Some(expression.into());
        self
    }

    pub fn execute_before(mut self) -> Self {
        self.execute_before = true;
        self
    }

    pub fn record_return_value(mut self) -> Self {
        self.record_return_value = true;
        self
    }
}

/// Treats absent and blank expressions alike.
pub(crate) fn configured(expression: &Option<String>) -> Option<&str> {
    expression
        .as_deref()
        .filter(|expression| !expression.trim().is_empty())
}
