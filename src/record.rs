//! # Log Record Model
//!
//! The assembled audit entry handed to the persistence collaborator, and the
//! field-level diff entries applications push during a call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::expr::Value;
use crate::timestamp::Timestamp;

/// One field-level before/after change, pushed into the invocation context
/// by application code and attached to the next assembled record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

impl DiffEntry {
    /// Builds an entry from any serializable old/new pair. Values that fail
    /// to serialize are recorded as null.
    pub fn new<O, N>(field: impl Into<String>, old: &O, new: &N) -> Self
    where
        O: Serialize,
        N: Serialize,
    {
        Self {
            field: field.into(),
            old: lossy_value(old),
            new: lossy_value(new),
        }
    }
}

fn lossy_value<T: Serialize>(value: &T) -> Value {
    match Value::from_serialize(value) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "diff value failed to serialize, recording null");
            Value::Null
        }
    }
}

/// One assembled audit entry. Created per operation definition per call,
/// immutable once dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub log_id: String,
    pub biz_id: Option<String>,
    pub biz_type: Option<String>,
    pub tag: Option<String>,
    pub operate_at: Timestamp,
    pub msg: Option<String>,
    pub extra: Option<String>,
    pub operator_id: Option<String>,
    /// Tri-state: `Some(true)`/`Some(false)` when determined by a `success`
    /// expression or the call outcome, `None` while undetermined.
    pub success: Option<bool>,
    /// JSON-serialized return value, when requested by the definition.
    pub return_value: Option<String>,
    pub error_message: Option<String>,
    pub diffs: Vec<DiffEntry>,
}

impl LogRecord {
    pub(crate) fn new() -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            biz_id: None,
            biz_type: None,
            tag: None,
            operate_at: Timestamp::now(),
            msg: None,
            extra: None,
            operator_id: None,
            success: None,
            return_value: None,
            error_message: None,
            diffs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_record_has_unique_id() {
        let first = LogRecord::new();
        let second = LogRecord::new();
        assert_ne!(first.log_id, second.log_id);
        assert!(Uuid::parse_str(&first.log_id).is_ok());
    }

    #[test]
    fn test_record_serde_round_trip() {
        let mut record = LogRecord::new();
        record.biz_id = Some("order-1".to_string());
        record.success = Some(false);
        record.diffs.push(DiffEntry::new("status", &"NEW", &"PAID"));

        let json = serde_json::to_string(&record).unwrap();
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.log_id, record.log_id);
        assert_eq!(back.biz_id, record.biz_id);
        assert_eq!(back.success, Some(false));
        assert_eq!(back.diffs, record.diffs);
    }

    #[test]
    fn test_diff_entry_values() {
        let entry = DiffEntry::new("amount", &10, &25);
        assert_eq!(entry.field, "amount");
        assert_eq!(entry.old, Value::Integer(10));
        assert_eq!(entry.new, Value::Integer(25));
    }
}
