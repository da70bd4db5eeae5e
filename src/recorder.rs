//! # Operation Recorder
//!
//! The interception orchestrator. [`OperationRecorder::record`] wraps an
//! async operation together with its [`OperationLog`] definitions, assembles
//! one [`LogRecord`] per definition around the call and hands the results to
//! the dispatch sink.
//!
//! Phases run linearly: before-definitions are assembled ahead of the call,
//! after-definitions once the outcome is known, and dispatch always runs.
//! Auditing is fail-safe — assembly or dispatch problems are logged and
//! never change the wrapped operation's outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::error;

use crate::config::RecorderConfig;
use crate::context::{Argument, InvocationContext, ERROR_MSG_KEY, RESULT_KEY};
use crate::dispatch::LogDispatcher;
use crate::expr::{ExpressionEvaluator, FunctionRegistry, Value};
use crate::handler::{OperationLogHandler, OperatorIdProvider};
use crate::operation::{configured, OperationLog};
use crate::record::LogRecord;

pub struct OperationRecorder {
    evaluator: ExpressionEvaluator,
    dispatcher: LogDispatcher,
    operator_provider: Option<Arc<dyn OperatorIdProvider>>,
}

impl OperationRecorder {
    pub fn builder(handler: Arc<dyn OperationLogHandler>) -> OperationRecorderBuilder {
        OperationRecorderBuilder {
            handler,
            config: RecorderConfig::default(),
            functions: FunctionRegistry::new(),
            operator_provider: None,
        }
    }

    /// Runs `operation` under the given definitions and returns its result
    /// unchanged. The closure receives the call's [`InvocationContext`] for
    /// mid-call variable and diff pushes.
    pub async fn record<F, Fut, T, E>(
        &self,
        definitions: &[OperationLog],
        arguments: Vec<Argument>,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Arc<InvocationContext>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: std::fmt::Display,
    {
        let context = Arc::new(InvocationContext::new());
        context.bind_arguments(arguments);

        // 実行前フェーズ
        let mut before_records: Vec<(usize, LogRecord)> = Vec::new();
        for (index, definition) in definitions.iter().enumerate() {
            if definition.execute_before {
                if let Some(record) = self.resolve_definition(definition, &context) {
                    before_records.push((index, record));
                }
            }
        }
        let started = Instant::now();

        // 元のオペレーション実行
        let outcome = operation(context.clone()).await;
        let elapsed = started.elapsed();

        let mut after_records: Vec<(usize, LogRecord)> = Vec::new();
        match &outcome {
            Ok(value) => {
                let return_value = match Value::from_serialize(value) {
                    Ok(value) => value,
                    Err(e) => {
                        error!(error = %e, "return value failed to serialize, binding null");
                        Value::Null
                    }
                };
                let return_json = if return_value.is_null() {
                    None
                } else {
                    return_value.to_json_string().ok()
                };
                context.put_value(RESULT_KEY, return_value);

                for (index, definition) in definitions.iter().enumerate() {
                    if !definition.execute_before {
                        if let Some(record) = self.resolve_definition(definition, &context) {
                            after_records.push((index, record));
                        }
                    }
                }

                // successが未決定の記録はtrueに、返り値は要求された定義へ
                for (index, record) in before_records.iter_mut().chain(after_records.iter_mut()) {
                    if record.success.is_none() {
                        record.success = Some(true);
                    }
                    if definitions[*index].record_return_value {
                        record.return_value = return_json.clone();
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                context.put_value(ERROR_MSG_KEY, Value::String(message.clone()));

                for (index, definition) in definitions.iter().enumerate() {
                    if !definition.execute_before {
                        if let Some(record) = self.resolve_definition(definition, &context) {
                            after_records.push((index, record));
                        }
                    }
                }

                // 失敗は実行後の記録だけに反映する。実行前の記録のsuccessは
                // 組み立て時のまま残す。
                for (_, record) in after_records.iter_mut() {
                    record.success = Some(false);
                    record.error_message = Some(message.clone());
                }
            }
        }

        let records: Vec<LogRecord> = before_records
            .into_iter()
            .chain(after_records)
            .map(|(_, record)| record)
            .collect();
        self.dispatcher.dispatch_all(records, Some(elapsed)).await;
        context.clear();

        outcome
    }

    /// Assembles one record for one definition, or nothing when the
    /// condition gates it out or cannot be decided. The context's diff list
    /// is consumed on every outcome.
    fn resolve_definition(
        &self,
        definition: &OperationLog,
        context: &InvocationContext,
    ) -> Option<LogRecord> {
        let assembled = self.assemble(definition, context);
        let diffs = context.take_diffs();
        assembled.map(|mut record| {
            record.diffs = diffs;
            record
        })
    }

    fn assemble(
        &self,
        definition: &OperationLog,
        context: &InvocationContext,
    ) -> Option<LogRecord> {
        if let Some(condition) = configured(&definition.condition) {
            match self.evaluator.eval_boolean(condition, context) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    error!(expression = condition, error = %e, "condition evaluation failed");
                    return None;
                }
            }
        }

        let mut record = LogRecord::new();

        if let Some(success) = configured(&definition.success) {
            match self.evaluator.eval_boolean(success, context) {
                Ok(value) => record.success = Some(value),
                Err(e) => {
                    error!(expression = success, error = %e, "success evaluation failed");
                }
            }
        }

        record.biz_id = self.eval_string_field("biz_id", &definition.biz_id, context);
        record.biz_type = self.eval_string_field("biz_type", &definition.biz_type, context);
        record.tag = self.eval_string_field("tag", &definition.tag, context);
        record.msg = self.eval_json_field("msg", &definition.msg, context);
        record.extra = self.eval_json_field("extra", &definition.extra, context);

        // operatorIdの優先順位: 定義の式 > 外部プロバイダ
        let mut operator_id = self
            .operator_provider
            .as_ref()
            .and_then(|provider| provider.operator_id());
        if let Some(expression) = configured(&definition.operator_id) {
            match self.evaluator.eval_string(expression, context) {
                Ok(value) => operator_id = value,
                Err(e) => {
                    error!(expression, error = %e, "operator_id evaluation failed");
                }
            }
        }
        record.operator_id = operator_id;

        Some(record)
    }

    fn eval_string_field(
        &self,
        field: &'static str,
        expression: &Option<String>,
        context: &InvocationContext,
    ) -> Option<String> {
        let expression = configured(expression)?;
        match self.evaluator.eval_string(expression, context) {
            Ok(value) => value,
            Err(e) => {
                error!(field, expression, error = %e, "field evaluation failed");
                None
            }
        }
    }

    fn eval_json_field(
        &self,
        field: &'static str,
        expression: &Option<String>,
        context: &InvocationContext,
    ) -> Option<String> {
        let expression = configured(expression)?;
        match self.evaluator.eval_string_or_json(expression, context) {
            Ok(value) => value,
            Err(e) => {
                error!(field, expression, error = %e, "field evaluation failed");
                None
            }
        }
    }
}

pub struct OperationRecorderBuilder {
    handler: Arc<dyn OperationLogHandler>,
    config: RecorderConfig,
    functions: FunctionRegistry,
    operator_provider: Option<Arc<dyn OperatorIdProvider>>,
}

impl OperationRecorderBuilder {
    pub fn config(mut self, config: RecorderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn operator_provider(mut self, provider: Arc<dyn OperatorIdProvider>) -> Self {
        self.operator_provider = Some(provider);
        self
    }

    /// Builds the recorder. Background dispatch spawns its worker here, so
    /// call this within a tokio runtime.
    pub fn build(self) -> OperationRecorder {
        OperationRecorder {
            evaluator: ExpressionEvaluator::new(self.functions),
            dispatcher: LogDispatcher::new(self.handler, self.config.dispatch),
            operator_provider: self.operator_provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DiffEntry;

    fn recorder() -> OperationRecorder {
        OperationRecorder::builder(Arc::new(crate::handler::TracingLogHandler)).build()
    }

    #[test]
    fn test_assemble_condition_false_yields_none() {
        let recorder = recorder();
        let context = InvocationContext::new();
        let definition = OperationLog::new().condition("1 > 2").biz_id("'x'");

        assert!(recorder.resolve_definition(&definition, &context).is_none());
    }

    #[test]
    fn test_assemble_condition_error_yields_none() {
        let recorder = recorder();
        let context = InvocationContext::new();
        let definition = OperationLog::new().condition("#x +").biz_id("'x'");

        assert!(recorder.resolve_definition(&definition, &context).is_none());
    }

    #[test]
    fn test_assemble_field_error_degrades_to_none() {
        let recorder = recorder();
        let context = InvocationContext::new();
        context.put_variable("id", &"o-1");
        let definition = OperationLog::new().biz_id("#id.explode()").tag("'created'");

        let record = recorder.resolve_definition(&definition, &context).unwrap();
        assert_eq!(record.biz_id, None);
        assert_eq!(record.tag.as_deref(), Some("created"));
    }

    #[test]
    fn test_assemble_consumes_diffs_even_when_gated() {
        let recorder = recorder();
        let context = InvocationContext::new();
        context.push_diff(DiffEntry::new("status", &"NEW", &"PAID"));
        let gated = OperationLog::new().condition("false");

        assert!(recorder.resolve_definition(&gated, &context).is_none());
        // 条件で弾かれてもdiffは消費される
        let next = OperationLog::new().tag("'second'");
        let record = recorder.resolve_definition(&next, &context).unwrap();
        assert!(record.diffs.is_empty());
    }

    #[test]
    fn test_assemble_blank_expressions_ignored() {
        let recorder = recorder();
        let context = InvocationContext::new();
        let definition = OperationLog::new().condition("   ").msg("");

        let record = recorder.resolve_definition(&definition, &context).unwrap();
        assert_eq!(record.msg, None);
        assert_eq!(record.success, None);
    }
}
