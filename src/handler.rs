//! # Collaborator Interfaces
//!
//! Narrow contracts the recorder depends on: log persistence and operator-id
//! lookup. Applications implement these; [`TracingLogHandler`] is the
//! built-in sink that emits records as structured tracing events.

use std::time::Duration;

use async_trait::async_trait;

use crate::record::LogRecord;

/// Receives finished log records. Persistence failures are the handler's
/// own concern; the recorder never inspects the outcome.
#[async_trait]
pub trait OperationLogHandler: Send + Sync {
    async fn create_log(&self, record: LogRecord, elapsed: Option<Duration>);
}

/// Supplies the default operator id, queried once per assembled record.
/// An explicit `operator_id` expression on the definition overrides it.
pub trait OperatorIdProvider: Send + Sync {
    fn operator_id(&self) -> Option<String>;
}

/// Default sink: one `tracing` info event per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogHandler;

#[async_trait]
impl OperationLogHandler for TracingLogHandler {
    async fn create_log(&self, record: LogRecord, elapsed: Option<Duration>) {
        tracing::info!(
            target: "kiroku::audit",
            log_id = %record.log_id,
            biz_id = record.biz_id.as_deref().unwrap_or(""),
            biz_type = record.biz_type.as_deref().unwrap_or(""),
            tag = record.tag.as_deref().unwrap_or(""),
            operator_id = record.operator_id.as_deref().unwrap_or(""),
            success = ?record.success,
            msg = record.msg.as_deref().unwrap_or(""),
            elapsed_ms = elapsed.map(|e| e.as_millis() as u64),
            "operation log"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracing_handler_accepts_record() {
        let handler = TracingLogHandler;
        handler.create_log(LogRecord::new(), Some(Duration::from_millis(5))).await;
    }
}
