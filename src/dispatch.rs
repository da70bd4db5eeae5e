//! # Dispatch Sink
//!
//! Hands assembled records to the persistence handler, either inline on the
//! calling task or through a background worker. The worker is a single
//! consumer draining an unbounded channel, which keeps the records of one
//! call in submission order. Each submission carries the caller's current
//! tracing span so the handler still runs inside the call's correlation
//! context after the async handoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{Instrument, Span};

use crate::config::DispatchMode;
use crate::handler::OperationLogHandler;
use crate::record::LogRecord;

struct LogJob {
    record: LogRecord,
    elapsed: Option<Duration>,
    span: Span,
}

struct LogWorker {
    sender: mpsc::UnboundedSender<LogJob>,
}

impl LogWorker {
    fn spawn(handler: Arc<dyn OperationLogHandler>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<LogJob>();
        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let LogJob {
                    record,
                    elapsed,
                    span,
                } = job;
                handler.create_log(record, elapsed).instrument(span).await;
            }
            tracing::debug!("log worker channel closed");
        });
        Self { sender }
    }

    fn submit(&self, job: LogJob) {
        if self.sender.send(job).is_err() {
            tracing::error!("log worker is gone, dropping record");
        }
    }
}

pub struct LogDispatcher {
    handler: Arc<dyn OperationLogHandler>,
    worker: Option<LogWorker>,
}

impl LogDispatcher {
    /// Builds a dispatcher; `Background` mode spawns the worker task, so it
    /// must be called within a tokio runtime.
    pub fn new(handler: Arc<dyn OperationLogHandler>, mode: DispatchMode) -> Self {
        let worker = match mode {
            DispatchMode::Inline => None,
            DispatchMode::Background => Some(LogWorker::spawn(handler.clone())),
        };
        Self { handler, worker }
    }

    /// Sends every record to the sink in list order. Background submissions
    /// are fire-and-forget.
    pub async fn dispatch_all(&self, records: Vec<LogRecord>, elapsed: Option<Duration>) {
        match &self.worker {
            Some(worker) => {
                for record in records {
                    worker.submit(LogJob {
                        record,
                        elapsed,
                        span: Span::current(),
                    });
                }
            }
            None => {
                for record in records {
                    self.handler.create_log(record, elapsed).await;
                }
            }
        }
    }
}
