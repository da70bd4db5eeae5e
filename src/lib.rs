//! # kiroku: Operation Audit Logging
//!
//! kiroku derives structured audit records from ordinary function calls.
//! An operation is wrapped together with declarative [`OperationLog`]
//! definitions; small field expressions are evaluated against the call's
//! arguments, return value and error to produce [`LogRecord`]s, which are
//! handed to a persistence collaborator inline or through a background
//! worker.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Arguments → InvocationContext → before-phase assembly
//!     → operation runs → after-phase assembly → dispatch
//! ```
//!
//! Field expressions go through their own pipeline
//! (`tokenizer → parser → evaluator`, see [`expr`]) with per-expression AST
//! caching.
//!
//! ## Components
//!
//! - Expression language ([`expr`]): `#variable` bindings, property access,
//!   a fixed set of value methods, registered custom functions.
//! - Invocation context ([`context`]): call-scoped variables and diff
//!   entries, isolated per call.
//! - Definitions ([`operation`]): which fields to derive and when.
//! - Recorder ([`recorder`]): the before/invoke/after/dispatch state
//!   machine.
//! - Dispatch ([`dispatch`]) and collaborator traits ([`handler`]).
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiroku::{args, OperationLog, OperationRecorder, TracingLogHandler};
//!
//! # async fn demo() -> Result<(), String> {
//! let recorder = OperationRecorder::builder(Arc::new(TracingLogHandler)).build();
//!
//! let definitions = vec![OperationLog::new()
//!     .biz_id("#order_id")
//!     .biz_type("'ORDER'")
//!     .msg("'order ' + #order_id + ' created'")];
//!
//! let order_id = "o-42".to_string();
//! let result: Result<u64, String> = recorder
//!     .record(&definitions, args![order_id], |_ctx| async move {
//!         // ... the operation being audited ...
//!         Ok(7)
//!     })
//!     .await;
//! # result.map(|_| ())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod handler;
pub mod operation;
pub mod record;
pub mod recorder;
pub mod timestamp;

// Re-exports
pub use config::{DispatchMode, RecorderConfig};
pub use context::{Argument, InvocationContext, ERROR_MSG_KEY, RESULT_KEY};
pub use error::{Error, InternalResult};
pub use expr::{EvalError, EvalResult, ExpressionEvaluator, FunctionRegistry, Value};
pub use handler::{OperationLogHandler, OperatorIdProvider, TracingLogHandler};
pub use operation::OperationLog;
pub use record::{DiffEntry, LogRecord};
pub use recorder::{OperationRecorder, OperationRecorderBuilder};
pub use timestamp::Timestamp;
