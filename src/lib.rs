//! # Rust Severity Logger
//!
//! A severity-leveled logging pipeline producing text lines of the form
//!
//! ```text
//! E0307 09:05:02.123456    4242 server.rs:87] "Request failed" err="timeout" path="/api"
//! ```
//!
//! ## Features
//!
//! - **Key/value formatting**: repeated keys are de-duplicated, last value wins
//! - **Severity routing**: per-severity destinations with cascading writes and
//!   a configurable console threshold
//! - **Pooled buffers**: formatting reuses buffers instead of allocating
//! - **Verbosity levels**: INFO records gated by `v`
//! - **Sink decorators**: context injection and call-depth correction
//!
//! ## Example
//!
//! ```
//! use rust_severity_logger::prelude::*;
//! use std::sync::Arc;
//!
//! let logging = Arc::new(Logging::new());
//! let console = MemoryAppender::new();
//! logging.set_stderr(Arc::new(console.clone()));
//!
//! let logger = Logger::from_logging(logging).with_values(&kvs!["node" => "n1"]);
//! logger.info("Pod started", &kvs!["pod" => "kube-dns"]);
//!
//! assert!(console.contains(r#""Pod started" node="n1" pod="kube-dns""#));
//! ```

pub mod appenders;
pub mod core;
pub mod macros;
pub mod sink;

pub mod prelude {
    pub use crate::appenders::{FileAppender, MemoryAppender, StderrAppender, WriterAppender};
    pub use crate::core::{
        Appender, CallSite, ErrorWithDetails, Logger, LoggerError, Logging, LoggingConfig,
        ObjectRef, Result, Severity, ThresholdConfig, Value,
    };
    pub use crate::kvs;
    pub use crate::sink::{Context, ContextKey, LogSink};
}

pub use appenders::{FileAppender, MemoryAppender, StderrAppender, WriterAppender};
pub use core::{
    format_kvs, Appender, Buffer, BufferPool, CallSite, ErrorValue, ErrorWithDetails, ExitHook,
    KeyValues, KvFormatter, Logger, LoggerError, Logging, LoggingConfig, MarshalLog, ObjectMeta,
    ObjectRef, OutputStats, PooledBuffer, Result, RouteDecision, Severity, StateGuard,
    StateSnapshot, ThresholdConfig, Value, Verbose, WriteText, MISSING_VALUE,
};
pub use sink::{
    CallDepthLogSink, CallDepthSink, CallStackHelperLogSink, CallStackHelperSink, Context,
    ContextKey, ContextLogSink, ContextSource, KlogSink, LogSink, RecordingSink,
};
