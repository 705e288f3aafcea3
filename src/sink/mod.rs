//! Sink capability set and decorators
//!
//! A [`LogSink`] accepts finished log calls. Optional capabilities are
//! discovered through [`LogSink::as_call_depth`] and
//! [`LogSink::as_call_stack_helper`], which decorators query once when they
//! are composed.

mod call_depth;
mod context;
mod klog;
mod recording;

pub use crate::core::CallSite;
pub use call_depth::{CallDepthSink, CallStackHelperSink};
pub use context::{Context, ContextKey, ContextLogSink, ContextSource};
pub use klog::KlogSink;
pub use recording::{RecordedEntry, RecordingSink};

use crate::core::{Severity, Value};
use std::sync::Arc;

/// Marker invoked to exclude the current frame from call-site attribution
pub type CallStackHelper = Arc<dyn Fn() + Send + Sync>;

/// Destination of log calls
pub trait LogSink: Send + Sync {
    /// Whether records at `severity` would be emitted at all
    fn enabled(&self, severity: Severity) -> bool;

    /// Whether INFO records at verbosity `level` would be emitted
    fn verbosity_enabled(&self, _level: u32) -> bool {
        true
    }

    /// Emit one record. `kvs` holds the call's own key/value pairs.
    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]);

    /// A new sink that adds `kvs` to every record
    fn with_values(&self, kvs: &[Value]) -> Arc<dyn LogSink>;

    fn as_call_depth(&self) -> Option<&dyn CallDepthLogSink> {
        None
    }

    fn as_call_stack_helper(&self) -> Option<&dyn CallStackHelperLogSink> {
        None
    }
}

/// Sinks that can attribute records to a frame further up the stack
pub trait CallDepthLogSink: Send + Sync {
    /// A new sink skipping `depth` more frames. Successive calls add up.
    fn with_call_depth(&self, depth: usize) -> Arc<dyn LogSink>;
}

/// Sinks that exclude frames by marking them instead of counting
pub trait CallStackHelperLogSink: Send + Sync {
    fn call_stack_helper(&self) -> CallStackHelper;
}

/// Apply a call depth if `sink` supports it, otherwise return it unchanged
pub fn with_call_depth(sink: &Arc<dyn LogSink>, depth: usize) -> Arc<dyn LogSink> {
    match sink.as_call_depth() {
        Some(call_depth) => call_depth.with_call_depth(depth),
        None => Arc::clone(sink),
    }
}
