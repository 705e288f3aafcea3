use super::{CallDepthLogSink, CallSite, CallStackHelper, CallStackHelperLogSink, LogSink};
use crate::core::{Severity, Value};
use std::sync::Arc;

/// Decorator attributing records `offset` frames further up the stack.
///
/// The offset is handed to the inner sink on every emit. Inner sinks
/// without the call-depth capability receive the record unchanged and
/// attribute it to the immediate caller.
#[derive(Clone)]
pub struct CallDepthSink {
    inner: Arc<dyn LogSink>,
    offset: usize,
}

impl CallDepthSink {
    pub fn new(inner: Arc<dyn LogSink>, offset: usize) -> Self {
        Self { inner, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the inner sink honors the offset
    pub fn is_effective(&self) -> bool {
        self.inner.as_call_depth().is_some()
    }
}

impl LogSink for CallDepthSink {
    fn enabled(&self, severity: Severity) -> bool {
        self.inner.enabled(severity)
    }

    fn verbosity_enabled(&self, level: u32) -> bool {
        self.inner.verbosity_enabled(level)
    }

    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]) {
        match self.inner.as_call_depth() {
            Some(call_depth) => {
                call_depth
                    .with_call_depth(self.offset)
                    .emit(call_site, severity, msg, kvs)
            }
            None => self.inner.emit(call_site, severity, msg, kvs),
        }
    }

    fn with_values(&self, kvs: &[Value]) -> Arc<dyn LogSink> {
        Arc::new(Self {
            inner: self.inner.with_values(kvs),
            offset: self.offset,
        })
    }

    fn as_call_depth(&self) -> Option<&dyn CallDepthLogSink> {
        Some(self)
    }

    fn as_call_stack_helper(&self) -> Option<&dyn CallStackHelperLogSink> {
        self.inner.as_call_stack_helper()
    }
}

impl CallDepthLogSink for CallDepthSink {
    fn with_call_depth(&self, depth: usize) -> Arc<dyn LogSink> {
        Arc::new(Self {
            inner: Arc::clone(&self.inner),
            offset: self.offset + depth,
        })
    }
}

/// Decorator invoking the inner sink's call stack helper before forwarding
#[derive(Clone)]
pub struct CallStackHelperSink {
    inner: Arc<dyn LogSink>,
}

impl CallStackHelperSink {
    pub fn new(inner: Arc<dyn LogSink>) -> Self {
        Self { inner }
    }

    fn helper(&self) -> Option<CallStackHelper> {
        self.inner
            .as_call_stack_helper()
            .map(|helper| helper.call_stack_helper())
    }
}

impl LogSink for CallStackHelperSink {
    fn enabled(&self, severity: Severity) -> bool {
        self.inner.enabled(severity)
    }

    fn verbosity_enabled(&self, level: u32) -> bool {
        self.inner.verbosity_enabled(level)
    }

    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]) {
        if let Some(helper) = self.helper() {
            helper();
        }
        self.inner.emit(call_site, severity, msg, kvs);
    }

    fn with_values(&self, kvs: &[Value]) -> Arc<dyn LogSink> {
        Arc::new(Self::new(self.inner.with_values(kvs)))
    }

    fn as_call_depth(&self) -> Option<&dyn CallDepthLogSink> {
        self.inner.as_call_depth()
    }

    fn as_call_stack_helper(&self) -> Option<&dyn CallStackHelperLogSink> {
        Some(self)
    }
}

impl CallStackHelperLogSink for CallStackHelperSink {
    fn call_stack_helper(&self) -> CallStackHelper {
        self.helper().unwrap_or_else(|| Arc::new(|| {}))
    }
}
