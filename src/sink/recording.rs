use super::{CallDepthLogSink, CallSite, CallStackHelper, CallStackHelperLogSink, LogSink};
use crate::core::{format_kvs, KeyValues, Severity, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One record captured by a [`RecordingSink`]
#[derive(Debug, Clone)]
pub struct RecordedEntry {
    pub call_site: CallSite,
    pub severity: Severity,
    pub msg: String,
    /// Values added through `with_values`
    pub values: Vec<Value>,
    /// Pairs passed to the call itself
    pub kvs: Vec<Value>,
    /// Call depth in effect when the record was emitted
    pub call_depth: usize,
}

impl RecordedEntry {
    /// Both key/value lists rendered the way the text output renders them
    pub fn formatted_kvs(&self) -> String {
        let mut buf = Vec::new();
        format_kvs(&mut buf, &[&self.values, &self.kvs]);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Sink keeping every record in memory.
///
/// Clones and derived sinks share the recorded entries. The optional
/// capabilities are off unless enabled with the builder methods.
#[derive(Clone)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<RecordedEntry>>>,
    helper_calls: Arc<AtomicU64>,
    values: Vec<Value>,
    call_depth: usize,
    min_severity: Severity,
    verbosity: u32,
    supports_call_depth: bool,
    supports_helper: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            helper_calls: Arc::new(AtomicU64::new(0)),
            values: Vec::new(),
            call_depth: 0,
            min_severity: Severity::Info,
            verbosity: u32::MAX,
            supports_call_depth: false,
            supports_helper: false,
        }
    }

    #[must_use]
    pub fn with_call_depth_support(mut self) -> Self {
        self.supports_call_depth = true;
        self
    }

    #[must_use]
    pub fn with_call_stack_helper_support(mut self) -> Self {
        self.supports_helper = true;
        self
    }

    /// Report severities below `severity` as disabled
    #[must_use]
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Report INFO records above verbosity `level` as disabled
    #[must_use]
    pub fn with_verbosity(mut self, level: u32) -> Self {
        self.verbosity = level;
        self
    }

    pub fn entries(&self) -> Vec<RecordedEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// How often the call stack helper was invoked
    pub fn helper_calls(&self) -> u64 {
        self.helper_calls.load(Ordering::Relaxed)
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for RecordingSink {
    fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    fn verbosity_enabled(&self, level: u32) -> bool {
        level <= self.verbosity
    }

    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]) {
        self.entries.lock().push(RecordedEntry {
            call_site,
            severity,
            msg: msg.to_string(),
            values: self.values.clone(),
            kvs: kvs.to_vec(),
            call_depth: self.call_depth,
        });
    }

    fn with_values(&self, kvs: &[Value]) -> Arc<dyn LogSink> {
        let mut clone = self.clone();
        clone.values = KeyValues::with_values(&self.values, kvs);
        Arc::new(clone)
    }

    fn as_call_depth(&self) -> Option<&dyn CallDepthLogSink> {
        if self.supports_call_depth {
            Some(self)
        } else {
            None
        }
    }

    fn as_call_stack_helper(&self) -> Option<&dyn CallStackHelperLogSink> {
        if self.supports_helper {
            Some(self)
        } else {
            None
        }
    }
}

impl CallDepthLogSink for RecordingSink {
    fn with_call_depth(&self, depth: usize) -> Arc<dyn LogSink> {
        let mut clone = self.clone();
        clone.call_depth += depth;
        Arc::new(clone)
    }
}

impl CallStackHelperLogSink for RecordingSink {
    fn call_stack_helper(&self) -> CallStackHelper {
        let calls = Arc::clone(&self.helper_calls);
        Arc::new(move || {
            calls.fetch_add(1, Ordering::Relaxed);
        })
    }
}
