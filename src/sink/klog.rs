use super::{CallDepthLogSink, CallSite, LogSink};
use crate::core::{KeyValues, Logging, Severity, Value};
use std::sync::Arc;

/// Root sink: assembles records and hands them to a [`Logging`] instance.
///
/// With a call depth set, each record is attributed to the frame that many
/// levels above its tracked call site. When that frame cannot be resolved
/// the tracked call site is used.
#[derive(Clone)]
pub struct KlogSink {
    logging: Arc<Logging>,
    values: Arc<[Value]>,
    call_depth: usize,
}

impl KlogSink {
    pub fn new(logging: Arc<Logging>) -> Self {
        Self {
            logging,
            values: Arc::from(Vec::new()),
            call_depth: 0,
        }
    }

    /// Sink writing to the process-wide instance
    pub fn global() -> Self {
        Self::new(Arc::clone(Logging::global()))
    }

    pub fn logging(&self) -> &Arc<Logging> {
        &self.logging
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }
}

impl LogSink for KlogSink {
    fn enabled(&self, _severity: Severity) -> bool {
        true
    }

    fn verbosity_enabled(&self, level: u32) -> bool {
        self.logging.verbosity_enabled(level)
    }

    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]) {
        let call_site = match self.call_depth {
            0 => call_site,
            depth => call_site.resolve_up(depth).unwrap_or(call_site),
        };
        self.logging
            .print_structured_at(call_site, severity, msg, &[&self.values[..], kvs]);
    }

    fn with_values(&self, kvs: &[Value]) -> Arc<dyn LogSink> {
        Arc::new(Self {
            logging: Arc::clone(&self.logging),
            values: Arc::from(KeyValues::with_values(&self.values, kvs)),
            call_depth: self.call_depth,
        })
    }

    fn as_call_depth(&self) -> Option<&dyn CallDepthLogSink> {
        Some(self)
    }
}

impl CallDepthLogSink for KlogSink {
    fn with_call_depth(&self, depth: usize) -> Arc<dyn LogSink> {
        Arc::new(Self {
            logging: Arc::clone(&self.logging),
            values: Arc::clone(&self.values),
            call_depth: self.call_depth + depth,
        })
    }
}
