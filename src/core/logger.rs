//! Logger front end
//!
//! A [`Logger`] is an immutable handle on a sink. Deriving a logger with
//! more values, a name, a call depth or a context never changes the logger
//! it was derived from, so loggers can be shared and extended freely.

use super::logging::Logging;
use super::record::CallSite;
use super::severity::Severity;
use super::value::Value;
use crate::sink::{self, ContextKey, ContextLogSink, ContextSource, KlogSink, LogSink};
use std::fmt;
use std::sync::Arc;

/// Key under which the logger name is logged
pub const LOGGER_NAME_KEY: &str = "logger";

#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    name: Option<Arc<str>>,
    level: u32,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            name: None,
            level: 0,
        }
    }

    /// Logger writing through `logging`
    pub fn from_logging(logging: Arc<Logging>) -> Self {
        Self::new(Arc::new(KlogSink::new(logging)))
    }

    /// Logger writing through the process-wide [`Logging`] instance
    pub fn global() -> Self {
        Self::new(Arc::new(KlogSink::global()))
    }

    /// Logger for `logging` that adds the configured context keys found in
    /// `context`
    pub fn from_context(logging: Arc<Logging>, context: Arc<dyn ContextSource>) -> Self {
        let keys = logging.context_keys();
        Self::from_logging(logging).with_context(context, keys)
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Verbosity level of INFO records from this logger
    pub fn verbosity(&self) -> u32 {
        self.level
    }

    /// Whether records at `severity` would be emitted. INFO additionally
    /// depends on the verbosity level.
    #[inline]
    pub fn enabled(&self, severity: Severity) -> bool {
        self.sink.enabled(severity)
            && (severity != Severity::Info
                || self.level == 0
                || self.sink.verbosity_enabled(self.level))
    }

    #[track_caller]
    pub fn log(&self, severity: Severity, msg: &str, kvs: &[Value]) {
        if !self.enabled(severity) {
            return;
        }
        self.emit(CallSite::caller(), severity, msg, kvs);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, kvs: &[Value]) {
        self.log(Severity::Info, msg, kvs);
    }

    #[track_caller]
    pub fn warning(&self, msg: &str, kvs: &[Value]) {
        self.log(Severity::Warning, msg, kvs);
    }

    /// Log `err` under the `err` key, ahead of `kvs`
    #[track_caller]
    pub fn error(&self, err: impl Into<Value>, msg: &str, kvs: &[Value]) {
        if !self.enabled(Severity::Error) {
            return;
        }
        let mut all = Vec::with_capacity(kvs.len() + 2);
        all.push(Value::from("err"));
        all.push(err.into());
        all.extend_from_slice(kvs);
        self.emit(CallSite::caller(), Severity::Error, msg, &all);
    }

    /// Log at FATAL. With a [`KlogSink`] this runs the exit hook.
    #[track_caller]
    pub fn fatal(&self, msg: &str, kvs: &[Value]) {
        self.log(Severity::Fatal, msg, kvs);
    }

    /// Log a formatted message without key/value pairs
    #[track_caller]
    pub fn print(&self, severity: Severity, args: fmt::Arguments<'_>) {
        if !self.enabled(severity) {
            return;
        }
        let call_site = CallSite::caller();
        match args.as_str() {
            Some(msg) => self.emit(call_site, severity, msg, &[]),
            None => self.emit(call_site, severity, &args.to_string(), &[]),
        }
    }

    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]) {
        match &self.name {
            Some(name) => {
                let mut all = Vec::with_capacity(kvs.len() + 2);
                all.push(Value::from(LOGGER_NAME_KEY));
                all.push(Value::from(name.to_string()));
                all.extend_from_slice(kvs);
                self.sink.emit(call_site, severity, msg, &all);
            }
            None => self.sink.emit(call_site, severity, msg, kvs),
        }
    }

    /// Raise the verbosity of INFO records by `level`; levels add up.
    ///
    /// Errors are logged regardless of verbosity.
    #[must_use]
    pub fn v(&self, level: u32) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            name: self.name.clone(),
            level: self.level.saturating_add(level),
        }
    }

    #[must_use]
    pub fn with_values(&self, kvs: &[Value]) -> Self {
        Self {
            sink: self.sink.with_values(kvs),
            name: self.name.clone(),
            level: self.level,
        }
    }

    /// Append a name segment; segments are joined with `/`
    #[must_use]
    pub fn with_name(&self, name: &str) -> Self {
        let name = match &self.name {
            Some(prefix) => format!("{}/{}", prefix, name),
            None => name.to_string(),
        };
        Self {
            sink: Arc::clone(&self.sink),
            name: Some(Arc::from(name)),
            level: self.level,
        }
    }

    /// Skip `depth` more frames when attributing call sites.
    ///
    /// Returns an equivalent logger when the sink cannot adjust the depth.
    #[must_use]
    pub fn with_call_depth(&self, depth: usize) -> Self {
        Self {
            sink: sink::with_call_depth(&self.sink, depth),
            name: self.name.clone(),
            level: self.level,
        }
    }

    /// Add the values of `keys` found in `context` to every record
    #[must_use]
    pub fn with_context(&self, context: Arc<dyn ContextSource>, keys: Arc<[ContextKey]>) -> Self {
        Self {
            sink: Arc::new(ContextLogSink::new(Arc::clone(&self.sink), context, keys)),
            name: self.name.clone(),
            level: self.level,
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvs;
    use crate::sink::{Context, RecordingSink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted(Arc<AtomicUsize>);

    impl From<Counted> for Value {
        fn from(counted: Counted) -> Self {
            counted.0.fetch_add(1, Ordering::SeqCst);
            Value::from("converted")
        }
    }

    #[test]
    fn test_call_site_is_the_caller() {
        let recording = RecordingSink::new();
        let logger = Logger::new(Arc::new(recording.clone()));
        logger.info("here", &[]);
        let entry = recording.entries().remove(0);
        assert_eq!(entry.call_site.basename(), "logger.rs");
        assert_eq!(entry.severity, Severity::Info);
    }

    #[test]
    fn test_with_name_joins_segments() {
        let recording = RecordingSink::new();
        let logger = Logger::new(Arc::new(recording.clone()))
            .with_name("controller")
            .with_name("replicaset");
        logger.warning("sync", &kvs!["key" => "ns/rs"]);

        let entry = recording.entries().remove(0);
        assert_eq!(
            entry.formatted_kvs(),
            r#" logger="controller/replicaset" key="ns/rs""#
        );
        assert_eq!(logger.name(), Some("controller/replicaset"));
    }

    #[test]
    fn test_derived_loggers_are_independent() {
        let recording = RecordingSink::new();
        let base = Logger::new(Arc::new(recording.clone()));
        let derived = base.with_values(&kvs!["pod" => "web-0"]);

        base.info("base", &[]);
        derived.info("derived", &[]);

        let entries = recording.entries();
        assert!(entries[0].values.is_empty());
        assert_eq!(entries[1].formatted_kvs(), r#" pod="web-0""#);
    }

    #[test]
    fn test_error_prepends_err() {
        let recording = RecordingSink::new();
        let logger = Logger::new(Arc::new(recording.clone()));
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such pod");
        logger.error(Value::error(err), "Lookup failed", &kvs!["pod" => "web-0"]);

        let entry = recording.entries().remove(0);
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.formatted_kvs(), r#" err="no such pod" pod="web-0""#);
    }

    #[test]
    fn test_disabled_severity_skips_argument_work() {
        let recording = RecordingSink::new().with_min_severity(Severity::Fatal);
        let logger = Logger::new(Arc::new(recording.clone()));
        let conversions = Arc::new(AtomicUsize::new(0));

        logger.error(Counted(Arc::clone(&conversions)), "skipped", &[]);
        logger.info("skipped", &[]);

        assert_eq!(conversions.load(Ordering::SeqCst), 0);
        assert!(recording.is_empty());
    }

    #[test]
    fn test_verbosity_levels_add_up() {
        let recording = RecordingSink::new().with_verbosity(2);
        let logger = Logger::new(Arc::new(recording.clone()));
        let conversions = Arc::new(AtomicUsize::new(0));

        logger.v(1).info("verbosity 1", &[]);
        logger.v(1).v(1).info("verbosity 2", &[]);
        logger.v(3).info("verbosity 3", &[]);
        logger.v(3).print(Severity::Info, format_args!("verbosity {}", 3));
        logger.v(3).error(Counted(Arc::clone(&conversions)), "errors ignore verbosity", &[]);

        let msgs: Vec<String> = recording.entries().into_iter().map(|e| e.msg).collect();
        assert_eq!(msgs, ["verbosity 1", "verbosity 2", "errors ignore verbosity"]);
        assert_eq!(conversions.load(Ordering::SeqCst), 1);
        assert_eq!(logger.v(2).verbosity(), 2);
        assert!(!logger.v(3).enabled(Severity::Info));
        assert!(logger.v(3).enabled(Severity::Warning));
    }

    #[test]
    fn test_with_call_depth_without_capability_is_noop() {
        let recording = RecordingSink::new();
        let logger = Logger::new(Arc::new(recording.clone())).with_call_depth(2);
        logger.info("m", &[]);
        assert_eq!(recording.entries()[0].call_depth, 0);
    }

    #[test]
    fn test_with_call_depth_forwarded() {
        let recording = RecordingSink::new().with_call_depth_support();
        let logger = Logger::new(Arc::new(recording.clone()))
            .with_call_depth(1)
            .with_call_depth(1);
        logger.info("m", &[]);
        assert_eq!(recording.entries()[0].call_depth, 2);
    }

    #[test]
    fn test_with_context() {
        let recording = RecordingSink::new();
        let context = Context::new().with_value("trace", "abc123");
        let keys: Arc<[ContextKey]> = Arc::from(vec![ContextKey::new("trace", "traceID")]);
        let logger = Logger::new(Arc::new(recording.clone())).with_context(Arc::new(context), keys);

        logger.print(Severity::Info, format_args!("request {}", 7));

        let entry = recording.entries().remove(0);
        assert_eq!(entry.msg, "request 7");
        assert_eq!(entry.formatted_kvs(), r#" traceID="abc123""#);
    }
}
