//! Severity router and process-wide logging state
//!
//! A [`Logging`] instance owns the threshold configuration, one destination
//! per severity, the console destination and the exit hook. Records are
//! formatted into pooled buffers and routed by [`Logging::output`].

use super::appender::Appender;
use super::buffer::{BufferPool, PooledBuffer};
use super::config::{LoggingConfig, ThresholdConfig};
use super::error::Result;
use super::formatter::{panic_message, KvFormatter};
use super::metrics::{OutputStats, WRITE_ERROR_REPORT_INTERVAL};
use super::record::{self, CallSite};
use super::severity::Severity;
use super::value::Value;
use crate::appenders::StderrAppender;
use crate::sink::ContextKey;
use chrono::Local;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

/// Invoked after a FATAL record has been written and flushed
pub type ExitHook = Arc<dyn Fn() + Send + Sync>;

/// Exit status used by the default exit hook
pub const FATAL_EXIT_CODE: i32 = 255;

type Destinations = [Option<Arc<dyn Appender>>; Severity::COUNT];

fn exit_process() {
    std::process::exit(FATAL_EXIT_CODE)
}

#[derive(Clone)]
struct Settings {
    thresholds: ThresholdConfig,
    files: Destinations,
    stderr: Arc<dyn Appender>,
    exit_hook: ExitHook,
    context_keys: Arc<[ContextKey]>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            files: Default::default(),
            stderr: Arc::new(StderrAppender::new()),
            exit_hook: Arc::new(exit_process),
            context_keys: Arc::from(Vec::new()),
        }
    }
}

/// Saved copy of the complete mutable state of a [`Logging`] instance
#[derive(Clone)]
pub struct StateSnapshot {
    settings: Settings,
}

impl StateSnapshot {
    pub fn thresholds(&self) -> ThresholdConfig {
        self.settings.thresholds
    }
}

impl fmt::Debug for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSnapshot")
            .field("thresholds", &self.settings.thresholds)
            .finish_non_exhaustive()
    }
}

/// Restores the captured state when dropped
#[must_use = "the state is restored as soon as the guard is dropped"]
pub struct StateGuard<'a> {
    logging: &'a Logging,
    snapshot: StateSnapshot,
}

impl StateGuard<'_> {
    /// The state that will be restored
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.logging.restore(&self.snapshot);
    }
}

/// Severity router plus the state it reads.
///
/// # Example
///
/// ```
/// use rust_severity_logger::{Logging, MemoryAppender, Severity, ThresholdConfig};
/// use std::sync::Arc;
///
/// let logging = Logging::new();
/// let info = MemoryAppender::new();
/// logging.set_thresholds(ThresholdConfig {
///     to_stderr: false,
///     stderr_threshold: Severity::Fatal,
///     ..ThresholdConfig::default()
/// });
/// logging.set_output_by_severity("INFO", Arc::new(info.clone())).unwrap();
///
/// logging.warning_s("Disk almost full", &rust_severity_logger::kvs!["free" => "2%"]);
/// assert!(info.contains(r#""Disk almost full" free="2%""#));
/// ```
pub struct Logging {
    settings: RwLock<Settings>,
    buffers: BufferPool,
    formatter: KvFormatter,
    stats: OutputStats,
    pid: u32,
}

impl Logging {
    #[must_use]
    pub fn new() -> Self {
        Self::with_formatter(KvFormatter::new())
    }

    /// Create an instance that renders values through `formatter`
    #[must_use]
    pub fn with_formatter(formatter: KvFormatter) -> Self {
        Self {
            settings: RwLock::new(Settings::default()),
            buffers: BufferPool::new(),
            formatter,
            stats: OutputStats::new(),
            pid: std::process::id(),
        }
    }

    /// The process-wide instance
    pub fn global() -> &'static Arc<Logging> {
        static GLOBAL: OnceLock<Arc<Logging>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Logging::new()))
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.settings.read().thresholds
    }

    pub fn set_thresholds(&self, thresholds: ThresholdConfig) {
        self.settings.write().thresholds = thresholds;
    }

    /// Whether INFO records at verbosity `level` are logged
    pub fn verbosity_enabled(&self, level: u32) -> bool {
        self.settings.read().thresholds.verbosity_enabled(level)
    }

    /// INFO logging gated by verbosity `level`
    pub fn v(&self, level: u32) -> Verbose<'_> {
        Verbose {
            logging: self,
            enabled: self.verbosity_enabled(level),
        }
    }

    /// Replace the thresholds with the values of a flag table
    pub fn configure(&self, config: &LoggingConfig) {
        self.set_thresholds(ThresholdConfig::from(config));
    }

    /// Apply one flag given in textual form.
    ///
    /// Invalid names or values leave the configuration untouched.
    pub fn apply_flag(&self, name: &str, value: &str) -> Result<()> {
        let mut settings = self.settings.write();
        let mut thresholds = settings.thresholds;
        thresholds.apply_flag(name, value)?;
        settings.thresholds = thresholds;
        Ok(())
    }

    /// Send the records of every severity to `appender`.
    ///
    /// Since writes cascade, a record at severity S is written once for
    /// each severity up to S.
    pub fn set_output(&self, appender: Arc<dyn Appender>) {
        let mut settings = self.settings.write();
        for slot in settings.files.iter_mut() {
            *slot = Some(Arc::clone(&appender));
        }
    }

    /// Set the destination of one severity, given by name
    pub fn set_output_by_severity(&self, name: &str, appender: Arc<dyn Appender>) -> Result<()> {
        let severity: Severity = name.parse()?;
        self.settings.write().files[severity.index()] = Some(appender);
        Ok(())
    }

    /// Remove the destination of one severity
    pub fn clear_output(&self, severity: Severity) {
        self.settings.write().files[severity.index()] = None;
    }

    /// Replace the console destination
    pub fn set_stderr(&self, appender: Arc<dyn Appender>) {
        self.settings.write().stderr = appender;
    }

    /// Replace the action taken after a FATAL record
    pub fn set_exit_hook(&self, hook: ExitHook) {
        self.settings.write().exit_hook = hook;
    }

    /// Context values that contextual loggers add to their records
    pub fn set_context_keys(&self, keys: Vec<ContextKey>) {
        self.settings.write().context_keys = Arc::from(keys);
    }

    pub fn context_keys(&self) -> Arc<[ContextKey]> {
        Arc::clone(&self.settings.read().context_keys)
    }

    pub fn capture_state(&self) -> StateSnapshot {
        StateSnapshot {
            settings: self.settings.read().clone(),
        }
    }

    pub fn restore(&self, snapshot: &StateSnapshot) {
        *self.settings.write() = snapshot.settings.clone();
    }

    /// Capture the state now and restore it when the guard goes away
    pub fn scoped_state(&self) -> StateGuard<'_> {
        StateGuard {
            logging: self,
            snapshot: self.capture_state(),
        }
    }

    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }

    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    pub fn formatter(&self) -> &KvFormatter {
        &self.formatter
    }

    /// Flush every configured destination, reporting the first failure
    pub fn flush(&self) -> Result<()> {
        let (files, stderr) = {
            let settings = self.settings.read();
            (settings.files.clone(), Arc::clone(&settings.stderr))
        };
        let mut result = Ok(());
        for appender in files.iter().flatten().chain(std::iter::once(&stderr)) {
            if let Err(e) = appender.flush() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Write a finished record to the destinations selected for `severity`.
    ///
    /// Failed writes are counted and otherwise ignored. The buffer goes back
    /// to the pool afterwards.
    pub fn output(&self, severity: Severity, buf: PooledBuffer<'_>) {
        let mut targets: Destinations = Default::default();
        let (decision, stderr, exit_hook) = {
            let settings = self.settings.read();
            let decision = settings.thresholds.decide(severity);
            if decision.files {
                for s in severity.cascade() {
                    targets[s.index()] = settings.files[s.index()].clone();
                }
            }
            let exit_hook = (severity == Severity::Fatal).then(|| Arc::clone(&settings.exit_hook));
            (decision, Arc::clone(&settings.stderr), exit_hook)
        };

        let bytes = buf.as_bytes();
        if decision.stderr {
            self.write_to(stderr.as_ref(), bytes, false);
        }
        for s in severity.cascade() {
            if let Some(appender) = &targets[s.index()] {
                self.write_to(appender.as_ref(), bytes, true);
            }
        }
        self.stats.record_line(severity, bytes.len());
        buf.release();

        if let Some(exit_hook) = exit_hook {
            if let Err(e) = self.flush() {
                eprintln!("[LOGGER ERROR] Failed to flush before exit: {}", e);
            }
            exit_hook();
        }
    }

    fn write_to(&self, appender: &dyn Appender, bytes: &[u8], report: bool) {
        let failure = match catch_unwind(AssertUnwindSafe(|| appender.append(bytes))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };
        let previous = self.stats.record_write_error();
        if report && previous % WRITE_ERROR_REPORT_INTERVAL == 0 {
            eprintln!(
                "[LOGGER WARNING] Write to {} destination failed: {} ({} failures so far)",
                appender.name(),
                failure,
                previous + 1
            );
        }
    }

    /// Log a printf-style message
    #[track_caller]
    pub fn print(&self, severity: Severity, args: fmt::Arguments<'_>) {
        self.print_at(CallSite::caller(), severity, args);
    }

    pub fn print_at(&self, call_site: CallSite, severity: Severity, args: fmt::Arguments<'_>) {
        let mut buf = self.buffers.acquire();
        record::format_header(&mut buf, severity, &Local::now(), self.pid, &call_site);
        record::format_message(&mut buf, args);
        record::finish_line(&mut buf);
        self.output(severity, buf);
    }

    /// Log a structured message, optionally for an error.
    ///
    /// The error is logged as the `err` key ahead of `kvs`.
    #[track_caller]
    pub fn print_s(&self, severity: Severity, err: Option<Value>, msg: &str, kvs: &[Value]) {
        let call_site = CallSite::caller();
        match err {
            Some(err) => {
                let err_kv = [Value::from("err"), err];
                self.print_structured_at(call_site, severity, msg, &[&err_kv, kvs]);
            }
            None => self.print_structured_at(call_site, severity, msg, &[kvs]),
        }
    }

    /// Log a structured message built from several key/value lists
    pub fn print_structured_at(
        &self,
        call_site: CallSite,
        severity: Severity,
        msg: &str,
        lists: &[&[Value]],
    ) {
        let mut buf = self.buffers.acquire();
        record::format_header(&mut buf, severity, &Local::now(), self.pid, &call_site);
        record::format_structured(&mut buf, &self.formatter, msg, lists);
        record::finish_line(&mut buf);
        self.output(severity, buf);
    }

    #[track_caller]
    pub fn info_s(&self, msg: &str, kvs: &[Value]) {
        self.print_s(Severity::Info, None, msg, kvs);
    }

    #[track_caller]
    pub fn warning_s(&self, msg: &str, kvs: &[Value]) {
        self.print_s(Severity::Warning, None, msg, kvs);
    }

    /// Log an error with a message and key/value pairs
    #[track_caller]
    pub fn error_s(&self, err: impl Into<Value>, msg: &str, kvs: &[Value]) {
        self.print_s(Severity::Error, Some(err.into()), msg, kvs);
    }
}

/// INFO logging at one verbosity level, see [`Logging::v`].
///
/// The level is checked once when this value is created; a disabled value
/// formats nothing.
#[derive(Clone, Copy)]
pub struct Verbose<'a> {
    logging: &'a Logging,
    enabled: bool,
}

impl Verbose<'_> {
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        if self.enabled {
            self.logging.print_at(CallSite::caller(), Severity::Info, args);
        }
    }

    #[track_caller]
    pub fn info_s(&self, msg: &str, kvs: &[Value]) {
        if self.enabled {
            self.logging
                .print_structured_at(CallSite::caller(), Severity::Info, msg, &[kvs]);
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logging")
            .field("thresholds", &self.thresholds())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
