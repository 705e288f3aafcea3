//! Logging macros for printf-style messages.
//!
//! The first argument is anything with a
//! `print(Severity, fmt::Arguments)` method: a [`Logging`](crate::Logging)
//! instance or a [`Logger`](crate::Logger). The call site of the macro is the
//! call site of the record.
//!
//! # Examples
//!
//! ```
//! use rust_severity_logger::prelude::*;
//! use rust_severity_logger::{info, warning};
//! use std::sync::Arc;
//!
//! let logging = Logging::new();
//! let console = MemoryAppender::new();
//! logging.set_stderr(Arc::new(console.clone()));
//!
//! info!(logging, "Server started");
//!
//! let port = 8080;
//! warning!(logging, "Port {} already in use", port);
//!
//! assert!(console.contains("Port 8080 already in use"));
//! ```

/// Log a formatted message at the given severity.
///
/// # Examples
///
/// ```
/// # use rust_severity_logger::prelude::*;
/// # let logging = Logging::new();
/// # logging.set_stderr(std::sync::Arc::new(MemoryAppender::new()));
/// use rust_severity_logger::log;
/// log!(logging, Severity::Info, "Simple message");
/// log!(logging, Severity::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($target:expr, $severity:expr, $($arg:tt)+) => {
        $target.print($severity, ::std::format_args!($($arg)+))
    };
}

/// Log an INFO message.
#[macro_export]
macro_rules! info {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Severity::Info, $($arg)+)
    };
}

/// Log a WARNING message.
#[macro_export]
macro_rules! warning {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Severity::Warning, $($arg)+)
    };
}

/// Log an ERROR message.
///
/// # Examples
///
/// ```
/// # use rust_severity_logger::prelude::*;
/// # let logging = Logging::new();
/// # logging.set_stderr(std::sync::Arc::new(MemoryAppender::new()));
/// use rust_severity_logger::error;
/// error!(logging, "Connection to {} lost", "10.0.0.7:6443");
/// ```
#[macro_export]
macro_rules! error {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a FATAL message. The record is flushed and the exit hook runs,
/// which terminates the process unless it was replaced.
#[macro_export]
macro_rules! fatal {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Severity::Fatal, $($arg)+)
    };
}
