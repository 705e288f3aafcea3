//! Console threshold example
//!
//! Demonstrates how the threshold flags select what reaches stderr.
//!
//! Run with:
//!
//! ```text
//! # Legacy behavior: every message reaches stderr
//! cargo run --example stderr_threshold -- --logtostderr=true --stderrthreshold=ERROR
//!
//! # Only ERROR reaches stderr
//! cargo run --example stderr_threshold -- --logtostderr=true \
//!     --legacy_stderr_threshold_behavior=false --stderrthreshold=ERROR
//!
//! # Also show INFO records up to verbosity 1
//! cargo run --example stderr_threshold -- --v=1
//!
//! # Everything goes to files in /tmp/logs, only ERROR is mirrored to stderr
//! cargo run --example stderr_threshold -- --logtostderr=false --alsologtostderr=true \
//!     --alsologtostderrthreshold=ERROR --stderrthreshold=FATAL --log_dir=/tmp/logs
//! ```

use rust_severity_logger::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    let logging = Arc::new(Logging::new());
    let mut log_dir: Option<PathBuf> = None;

    for arg in std::env::args().skip(1) {
        let Some((name, value)) = arg.trim_start_matches('-').split_once('=') else {
            return Err(LoggerError::config("arguments", format!("expected --name=value, got '{}'", arg)));
        };
        if name == "log_dir" {
            log_dir = Some(PathBuf::from(value));
        } else {
            logging.apply_flag(name, value)?;
        }
    }

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(&dir)?;
        for severity in Severity::ALL {
            let appender = FileAppender::new(dir.join(format!("stderr_threshold.{}", severity)))?;
            logging.set_output_by_severity(severity.name(), Arc::new(appender))?;
        }
    }

    let logger = Logger::from_logging(Arc::clone(&logging)).with_name("demo");
    logger.info("This is an INFO message", &[]);
    logger
        .v(1)
        .info("Shown with --v=1", &kvs!["pod" => ObjectRef::new("kube-system", "kube-dns")]);
    logger.warning("This is a WARNING message", &[]);
    logger.error(
        ErrorWithDetails::new(std::io::Error::other("disk full"), serde_json::json!({"free": 0})),
        "This is an ERROR message",
        &kvs!["volume" => "/var/lib/data"],
    );

    logging.flush()
}
