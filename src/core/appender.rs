//! Appender trait for log output destinations

use super::error::Result;

/// A destination for finished log lines.
///
/// Appenders are shared between all logging threads. Each `append` call
/// must reach the destination as one non-torn write; implementations do
/// their own locking.
pub trait Appender: Send + Sync {
    fn append(&self, bytes: &[u8]) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;
}
