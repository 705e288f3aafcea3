//! Output statistics for observability
//!
//! Counts lines and bytes per severity and destination write failures.

use super::severity::Severity;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of write failures between two `[LOGGER WARNING]` reports
pub const WRITE_ERROR_REPORT_INTERVAL: u64 = 1000;

/// Per-severity output counters
///
/// # Example
///
/// ```
/// use rust_severity_logger::{OutputStats, Severity};
///
/// let stats = OutputStats::new();
/// stats.record_line(Severity::Warning, 42);
///
/// assert_eq!(stats.lines(Severity::Warning), 1);
/// assert_eq!(stats.bytes(Severity::Warning), 42);
/// ```
#[derive(Debug)]
pub struct OutputStats {
    lines: [AtomicU64; Severity::COUNT],
    bytes: [AtomicU64; Severity::COUNT],
    /// Failed destination writes, across all destinations
    write_errors: AtomicU64,
}

impl OutputStats {
    /// Create a new stats instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            lines: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
            bytes: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
            write_errors: AtomicU64::new(0),
        }
    }

    /// Lines emitted at this severity
    #[inline]
    pub fn lines(&self, severity: Severity) -> u64 {
        self.lines[severity.index()].load(Ordering::Relaxed)
    }

    /// Bytes emitted at this severity
    #[inline]
    pub fn bytes(&self, severity: Severity) -> u64 {
        self.bytes[severity.index()].load(Ordering::Relaxed)
    }

    /// Lines emitted at any severity
    pub fn total_lines(&self) -> u64 {
        Severity::ALL.iter().map(|s| self.lines(*s)).sum()
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_line(&self, severity: Severity, len: usize) {
        self.lines[severity.index()].fetch_add(1, Ordering::Relaxed);
        self.bytes[severity.index()].fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Record a failed write, returning the previous count
    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.lines.iter().chain(self.bytes.iter()) {
            counter.store(0, Ordering::Relaxed);
        }
        self.write_errors.store(0, Ordering::Relaxed);
    }
}

impl Default for OutputStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for OutputStats {
    /// Create a snapshot of the current counter values
    fn clone(&self) -> Self {
        let snapshot = Self::new();
        for severity in Severity::ALL {
            let i = severity.index();
            snapshot.lines[i].store(self.lines(severity), Ordering::Relaxed);
            snapshot.bytes[i].store(self.bytes(severity), Ordering::Relaxed);
        }
        snapshot
            .write_errors
            .store(self.write_errors(), Ordering::Relaxed);
        snapshot
    }
}
