//! Record assembly
//!
//! Every line has the shape
//!
//! ```text
//! Lmmdd hh:mm:ss.uuuuuu threadid file:line] msg...
//! ```
//!
//! where `L` is the severity letter and `threadid` is the process id, padded
//! to seven columns.

use super::formatter::{write_quoted, KvFormatter};
use super::severity::Severity;
use super::value::Value;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::path::Path;
use std::sync::OnceLock;

/// Source location a record is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// The location of the outermost `#[track_caller]` caller
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// File name without directories
    pub fn basename(&self) -> &'static str {
        self.file.rsplit(['/', '\\']).next().unwrap_or(self.file)
    }

    /// The location `depth` frames above this one on the current stack.
    ///
    /// `self` must belong to a frame that is still active. Frames without
    /// debug info are not counted. Returns `None` when this location cannot
    /// be found on the stack.
    pub fn resolve_up(&self, depth: usize) -> Option<CallSite> {
        if depth == 0 {
            return Some(*self);
        }
        let mut remaining: Option<usize> = None;
        let mut resolved = None;
        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                if resolved.is_some() {
                    return;
                }
                let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) else {
                    return;
                };
                match remaining.as_mut() {
                    None => {
                        if line == self.line && file.ends_with(self.file) {
                            remaining = Some(depth);
                        }
                    }
                    Some(left) => {
                        *left -= 1;
                        if *left == 0 {
                            resolved = Some(CallSite::new(intern(file), line));
                        }
                    }
                }
            });
            resolved.is_none()
        });
        resolved
    }
}

/// Resolved file names live as long as the process; there is one entry per
/// source file.
fn intern(path: &Path) -> &'static str {
    static FILES: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();
    let name = path.to_string_lossy();
    let mut files = FILES.get_or_init(Default::default).lock();
    if let Some(&existing) = files.get(name.as_ref()) {
        return existing;
    }
    let leaked: &'static str = Box::leak(name.into_owned().into_boxed_str());
    files.insert(leaked);
    leaked
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.basename(), self.line)
    }
}

/// Write the line header, up to and including `"] "`
pub fn format_header(
    buf: &mut Vec<u8>,
    severity: Severity,
    now: &DateTime<Local>,
    pid: u32,
    call_site: &CallSite,
) {
    let _ = write!(
        buf,
        "{}{} {:>7} {}] ",
        severity.as_char(),
        now.format("%m%d %H:%M:%S%.6f"),
        pid,
        call_site
    );
}

/// Write a structured body: quoted message followed by key/value pairs
pub fn format_structured(buf: &mut Vec<u8>, formatter: &KvFormatter, msg: &str, lists: &[&[Value]]) {
    write_quoted(buf, msg);
    formatter.format_kvs(buf, lists);
}

/// Write a printf-style body
pub fn format_message(buf: &mut Vec<u8>, args: fmt::Arguments<'_>) {
    let _ = buf.write_fmt(args);
}

/// Terminate the line unless the message already did
pub fn finish_line(buf: &mut Vec<u8>) {
    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }
}
