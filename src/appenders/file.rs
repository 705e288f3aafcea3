//! File appender implementation
//!
//! Creating, naming and rotating log files is the caller's business; this
//! appender appends to one already chosen path.

use crate::core::{Appender, LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct FileAppender {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    lock_file: bool,
}

impl FileAppender {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(LoggerError::file_appender("", "empty log file path"));
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::io_operation("opening log file", path.display().to_string(), e))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path,
            lock_file: false,
        })
    }

    /// Hold an advisory lock on the file for every append and flush each
    /// line through, so several processes can share one file.
    ///
    /// The advisory lock requires the `file` feature; without it lines are
    /// still flushed one by one.
    #[must_use]
    pub fn with_file_lock(mut self, lock_file: bool) -> Self {
        self.lock_file = lock_file;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(feature = "file")]
    fn append_locked(&self, writer: &mut BufWriter<File>, bytes: &[u8]) -> Result<()> {
        use fs2::FileExt;

        writer.flush()?;
        FileExt::lock_exclusive(writer.get_ref())
            .map_err(|_| LoggerError::file_lock(self.path.display().to_string()))?;
        let result = writer.write_all(bytes).and_then(|_| writer.flush());
        let unlocked = FileExt::unlock(writer.get_ref());
        result?;
        unlocked?;
        Ok(())
    }

    #[cfg(not(feature = "file"))]
    fn append_locked(&self, writer: &mut BufWriter<File>, bytes: &[u8]) -> Result<()> {
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}

impl Appender for FileAppender {
    fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        if self.lock_file {
            return self.append_locked(&mut writer, bytes);
        }
        writer.write_all(bytes)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.writer.get_mut().flush();
    }
}
