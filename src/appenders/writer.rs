//! Appender over any `std::io::Write`

use crate::core::{Appender, Result};
use parking_lot::Mutex;
use std::io::Write;

/// Adapts an arbitrary writer into an [`Appender`].
///
/// The writer sits behind a mutex so each line is written in one piece.
pub struct WriterAppender<W: Write + Send> {
    writer: Mutex<W>,
    name: String,
}

impl<W: Write + Send> WriterAppender<W> {
    pub fn new(writer: W) -> Self {
        Self::named(writer, "writer")
    }

    pub fn named(writer: W, name: impl Into<String>) -> Self {
        Self {
            writer: Mutex::new(writer),
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Appender for WriterAppender<W> {
    fn append(&self, bytes: &[u8]) -> Result<()> {
        self.writer.lock().write_all(bytes)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoggerError;
    use std::io;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_through() {
        let appender = WriterAppender::new(Vec::new());
        appender.append(b"line\n").unwrap();
        assert_eq!(appender.into_inner(), b"line\n");
    }

    #[test]
    fn test_errors_are_reported() {
        let appender = WriterAppender::named(Broken, "broken");
        let err = appender.append(b"line\n").unwrap_err();
        assert!(matches!(err, LoggerError::IoError(_)));
        assert_eq!(appender.name(), "broken");
    }
}
