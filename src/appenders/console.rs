//! Console (standard error) appender

use crate::core::{Appender, Result};
use std::io::Write;

/// Writes finished lines to standard error.
///
/// Each line is written while holding the stderr lock, so lines from
/// different threads never interleave.
pub struct StderrAppender {
    #[cfg_attr(not(feature = "console"), allow(dead_code))]
    use_colors: bool,
}

impl StderrAppender {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    /// Colour the leading severity letter of every line.
    ///
    /// Without the `console` feature this setting has no effect.
    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    #[cfg(feature = "console")]
    fn colored_prefix(&self, bytes: &[u8]) -> Option<String> {
        use crate::core::Severity;
        use colored::Colorize;

        if !self.use_colors {
            return None;
        }
        let severity = Severity::ALL
            .into_iter()
            .find(|s| bytes.first() == Some(&(s.as_char() as u8)))?;
        Some(
            severity
                .as_char()
                .to_string()
                .color(severity.color_code())
                .to_string(),
        )
    }

    #[cfg(not(feature = "console"))]
    fn colored_prefix(&self, _bytes: &[u8]) -> Option<String> {
        None
    }
}

impl Default for StderrAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for StderrAppender {
    fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        match self.colored_prefix(bytes) {
            Some(prefix) => {
                stderr.write_all(prefix.as_bytes())?;
                stderr.write_all(&bytes[1..])?;
            }
            None => stderr.write_all(bytes)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stderr"
    }
}
