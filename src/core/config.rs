//! Threshold configuration read by the severity router
//!
//! The flag layer itself lives outside this crate. It hands flag values over
//! as strings through [`ThresholdConfig::apply_flag`], or as a deserialized
//! [`LoggingConfig`].

use super::error::{LoggerError, Result};
use super::severity::Severity;
use serde::{Deserialize, Serialize};

pub const FLAG_LOG_TO_STDERR: &str = "logtostderr";
pub const FLAG_ALSO_LOG_TO_STDERR: &str = "alsologtostderr";
pub const FLAG_STDERR_THRESHOLD: &str = "stderrthreshold";
pub const FLAG_ALSO_LOG_TO_STDERR_THRESHOLD: &str = "alsologtostderrthreshold";
pub const FLAG_LEGACY_STDERR_THRESHOLD_BEHAVIOR: &str = "legacy_stderr_threshold_behavior";
pub const FLAG_VERBOSITY: &str = "v";

/// Where one record goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteDecision {
    /// Cascade into the per-severity destinations
    pub files: bool,
    /// Write to the console
    pub stderr: bool,
}

/// Console/file routing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    /// Console is the primary destination; nothing reaches the files
    pub to_stderr: bool,
    /// Mirror file output to the console
    pub also_to_stderr: bool,
    /// With `to_stderr`, ignore `stderr_threshold` and print everything
    pub legacy_stderr_threshold_behavior: bool,
    pub stderr_threshold: Severity,
    pub also_stderr_threshold: Severity,
    /// Highest verbosity level of INFO records that get logged
    pub verbosity: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            to_stderr: true,
            also_to_stderr: false,
            legacy_stderr_threshold_behavior: true,
            stderr_threshold: Severity::Error,
            also_stderr_threshold: Severity::Info,
            verbosity: 0,
        }
    }
}

impl ThresholdConfig {
    /// Decide the destinations of a record at `severity`.
    ///
    /// Exactly one primary decision is made (console when `to_stderr`,
    /// files otherwise); only the file path may add a console mirror.
    pub fn decide(&self, severity: Severity) -> RouteDecision {
        if self.to_stderr {
            let stderr =
                self.legacy_stderr_threshold_behavior || severity >= self.stderr_threshold;
            return RouteDecision {
                files: false,
                stderr,
            };
        }

        let mirrored = severity >= self.stderr_threshold
            || (self.also_to_stderr && severity >= self.also_stderr_threshold);
        RouteDecision {
            files: true,
            stderr: mirrored,
        }
    }

    /// Whether INFO records at verbosity `level` are logged
    #[inline]
    pub fn verbosity_enabled(&self, level: u32) -> bool {
        level <= self.verbosity
    }

    /// Apply one flag given in its textual form.
    ///
    /// The config is left unchanged when the name or the value is invalid.
    pub fn apply_flag(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            FLAG_LOG_TO_STDERR => self.to_stderr = parse_bool(name, value)?,
            FLAG_ALSO_LOG_TO_STDERR => self.also_to_stderr = parse_bool(name, value)?,
            FLAG_LEGACY_STDERR_THRESHOLD_BEHAVIOR => {
                self.legacy_stderr_threshold_behavior = parse_bool(name, value)?
            }
            FLAG_STDERR_THRESHOLD => self.stderr_threshold = value.parse()?,
            FLAG_ALSO_LOG_TO_STDERR_THRESHOLD => self.also_stderr_threshold = value.parse()?,
            FLAG_VERBOSITY => {
                self.verbosity = value.parse::<u32>().map_err(|_| {
                    LoggerError::config(name, format!("invalid verbosity level '{}'", value))
                })?
            }
            _ => return Err(LoggerError::UnknownFlag(name.to_string())),
        }
        Ok(())
    }
}

/// Boolean syntax accepted by command-line flag parsers
fn parse_bool(flag: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(LoggerError::config(
            flag,
            format!("invalid boolean value '{}'", value),
        )),
    }
}

/// Deserializable form of the flag table.
///
/// Field names match the flag names, so a config file can use the same
/// spelling as the command line.
///
/// ```
/// use rust_severity_logger::{LoggingConfig, Severity};
///
/// let config: LoggingConfig = serde_json::from_str(
///     r#"{"logtostderr": false, "alsologtostderr": true, "alsologtostderrthreshold": "ERROR"}"#,
/// ).unwrap();
/// assert_eq!(config.alsologtostderrthreshold, Severity::Error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub logtostderr: bool,
    pub alsologtostderr: bool,
    pub stderrthreshold: Severity,
    pub alsologtostderrthreshold: Severity,
    pub legacy_stderr_threshold_behavior: bool,
    pub v: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        ThresholdConfig::default().into()
    }
}

impl From<ThresholdConfig> for LoggingConfig {
    fn from(config: ThresholdConfig) -> Self {
        Self {
            logtostderr: config.to_stderr,
            alsologtostderr: config.also_to_stderr,
            stderrthreshold: config.stderr_threshold,
            alsologtostderrthreshold: config.also_stderr_threshold,
            legacy_stderr_threshold_behavior: config.legacy_stderr_threshold_behavior,
            v: config.verbosity,
        }
    }
}

impl From<&LoggingConfig> for ThresholdConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            to_stderr: config.logtostderr,
            also_to_stderr: config.alsologtostderr,
            legacy_stderr_threshold_behavior: config.legacy_stderr_threshold_behavior,
            stderr_threshold: config.stderrthreshold,
            also_stderr_threshold: config.alsologtostderrthreshold,
            verbosity: config.v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ThresholdConfig::default();
        assert!(config.to_stderr);
        assert!(config.legacy_stderr_threshold_behavior);
        assert_eq!(config.stderr_threshold, Severity::Error);
        assert_eq!(config.also_stderr_threshold, Severity::Info);
    }

    #[test]
    fn test_legacy_to_stderr_ignores_threshold() {
        let config = ThresholdConfig::default();
        for severity in Severity::ALL {
            let decision = config.decide(severity);
            assert!(decision.stderr);
            assert!(!decision.files);
        }
    }

    #[test]
    fn test_to_stderr_honors_threshold() {
        let config = ThresholdConfig {
            legacy_stderr_threshold_behavior: false,
            stderr_threshold: Severity::Warning,
            ..ThresholdConfig::default()
        };
        assert!(!config.decide(Severity::Info).stderr);
        assert!(config.decide(Severity::Warning).stderr);
        assert!(config.decide(Severity::Error).stderr);
        assert!(!config.decide(Severity::Error).files);
    }

    #[test]
    fn test_also_to_stderr_mirror() {
        let config = ThresholdConfig {
            to_stderr: false,
            also_to_stderr: true,
            stderr_threshold: Severity::Fatal,
            also_stderr_threshold: Severity::Error,
            ..ThresholdConfig::default()
        };
        assert_eq!(
            config.decide(Severity::Warning),
            RouteDecision {
                files: true,
                stderr: false
            }
        );
        assert_eq!(
            config.decide(Severity::Error),
            RouteDecision {
                files: true,
                stderr: true
            }
        );
    }

    #[test]
    fn test_also_threshold_ignored_when_mirror_disabled() {
        let config = ThresholdConfig {
            to_stderr: false,
            also_to_stderr: false,
            stderr_threshold: Severity::Fatal,
            also_stderr_threshold: Severity::Info,
            ..ThresholdConfig::default()
        };
        assert!(!config.decide(Severity::Error).stderr);
        assert!(config.decide(Severity::Fatal).stderr);
    }

    #[test]
    fn test_apply_flags() {
        let mut config = ThresholdConfig::default();
        config.apply_flag("logtostderr", "false").unwrap();
        config
            .apply_flag("legacy_stderr_threshold_behavior", "0")
            .unwrap();
        config.apply_flag("stderrthreshold", "WARNING").unwrap();
        config.apply_flag("alsologtostderrthreshold", "info").unwrap();
        config.apply_flag("alsologtostderr", "T").unwrap();

        assert!(!config.to_stderr);
        assert!(!config.legacy_stderr_threshold_behavior);
        assert!(config.also_to_stderr);
        assert_eq!(config.stderr_threshold, Severity::Warning);
        assert_eq!(config.also_stderr_threshold, Severity::Info);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let mut config = ThresholdConfig::default();
        let before = config;

        let err = config
            .apply_flag("alsologtostderrthreshold", "INVALID")
            .unwrap_err();
        assert!(matches!(err, LoggerError::InvalidSeverity { .. }));
        assert!(config.apply_flag("logtostderr", "yes").is_err());
        assert!(config.apply_flag("v", "-1").is_err());
        assert!(matches!(
            config.apply_flag("vmodule", "2"),
            Err(LoggerError::UnknownFlag(_))
        ));
        assert_eq!(config, before);
    }

    #[test]
    fn test_verbosity_flag() {
        let mut config = ThresholdConfig::default();
        assert!(config.verbosity_enabled(0));
        assert!(!config.verbosity_enabled(1));

        config.apply_flag("v", "3").unwrap();
        assert!(config.verbosity_enabled(3));
        assert!(!config.verbosity_enabled(4));

        let parsed: LoggingConfig = serde_json::from_str(r#"{"v": 2}"#).unwrap();
        assert_eq!(ThresholdConfig::from(&parsed).verbosity, 2);
    }

    #[test]
    fn test_logging_config_roundtrip_defaults() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(ThresholdConfig::from(&config), ThresholdConfig::default());
    }

    #[test]
    fn test_logging_config_rejects_bad_severity() {
        let result = serde_json::from_str::<LoggingConfig>(r#"{"stderrthreshold": "LOUD"}"#);
        assert!(result.is_err());
    }
}
