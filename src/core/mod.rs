//! Core engine: formatting, routing and the front end

pub mod appender;
pub mod buffer;
pub mod config;
pub mod error;
pub mod formatter;
pub mod logger;
pub mod logging;
pub mod metrics;
pub mod object_ref;
pub mod record;
pub mod severity;
pub mod structured_error;
pub mod value;

pub use appender::Appender;
pub use buffer::{Buffer, BufferPool, PooledBuffer, DEFAULT_CAPACITY, MAX_RETAINED_CAPACITY};
pub use config::{LoggingConfig, RouteDecision, ThresholdConfig};
pub use error::{LoggerError, Result};
pub use formatter::{format_kvs, write_string_value, AnyToStringHook, KvFormatter};
pub use logger::{Logger, LOGGER_NAME_KEY};
pub use logging::{ExitHook, Logging, StateGuard, StateSnapshot, Verbose, FATAL_EXIT_CODE};
pub use metrics::OutputStats;
pub use object_ref::{ObjectMeta, ObjectRef};
pub use record::CallSite;
pub use severity::Severity;
pub use structured_error::ErrorWithDetails;
pub use value::{ErrorValue, KeyValues, MarshalLog, Value, WriteText, MISSING_VALUE};
