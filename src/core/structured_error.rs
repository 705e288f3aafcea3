//! Errors that carry additional structured details for logging
//!
//! When such an error is logged under key `err`, the formatter adds a second
//! pair `errDetails=<json>` next to the usual `err="<message>"`.

use super::value::{ErrorValue, Value};
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
enum Details {
    Eager(serde_json::Value),
    Lazy(Arc<dyn Fn() -> serde_json::Value + Send + Sync>),
}

impl Details {
    fn evaluate(&self) -> serde_json::Value {
        match self {
            Details::Eager(value) => value.clone(),
            Details::Lazy(produce) => produce(),
        }
    }
}

/// An error annotated with details for logging.
///
/// Wrapping an `ErrorWithDetails` again keeps the innermost error and
/// collects all details into one list, outermost last.
///
/// ```
/// use rust_severity_logger::ErrorWithDetails;
/// use serde_json::json;
///
/// let base = std::io::Error::new(std::io::ErrorKind::Other, "base");
/// let err = ErrorWithDetails::new(ErrorWithDetails::new(base, json!("hello")), json!("world"));
/// assert_eq!(err.to_string(), "base");
/// assert_eq!(err.error_details(), json!(["hello", "world"]));
/// ```
#[derive(Clone)]
pub struct ErrorWithDetails {
    source: Arc<dyn StdError + Send + Sync>,
    details: Vec<Details>,
}

impl ErrorWithDetails {
    pub fn new<E>(err: E, details: serde_json::Value) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::wrap(err, Details::Eager(details))
    }

    /// Details are produced only when the error actually gets logged
    pub fn new_lazy<E, F>(err: E, details: F) -> Self
    where
        E: StdError + Send + Sync + 'static,
        F: Fn() -> serde_json::Value + Send + Sync + 'static,
    {
        Self::wrap(err, Details::Lazy(Arc::new(details)))
    }

    fn wrap<E>(err: E, details: Details) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let any: &dyn Any = &err;
        if let Some(inner) = any.downcast_ref::<ErrorWithDetails>() {
            let mut all = inner.details.clone();
            all.push(details);
            return Self {
                source: Arc::clone(&inner.source),
                details: all,
            };
        }
        Self {
            source: Arc::new(err),
            details: vec![details],
        }
    }

    /// A single value, or a list when details were added more than once.
    ///
    /// Each wrapping appends to the list built so far. A list produced by
    /// the inner details is extended rather than nested.
    pub fn error_details(&self) -> serde_json::Value {
        let mut layers = self.details.iter().map(Details::evaluate);
        let Some(innermost) = layers.next() else {
            return serde_json::Value::Null;
        };
        layers.fold(innermost, |acc, outer| match acc {
            serde_json::Value::Array(mut list) => {
                list.push(outer);
                serde_json::Value::Array(list)
            }
            single => serde_json::Value::Array(vec![single, outer]),
        })
    }

    /// The wrapped error without details
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

impl fmt::Debug for ErrorWithDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorWithDetails")
            .field("source", &self.source)
            .field("details", &self.details.len())
            .finish()
    }
}

impl fmt::Display for ErrorWithDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl StdError for ErrorWithDetails {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.source()
    }
}

impl From<ErrorWithDetails> for Value {
    fn from(err: ErrorWithDetails) -> Self {
        Value::Error(ErrorValue::new(err))
    }
}
