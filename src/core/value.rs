//! Values carried in key/value lists
//!
//! A key/value list is a flat `[Value]` slice alternating keys and values.
//! Keys are normally string values; any other value is rendered as text.

use super::structured_error::ErrorWithDetails;
use serde::Serialize;
use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Placeholder used for the value of a trailing key without a value
pub const MISSING_VALUE: &str = "(MISSING)";

/// A value that produces its log representation on demand.
///
/// The hook runs only when the record is actually formatted. A returned
/// string is rendered like any other string (multi-line support included).
pub trait MarshalLog: Send + Sync {
    fn marshal_log(&self) -> Value;
}

/// A value that writes its own representation straight into the buffer,
/// after the `=`.
pub trait WriteText: Send + Sync {
    fn write_text(&self, buf: &mut Vec<u8>);
}

type SerializeFn = dyn Fn(&mut Vec<u8>) -> serde_json::Result<()> + Send + Sync;
type DetailsFn = dyn Fn() -> serde_json::Value + Send + Sync;

/// An error value, optionally carrying structured details
#[derive(Clone)]
pub struct ErrorValue {
    pub(crate) error: Arc<dyn StdError + Send + Sync>,
    pub(crate) details: Option<Arc<DetailsFn>>,
}

impl ErrorValue {
    /// Wrap `error`. An [`ErrorWithDetails`] keeps its details.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let any: &dyn Any = &error;
        let details = any.downcast_ref::<ErrorWithDetails>().map(|err| {
            let err = err.clone();
            Arc::new(move || err.error_details()) as Arc<DetailsFn>
        });
        Self {
            error: Arc::new(error),
            details,
        }
    }

    pub fn error(&self) -> &(dyn StdError + Send + Sync) {
        self.error.as_ref()
    }

    /// Evaluate the details, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        self.details.as_ref().map(|details| details())
    }
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(Cow<'static, str>),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Serialize(Arc<SerializeFn>),
    Display(Arc<dyn fmt::Display + Send + Sync>),
    Error(ErrorValue),
    Marshal(Arc<dyn MarshalLog>),
    Text(Arc<dyn WriteText>),
}

impl Value {
    /// Lazily JSON-encoded value
    pub fn serialize<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Value::Serialize(Arc::new(move |buf: &mut Vec<u8>| {
            serde_json::to_writer(buf, &value)
        }))
    }

    /// Value rendered through its `Display` implementation at format time
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Value::Display(Arc::new(value))
    }

    pub fn error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Value::Error(ErrorValue::new(error))
    }

    pub fn marshal<M: MarshalLog + 'static>(value: M) -> Self {
        Value::Marshal(Arc::new(value))
    }

    pub fn text<T: WriteText + 'static>(value: T) -> Self {
        Value::Text(Arc::new(value))
    }

    pub const fn missing() -> Self {
        Value::Str(Cow::Borrowed(MISSING_VALUE))
    }

    /// The string content for plain string values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::UInt(u) => write!(f, "UInt({})", u),
            Value::Float(fl) => write!(f, "Float({})", fl),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Bytes(b) => write!(f, "Bytes({:?})", b),
            Value::Json(j) => write!(f, "Json({})", j),
            Value::Serialize(_) => f.write_str("Serialize(..)"),
            Value::Display(_) => f.write_str("Display(..)"),
            Value::Error(_) => f.write_str("Error(..)"),
            Value::Marshal(_) => f.write_str("Marshal(..)"),
            Value::Text(_) => f.write_str("Text(..)"),
        }
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value::Str(Cow::Borrowed(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Cow::Owned(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(Cow::Owned(s.clone()))
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(s: Cow<'static, str>) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64, isize);
impl_from_int!(UInt, u64: u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Value::Error(e)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Helpers for flat key/value lists
pub struct KeyValues;

impl KeyValues {
    /// Concatenate two lists into a new one.
    ///
    /// `old` is assumed to be well-formed; when the combined length is odd
    /// the result is padded with the missing-value placeholder.
    pub fn with_values(old: &[Value], new: &[Value]) -> Vec<Value> {
        if new.is_empty() {
            return old.to_vec();
        }
        let mut len = old.len() + new.len();
        let missing = len % 2 != 0;
        if missing {
            len += 1;
        }
        let mut kvs = Vec::with_capacity(len);
        kvs.extend_from_slice(old);
        kvs.extend_from_slice(new);
        if missing {
            kvs.push(Value::missing());
        }
        kvs
    }

    /// Iterate over `(key, value)` pairs; a trailing key yields the
    /// missing-value placeholder.
    pub fn pairs(kvs: &[Value]) -> impl Iterator<Item = (&Value, Option<&Value>)> {
        kvs.chunks(2).map(|pair| (&pair[0], pair.get(1)))
    }
}

/// Build a `Vec<Value>` key/value list.
///
/// ```
/// use rust_severity_logger::kvs;
///
/// let list = kvs!["pod" => "kube-dns", "restarts" => 3];
/// assert_eq!(list.len(), 4);
/// ```
#[macro_export]
macro_rules! kvs {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($key), $crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert!(matches!(Value::from("a"), Value::Str(Cow::Borrowed("a"))));
        assert!(matches!(Value::from(String::from("b")), Value::Str(_)));
        assert!(matches!(Value::from(3u8), Value::UInt(3)));
        assert!(matches!(Value::from(-3i32), Value::Int(-3)));
        assert!(matches!(Value::from(None::<i32>), Value::Null));
        assert!(matches!(Value::from(Some(true)), Value::Bool(true)));
    }

    #[test]
    fn test_error_keeps_details_of_detailed_errors() {
        let base = std::io::Error::new(std::io::ErrorKind::Other, "base");
        let detailed = ErrorWithDetails::new(base, serde_json::json!({"code": 7}));

        let Value::Error(err) = Value::error(detailed.clone()) else {
            panic!("expected an error value");
        };
        assert_eq!(err.details(), Some(serde_json::json!({"code": 7})));

        let by_error = [Value::from("err"), Value::error(detailed.clone())];
        let by_from = [Value::from("err"), Value::from(detailed)];
        let mut via_error = Vec::new();
        let mut via_from = Vec::new();
        crate::format_kvs(&mut via_error, &[&by_error[..]]);
        crate::format_kvs(&mut via_from, &[&by_from[..]]);
        assert_eq!(via_error, via_from);
        assert_eq!(via_error, br#" err="base" errDetails={"code":7}"#);

        let plain = std::io::Error::new(std::io::ErrorKind::Other, "plain");
        let Value::Error(err) = Value::error(plain) else {
            panic!("expected an error value");
        };
        assert!(err.details().is_none());
    }

    #[test]
    fn test_with_values_pads_missing() {
        let old = vec![Value::from("a"), Value::from(1)];
        let kvs = KeyValues::with_values(&old, &[Value::from("b")]);
        assert_eq!(kvs.len(), 4);
        assert_eq!(kvs[3].as_str(), Some(MISSING_VALUE));
        // The original list is untouched
        assert_eq!(old.len(), 2);
    }

    #[test]
    fn test_with_values_empty_new() {
        let old = vec![Value::from("a"), Value::from(1)];
        let kvs = KeyValues::with_values(&old, &[]);
        assert_eq!(kvs.len(), 2);
    }

    #[test]
    fn test_pairs() {
        let kvs = vec![Value::from("a"), Value::from(1), Value::from("b")];
        let pairs: Vec<_> = KeyValues::pairs(&kvs).collect();
        assert_eq!(pairs.len(), 2);
        assert!(pairs[1].1.is_none());
    }
}
