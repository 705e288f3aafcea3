//! References to named objects
//!
//! An [`ObjectRef`] logs an object by name and, when it has one, namespace:
//! `pod="kube-system/kube-dns"`.

use super::formatter::write_quoted;
use super::value::{MarshalLog, Value, WriteText};
use serde::Serialize;
use std::fmt;

/// Objects identified by a name within an optional namespace
pub trait ObjectMeta {
    fn name(&self) -> &str;

    /// Empty for objects that are not namespaced
    fn namespace(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectRef {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ObjectRef {
    /// Reference built from a namespace (possibly empty) and a name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Reference to `obj`
    pub fn of<T: ObjectMeta + ?Sized>(obj: &T) -> Self {
        Self::new(obj.namespace(), obj.name())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl WriteText for ObjectRef {
    fn write_text(&self, buf: &mut Vec<u8>) {
        write_quoted(buf, &self.to_string());
    }
}

/// Structured form for consumers that keep fields apart
impl MarshalLog for ObjectRef {
    fn marshal_log(&self) -> Value {
        serde_json::to_value(self).map_or(Value::Null, Value::Json)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::text(obj)
    }
}
