//! Context injection
//!
//! Values are looked up in the context only for records that are actually
//! emitted, so disabled severities never pay for the extraction.

use super::{CallDepthLogSink, CallSite, CallStackHelper, CallStackHelperLogSink, LogSink};
use crate::core::{Severity, Value};
use std::fmt;
use std::sync::Arc;

/// Read access to ambient values
pub trait ContextSource: Send + Sync {
    fn value(&self, key: &str) -> Option<Value>;
}

/// A context value to log: looked up by `key`, logged as `name`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextKey {
    pub key: &'static str,
    pub name: &'static str,
}

impl ContextKey {
    pub const fn new(key: &'static str, name: &'static str) -> Self {
        Self { key, name }
    }
}

/// Immutable key/value context.
///
/// Adding a value returns a new context; existing handles keep seeing the
/// values they were created with.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<Vec<(String, Value)>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let mut values: Vec<(String, Value)> = self
            .values
            .iter()
            .filter(|(k, _)| *k != key)
            .cloned()
            .collect();
        values.push((key, value.into()));
        Self {
            values: Arc::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ContextSource for Context {
    fn value(&self, key: &str) -> Option<Value> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// How the context sink forwards, fixed when it is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Plain,
    CallDepth { depth: usize },
    Helper,
}

/// Decorator appending configured context values to every emitted record.
#[derive(Clone)]
pub struct ContextLogSink {
    inner: Arc<dyn LogSink>,
    context: Arc<dyn ContextSource>,
    keys: Arc<[ContextKey]>,
    flavor: Flavor,
}

impl ContextLogSink {
    pub fn new(
        inner: Arc<dyn LogSink>,
        context: Arc<dyn ContextSource>,
        keys: Arc<[ContextKey]>,
    ) -> Self {
        let flavor = Self::detect(inner.as_ref(), 0);
        Self {
            inner,
            context,
            keys,
            flavor,
        }
    }

    fn detect(inner: &dyn LogSink, depth: usize) -> Flavor {
        if inner.as_call_depth().is_some() {
            Flavor::CallDepth { depth }
        } else if inner.as_call_stack_helper().is_some() {
            Flavor::Helper
        } else {
            Flavor::Plain
        }
    }

    /// The context values that would be added to a record right now
    pub fn extract(&self) -> Vec<Value> {
        let mut kvs = Vec::with_capacity(self.keys.len() * 2);
        self.append_to(&mut kvs);
        kvs
    }

    fn append_to(&self, kvs: &mut Vec<Value>) {
        for key in self.keys.iter() {
            if let Some(value) = self.context.value(key.key) {
                kvs.push(Value::from(key.name));
                kvs.push(value);
            }
        }
    }
}

impl LogSink for ContextLogSink {
    fn enabled(&self, severity: Severity) -> bool {
        self.inner.enabled(severity)
    }

    fn verbosity_enabled(&self, level: u32) -> bool {
        self.inner.verbosity_enabled(level)
    }

    fn emit(&self, call_site: CallSite, severity: Severity, msg: &str, kvs: &[Value]) {
        let mut all = kvs.to_vec();
        self.append_to(&mut all);
        match self.flavor {
            Flavor::Plain | Flavor::CallDepth { depth: 0 } => {
                self.inner.emit(call_site, severity, msg, &all)
            }
            Flavor::CallDepth { depth } => {
                super::with_call_depth(&self.inner, depth).emit(call_site, severity, msg, &all)
            }
            Flavor::Helper => {
                if let Some(helper) = self.inner.as_call_stack_helper() {
                    helper.call_stack_helper()();
                }
                self.inner.emit(call_site, severity, msg, &all);
            }
        }
    }

    fn with_values(&self, kvs: &[Value]) -> Arc<dyn LogSink> {
        let inner = self.inner.with_values(kvs);
        let depth = match self.flavor {
            Flavor::CallDepth { depth } => depth,
            _ => 0,
        };
        let flavor = Self::detect(inner.as_ref(), depth);
        Arc::new(Self {
            inner,
            context: Arc::clone(&self.context),
            keys: Arc::clone(&self.keys),
            flavor,
        })
    }

    fn as_call_depth(&self) -> Option<&dyn CallDepthLogSink> {
        match self.flavor {
            Flavor::CallDepth { .. } => Some(self),
            _ => None,
        }
    }

    fn as_call_stack_helper(&self) -> Option<&dyn CallStackHelperLogSink> {
        match self.flavor {
            Flavor::Helper => Some(self),
            _ => None,
        }
    }
}

impl CallDepthLogSink for ContextLogSink {
    fn with_call_depth(&self, depth: usize) -> Arc<dyn LogSink> {
        let mut clone = self.clone();
        if let Flavor::CallDepth { depth: current } = clone.flavor {
            clone.flavor = Flavor::CallDepth {
                depth: current + depth,
            };
        }
        Arc::new(clone)
    }
}

impl CallStackHelperLogSink for ContextLogSink {
    fn call_stack_helper(&self) -> CallStackHelper {
        match self.inner.as_call_stack_helper() {
            Some(helper) => helper.call_stack_helper(),
            None => Arc::new(|| {}),
        }
    }
}
