//! Per-call execution context.
//!
//! # Responsibilities
//! - Carry the operation key and a correlation ID for logging
//! - Hold an ordered bag of typed values visible to the duration provider,
//!   the operation and the timeout callback of one call
//!
//! # Design Decisions
//! - `Context` is a handle: clones share one instance, so a value written by
//!   the duration provider is seen by the callback of the same call
//! - Identity is observable through `ptr_eq`

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// A value stored in a [`Context`].
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Duration(Duration),
}

impl From<bool> for ContextValue {
    fn from(v: bool) -> Self {
        ContextValue::Bool(v)
    }
}

impl From<i64> for ContextValue {
    fn from(v: i64) -> Self {
        ContextValue::Int(v)
    }
}

impl From<f64> for ContextValue {
    fn from(v: f64) -> Self {
        ContextValue::Float(v)
    }
}

impl From<&str> for ContextValue {
    fn from(v: &str) -> Self {
        ContextValue::Str(v.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        ContextValue::Str(v)
    }
}

impl From<Duration> for ContextValue {
    fn from(v: Duration) -> Self {
        ContextValue::Duration(v)
    }
}

struct Inner {
    operation_key: Option<String>,
    correlation_id: Uuid,
    values: RwLock<BTreeMap<String, ContextValue>>,
}

/// Execution context shared by everything taking part in one call.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Create an anonymous context.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a context tagged with an operation key.
    pub fn with_key(operation_key: impl Into<String>) -> Self {
        Self::build(Some(operation_key.into()))
    }

    fn build(operation_key: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                operation_key,
                correlation_id: Uuid::new_v4(),
                values: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    pub fn operation_key(&self) -> Option<&str> {
        self.inner.operation_key.as_deref()
    }

    pub fn correlation_id(&self) -> Uuid {
        self.inner.correlation_id
    }

    /// Returns true if both handles refer to the same context instance.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Insert a value, returning the previous one under that key.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<ContextValue>) -> Option<ContextValue> {
        // A poisoned map still holds consistent entries; writers never panic mid-insert.
        let mut values = self.inner.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<ContextValue> {
        let mut values = self.inner.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<ContextValue> {
        let values = self.inner.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let values = self.inner.values.read().unwrap_or_else(|e| e.into_inner());
        values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            ContextValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            ContextValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            ContextValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            ContextValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        match self.get(key)? {
            ContextValue::Duration(v) => Some(v),
            _ => None,
        }
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<String> {
        let values = self.inner.values.read().unwrap_or_else(|e| e.into_inner());
        values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let values = self.inner.values.read().unwrap_or_else(|e| e.into_inner());
        values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation key for log fields; `-` when none was given.
    pub fn log_key(&self) -> &str {
        self.operation_key().unwrap_or("-")
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("operation_key", &self.inner.operation_key)
            .field("correlation_id", &self.inner.correlation_id)
            .field("len", &self.len())
            .finish()
    }
}
