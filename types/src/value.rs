//! Runtime values and namespaces.
//!
//! A [`Namespace`] is the externally observable projection of an activated
//! module: an ordered map from export name to [`Value`]. The value model is
//! intentionally small — enough for a module engine to expose data and
//! zero-argument functions through the loader's contract. Richer runtimes
//! wrap their own representations behind it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A zero-argument callable exported by a module.
pub type ValueFn = dyn Fn() -> Value + Send + Sync;

/// An exported module value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Unit,
    Int(i64),
    Text(String),
    Function(Arc<ValueFn>),
}

impl Value {
    /// Wrap a closure as a callable value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Invoke a callable value. `None` if this value is not callable.
    #[must_use]
    pub fn call(&self) -> Option<Value> {
        match self {
            Self::Function(f) => Some(f()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            // Functions are opaque; identity is the only meaningful equality.
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "Unit"),
            Self::Int(n) => write!(f, "Int({n})"),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Function(_) => write!(f, "Function(<fn>)"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Ordered export-name → value map exposed by an activated module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    entries: BTreeMap<String, Value>,
}

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace with a single `default` export, as produced for foreign
    /// (legacy synchronous) modules.
    #[must_use]
    pub fn single_default(value: Value) -> Self {
        let mut ns = Self::new();
        ns.insert("default", value);
        ns
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
