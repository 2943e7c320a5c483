//! Driver-native argument and option types.

use std::fmt;

use chrono::{DateTime, Utc};

use super::{DriverError, Result};

/// A driver-native value, used for both arguments and result columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An argument passed to a context-aware call.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// Parameter name, when the caller bound by name.
    pub name: Option<String>,
    /// 1-based position of the parameter.
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
        }
    }

    /// Number positional values starting at 1.
    pub fn from_values(values: &[Value]) -> Vec<NamedValue> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| NamedValue::positional(i + 1, v.clone()))
            .collect()
    }
}

/// Strip ordinals from named values for the legacy (no context) calls.
///
/// Fails when any argument carries a name, since legacy calls are
/// positional only.
pub fn named_values_to_values(args: &[NamedValue]) -> Result<Vec<Value>> {
    args.iter()
        .map(|arg| match arg.name {
            Some(_) => Err(DriverError::NamedParameters),
            None => Ok(arg.value.clone()),
        })
        .collect()
}

/// Raw call arguments as they were handed to the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Arguments {
    #[default]
    None,
    Values(Vec<Value>),
    Named(Vec<NamedValue>),
}

impl Arguments {
    pub fn is_empty(&self) -> bool {
        match self {
            Arguments::None => true,
            Arguments::Values(v) => v.is_empty(),
            Arguments::Named(v) => v.is_empty(),
        }
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        match self {
            Arguments::None => {}
            Arguments::Values(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
            }
            Arguments::Named(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &v.name {
                        Some(name) => write!(f, "{}={}", name, v.value)?,
                        None => write!(f, "{}", v.value)?,
                    }
                }
            }
        }
        write!(f, "]")
    }
}

/// Transaction isolation level requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, `None` for the driver default.
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

/// Options for a context-aware transaction begin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    /// Check that the options can be honored by a legacy `begin`.
    pub fn ensure_legacy_compatible(&self) -> Result<()> {
        if self.isolation != IsolationLevel::Default {
            return Err(DriverError::UnsupportedIsolation);
        }
        if self.read_only {
            return Err(DriverError::ReadOnlyUnsupported);
        }
        Ok(())
    }
}
