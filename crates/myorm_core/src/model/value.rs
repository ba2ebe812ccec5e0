//! Closed set of column values exchanged with the executor.
//!
//! # Responsibility
//! - Define the only value shapes the mapping engine can bind or read.
//! - Convert Rust field types to and from those shapes.
//!
//! # Invariants
//! - `Value::Null` carries no kind; every other variant maps to exactly one
//!   `ValueKind`.
//! - Non-optional field types never accept `Value::Null`.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tag for every supported column value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Date,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }

    /// Whether the kind can hold a database-generated row identity.
    pub fn is_integral(self) -> bool {
        matches!(self, Self::Integer | Self::Long)
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    /// Returns `None` for `Value::Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::String(_) => Some(ValueKind::String),
            Self::Integer(_) => Some(ValueKind::Integer),
            Self::Long(_) => Some(ValueKind::Long),
            Self::Double(_) => Some(ValueKind::Double),
            Self::Boolean(_) => Some(ValueKind::Boolean),
            Self::Date(_) => Some(ValueKind::Date),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
        }
    }
}

/// A value did not fit the declared field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    pub expected: ValueKind,
    /// `None` means the offending value was NULL.
    pub found: Option<ValueKind>,
}

impl Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.found {
            Some(found) => write!(f, "expected {} value, found {found}", self.expected),
            None => write!(f, "expected {} value, found null", self.expected),
        }
    }
}

impl Error for ValueError {}

/// Rust field types that can be persisted in one column.
pub trait ColumnValue: Sized {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! column_value {
    ($ty:ty, $variant:ident) => {
        impl ColumnValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(ValueError {
                        expected: Self::KIND,
                        found: other.kind(),
                    }),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

column_value!(String, String);
column_value!(i32, Integer);
column_value!(i64, Long);
column_value!(f64, Double);
column_value!(bool, Boolean);
column_value!(NaiveDate, Date);

impl<V: ColumnValue> ColumnValue for Option<V> {
    const KIND: ValueKind = V::KIND;

    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => V::from_value(other).map(Some),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
