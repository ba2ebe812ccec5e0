//! Executor boundary and the bundled SQLite executor.
//!
//! # Responsibility
//! - Define the capability the mapping engine needs from a database:
//!   prepare, typed parameter setters, execution and row reading.
//! - Provide a SQLite implementation of that capability.
//!
//! # Invariants
//! - Mapping code never touches `rusqlite` directly; it only sees the traits
//!   re-exported here.
//! - Parameter positions are 1-based.

use crate::model::value::ValueKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod executor;
mod sqlite;

pub use executor::{Executor, GeneratedKeys, PreparedStatement, RowSet};
pub use sqlite::{SqliteExecutor, GENERATED_KEY_COLUMN};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Another thread panicked while holding the connection.
    ConnectionPoisoned,
    ParameterOutOfRange {
        position: usize,
        parameter_count: usize,
    },
    UnknownColumn(String),
    NoCurrentRow,
    TypeMismatch {
        column: String,
        expected: ValueKind,
        found: &'static str,
    },
    InvalidDate {
        column: String,
        value: String,
    },
    GeneratedKeysNotRequested,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::ConnectionPoisoned => write!(f, "database connection lock is poisoned"),
            Self::ParameterOutOfRange {
                position,
                parameter_count,
            } => write!(
                f,
                "parameter position {position} is out of range (statement has {parameter_count})"
            ),
            Self::UnknownColumn(column) => write!(f, "column not found in result: {column}"),
            Self::NoCurrentRow => write!(f, "row set is not positioned on a row"),
            Self::TypeMismatch {
                column,
                expected,
                found,
            } => write!(f, "column `{column}` holds {found}, expected {expected}"),
            Self::InvalidDate { column, value } => {
                write!(f, "column `{column}` holds invalid date `{value}`")
            }
            Self::GeneratedKeysNotRequested => {
                write!(f, "statement was not prepared to return generated keys")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
