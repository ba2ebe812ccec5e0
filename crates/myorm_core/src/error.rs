//! Crate-level error taxonomy for mapping and manager operations.

use crate::db::DbError;
use crate::meta::ValidationError;
use crate::model::value::ValueError;
use crate::statement::BindingError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OrmResult<T> = Result<T, OrmError>;

#[derive(Debug)]
pub enum OrmError {
    /// Invalid registration; fatal at manager construction.
    Validation(ValidationError),
    /// Operation invoked for a type outside the registered set.
    UnmanagedType(&'static str),
    Binding(BindingError),
    /// The entity was registered without a constructor.
    Instantiation(&'static str),
    Mapping {
        entity: &'static str,
        field: &'static str,
        source: ValueError,
    },
    /// Executor failure; surfaced unchanged, never retried.
    Persistence(DbError),
    /// An identity-generated insert succeeded without reporting a key.
    MissingGeneratedKey(&'static str),
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid entity registration: {err}"),
            Self::UnmanagedType(entity) => {
                write!(f, "type `{entity}` is not managed by this entity manager")
            }
            Self::Binding(err) => write!(f, "{err}"),
            Self::Instantiation(entity) => {
                write!(f, "entity `{entity}` has no registered constructor")
            }
            Self::Mapping {
                entity,
                field,
                source,
            } => write!(f, "cannot map field `{entity}.{field}`: {source}"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::MissingGeneratedKey(entity) => {
                write!(f, "insert into `{entity}` returned no generated key")
            }
        }
    }
}

impl Error for OrmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Binding(err) => Some(err),
            Self::Mapping { source, .. } => Some(source),
            Self::Persistence(err) => Some(err),
            Self::UnmanagedType(_) | Self::Instantiation(_) | Self::MissingGeneratedKey(_) => None,
        }
    }
}

impl From<ValidationError> for OrmError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BindingError> for OrmError {
    fn from(value: BindingError) -> Self {
        Self::Binding(value)
    }
}

impl From<DbError> for OrmError {
    fn from(value: DbError) -> Self {
        Self::Persistence(value)
    }
}
