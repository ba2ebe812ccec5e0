//! Core mapping engine for myorm.
//!
//! Entity types are described once through `TypeDescriptor`, validated by
//! `EntityManager::new`, and persisted through an injected `Executor`.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod manager;
pub mod mapper;
pub mod meta;
pub mod model;
pub mod sql;
pub mod statement;

pub use config::{DbConfig, LogConfig};
pub use db::{
    DbError, DbResult, Executor, GeneratedKeys, PreparedStatement, RowSet, SqliteExecutor,
};
pub use error::{OrmError, OrmResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use manager::{EntityManager, EntitySet};
pub use mapper::EntityMapping;
pub use meta::{ColumnDescriptor, EntityDescriptor, ValidationError};
pub use model::schema::{Entity, FieldDescriptor, GenerationType, TypeDescriptor};
pub use model::value::{ColumnValue, Value, ValueError, ValueKind};
pub use statement::{parse_template, BindingError, BoundStatement, NamedParameter};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
