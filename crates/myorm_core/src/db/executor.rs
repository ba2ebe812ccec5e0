//! Executor capability contracts.

use super::DbResult;
use chrono::NaiveDate;
use std::sync::Arc;

/// Whether a statement should expose keys generated by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratedKeys {
    #[default]
    None,
    Return,
}

/// Forward-only cursor over a query result.
///
/// Typed readers address the current row by column name and return `None`
/// for SQL NULL.
pub trait RowSet {
    /// Moves to the next row. Returns `false` once exhausted.
    fn advance(&mut self) -> DbResult<bool>;
    fn column_names(&self) -> &[String];
    fn get_string(&self, column: &str) -> DbResult<Option<String>>;
    fn get_int(&self, column: &str) -> DbResult<Option<i32>>;
    fn get_long(&self, column: &str) -> DbResult<Option<i64>>;
    fn get_double(&self, column: &str) -> DbResult<Option<f64>>;
    fn get_bool(&self, column: &str) -> DbResult<Option<bool>>;
    fn get_date(&self, column: &str) -> DbResult<Option<NaiveDate>>;
}

/// One prepared statement with positional (1-based) parameters.
pub trait PreparedStatement {
    fn parameter_count(&self) -> usize;
    fn set_null(&mut self, position: usize) -> DbResult<()>;
    fn set_string(&mut self, position: usize, value: &str) -> DbResult<()>;
    fn set_int(&mut self, position: usize, value: i32) -> DbResult<()>;
    fn set_long(&mut self, position: usize, value: i64) -> DbResult<()>;
    fn set_double(&mut self, position: usize, value: f64) -> DbResult<()>;
    fn set_bool(&mut self, position: usize, value: bool) -> DbResult<()>;
    fn set_date(&mut self, position: usize, value: NaiveDate) -> DbResult<()>;

    /// Returns `true` when the statement produced a result set.
    fn execute(&mut self) -> DbResult<bool>;
    fn execute_query(&mut self) -> DbResult<Box<dyn RowSet>>;
    /// Returns the number of affected rows.
    fn execute_update(&mut self) -> DbResult<usize>;
    fn generated_keys(&mut self) -> DbResult<Box<dyn RowSet>>;
}

/// Database capability injected into the entity manager.
pub trait Executor: Send + Sync {
    fn prepare<'a>(
        &'a self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> DbResult<Box<dyn PreparedStatement + 'a>>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn prepare<'a>(
        &'a self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> DbResult<Box<dyn PreparedStatement + 'a>> {
        (**self).prepare(sql, keys)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn prepare<'a>(
        &'a self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> DbResult<Box<dyn PreparedStatement + 'a>> {
        (**self).prepare(sql, keys)
    }
}
