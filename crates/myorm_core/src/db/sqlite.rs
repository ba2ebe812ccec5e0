//! SQLite executor built on `rusqlite`.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections and apply `DbConfig`.
//! - Implement the executor contracts over a single serialized connection.
//!
//! # Invariants
//! - The connection lock is held only for the duration of one prepare or
//!   one execution call.
//! - Result sets are fully materialized before the lock is released.
//! - Dates are stored as ISO `YYYY-MM-DD` text.

use super::executor::{Executor, GeneratedKeys, PreparedStatement, RowSet};
use super::{DbError, DbResult};
use crate::config::DbConfig;
use crate::model::value::ValueKind;
use chrono::NaiveDate;
use log::{debug, error, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Statement};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Column name of the single-row set returned by `generated_keys`.
pub const GENERATED_KEY_COLUMN: &str = "generated_key";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Executor over one SQLite connection.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Opens a SQLite database file.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>, config: &DbConfig) -> DbResult<Self> {
        open_logged("file", config, || Connection::open(path))
    }

    /// Opens a private in-memory SQLite database.
    pub fn open_in_memory(config: &DbConfig) -> DbResult<Self> {
        open_logged("memory", config, Connection::open_in_memory)
    }

    /// Wraps an already opened connection, applying `config`.
    pub fn from_connection(conn: Connection, config: &DbConfig) -> DbResult<Self> {
        bootstrap_connection(&conn, config)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs a batch of statements without parameters. Intended for schema
    /// and fixture setup, not for entity traffic.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::ConnectionPoisoned)
    }
}

fn open_logged(
    mode: &str,
    config: &DbConfig,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<SqliteExecutor> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match SqliteExecutor::from_connection(conn, config) {
        Ok(executor) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(executor)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, config: &DbConfig) -> DbResult<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(())
}

impl Executor for SqliteExecutor {
    fn prepare<'a>(
        &'a self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> DbResult<Box<dyn PreparedStatement + 'a>> {
        // Prepare once up front so syntax errors surface before binding.
        let parameter_count = {
            let conn = self.lock()?;
            let stmt = conn.prepare(sql)?;
            stmt.parameter_count()
        };
        debug!("event=statement_prepare module=db status=ok parameter_count={parameter_count}");

        Ok(Box::new(SqliteStatement {
            executor: self,
            sql: sql.to_string(),
            keys,
            params: vec![SqlValue::Null; parameter_count],
            generated_key: None,
        }))
    }
}

struct SqliteStatement<'a> {
    executor: &'a SqliteExecutor,
    sql: String,
    keys: GeneratedKeys,
    params: Vec<SqlValue>,
    generated_key: Option<i64>,
}

impl SqliteStatement<'_> {
    fn set(&mut self, position: usize, value: SqlValue) -> DbResult<()> {
        let parameter_count = self.params.len();
        match position.checked_sub(1).and_then(|index| self.params.get_mut(index)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(DbError::ParameterOutOfRange {
                position,
                parameter_count,
            }),
        }
    }

    fn bind(&self, stmt: &mut Statement<'_>) -> DbResult<()> {
        for (index, value) in self.params.iter().enumerate() {
            stmt.raw_bind_parameter(index + 1, value)?;
        }
        Ok(())
    }

    fn record_generated_key(&mut self, conn: &Connection, changed: usize) {
        if self.keys == GeneratedKeys::Return && changed > 0 {
            self.generated_key = Some(conn.last_insert_rowid());
        }
    }
}

impl PreparedStatement for SqliteStatement<'_> {
    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn set_null(&mut self, position: usize) -> DbResult<()> {
        self.set(position, SqlValue::Null)
    }

    fn set_string(&mut self, position: usize, value: &str) -> DbResult<()> {
        self.set(position, SqlValue::Text(value.to_string()))
    }

    fn set_int(&mut self, position: usize, value: i32) -> DbResult<()> {
        self.set(position, SqlValue::Integer(i64::from(value)))
    }

    fn set_long(&mut self, position: usize, value: i64) -> DbResult<()> {
        self.set(position, SqlValue::Integer(value))
    }

    fn set_double(&mut self, position: usize, value: f64) -> DbResult<()> {
        self.set(position, SqlValue::Real(value))
    }

    fn set_bool(&mut self, position: usize, value: bool) -> DbResult<()> {
        self.set(position, SqlValue::Integer(i64::from(value)))
    }

    fn set_date(&mut self, position: usize, value: NaiveDate) -> DbResult<()> {
        self.set(position, SqlValue::Text(value.format(DATE_FORMAT).to_string()))
    }

    fn execute(&mut self) -> DbResult<bool> {
        let executor = self.executor;
        let conn = executor.lock()?;
        let mut stmt = conn.prepare(&self.sql)?;
        self.bind(&mut stmt)?;

        if stmt.column_count() > 0 {
            let mut rows = stmt.raw_query();
            while rows.next()?.is_some() {}
            return Ok(true);
        }

        let changed = stmt.raw_execute()?;
        self.record_generated_key(&conn, changed);
        Ok(false)
    }

    fn execute_query(&mut self) -> DbResult<Box<dyn RowSet>> {
        let conn = self.executor.lock()?;
        let mut stmt = conn.prepare(&self.sql)?;
        self.bind(&mut stmt)?;

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut materialized = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                cells.push(row.get::<_, SqlValue>(index)?);
            }
            materialized.push(cells);
        }

        Ok(Box::new(SqliteRows::new(columns, materialized)))
    }

    fn execute_update(&mut self) -> DbResult<usize> {
        let executor = self.executor;
        let conn = executor.lock()?;
        let mut stmt = conn.prepare(&self.sql)?;
        self.bind(&mut stmt)?;

        let changed = stmt.raw_execute()?;
        self.record_generated_key(&conn, changed);
        Ok(changed)
    }

    fn generated_keys(&mut self) -> DbResult<Box<dyn RowSet>> {
        if self.keys != GeneratedKeys::Return {
            return Err(DbError::GeneratedKeysNotRequested);
        }

        let rows = self
            .generated_key
            .map(|key| vec![SqlValue::Integer(key)])
            .into_iter()
            .collect();
        Ok(Box::new(SqliteRows::new(
            vec![GENERATED_KEY_COLUMN.to_string()],
            rows,
        )))
    }
}

/// Owned, forward-only result rows.
struct SqliteRows {
    columns: Vec<String>,
    pending: std::vec::IntoIter<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
}

impl SqliteRows {
    fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            pending: rows.into_iter(),
            current: None,
        }
    }

    fn cell(&self, column: &str) -> DbResult<&SqlValue> {
        let row = self.current.as_ref().ok_or(DbError::NoCurrentRow)?;
        let index = self
            .columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .ok_or_else(|| DbError::UnknownColumn(column.to_string()))?;
        row.get(index)
            .ok_or_else(|| DbError::UnknownColumn(column.to_string()))
    }
}

fn mismatch(column: &str, expected: ValueKind, found: &SqlValue) -> DbError {
    DbError::TypeMismatch {
        column: column.to_string(),
        expected,
        found: storage_class(found),
    }
}

fn storage_class(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "null",
        SqlValue::Integer(_) => "integer",
        SqlValue::Real(_) => "real",
        SqlValue::Text(_) => "text",
        SqlValue::Blob(_) => "blob",
    }
}

impl RowSet for SqliteRows {
    fn advance(&mut self) -> DbResult<bool> {
        self.current = self.pending.next();
        Ok(self.current.is_some())
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn get_string(&self, column: &str) -> DbResult<Option<String>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(value) => Ok(Some(value.clone())),
            other => Err(mismatch(column, ValueKind::String, other)),
        }
    }

    fn get_int(&self, column: &str) -> DbResult<Option<i32>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => i32::try_from(*value)
                .map(Some)
                .map_err(|_| DbError::TypeMismatch {
                    column: column.to_string(),
                    expected: ValueKind::Integer,
                    found: "out-of-range integer",
                }),
            other => Err(mismatch(column, ValueKind::Integer, other)),
        }
    }

    fn get_long(&self, column: &str) -> DbResult<Option<i64>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => Ok(Some(*value)),
            other => Err(mismatch(column, ValueKind::Long, other)),
        }
    }

    fn get_double(&self, column: &str) -> DbResult<Option<f64>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Real(value) => Ok(Some(*value)),
            SqlValue::Integer(value) => Ok(Some(*value as f64)),
            other => Err(mismatch(column, ValueKind::Double, other)),
        }
    }

    fn get_bool(&self, column: &str) -> DbResult<Option<bool>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => Ok(Some(*value != 0)),
            other => Err(mismatch(column, ValueKind::Boolean, other)),
        }
    }

    fn get_date(&self, column: &str) -> DbResult<Option<NaiveDate>> {
        match self.cell(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map(Some)
                .map_err(|_| DbError::InvalidDate {
                    column: column.to_string(),
                    value: value.clone(),
                }),
            other => Err(mismatch(column, ValueKind::Date, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SqliteExecutor, GENERATED_KEY_COLUMN};
    use crate::config::DbConfig;
    use crate::db::{DbError, Executor, GeneratedKeys};

    fn executor() -> SqliteExecutor {
        let executor = SqliteExecutor::open_in_memory(&DbConfig::default()).unwrap();
        executor
            .execute_batch(
                "CREATE TABLE item (id INTEGER PRIMARY KEY, name TEXT, payload BLOB);
                 INSERT INTO item (id, name, payload) VALUES (1, 'one', x'00');",
            )
            .unwrap();
        executor
    }

    #[test]
    fn prepare_rejects_invalid_sql() {
        let executor = executor();
        let result = executor.prepare("SELEC * FROM item", GeneratedKeys::None);
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }

    #[test]
    fn setters_reject_positions_outside_statement() {
        let executor = executor();
        let mut stmt = executor
            .prepare("SELECT * FROM item WHERE id = ?", GeneratedKeys::None)
            .unwrap();

        assert_eq!(stmt.parameter_count(), 1);
        assert!(matches!(
            stmt.set_long(0, 1),
            Err(DbError::ParameterOutOfRange { position: 0, .. })
        ));
        assert!(matches!(
            stmt.set_long(2, 1),
            Err(DbError::ParameterOutOfRange {
                position: 2,
                parameter_count: 1
            })
        ));
    }

    #[test]
    fn readers_are_case_insensitive_and_reject_blobs() {
        let executor = executor();
        let mut stmt = executor
            .prepare("SELECT * FROM item", GeneratedKeys::None)
            .unwrap();
        let mut rows = stmt.execute_query().unwrap();

        assert!(matches!(rows.get_long("id"), Err(DbError::NoCurrentRow)));
        assert!(rows.advance().unwrap());
        assert_eq!(rows.get_string("NAME").unwrap().as_deref(), Some("one"));
        assert!(matches!(
            rows.get_string("payload"),
            Err(DbError::TypeMismatch { found: "blob", .. })
        ));
        assert!(matches!(
            rows.get_long("missing"),
            Err(DbError::UnknownColumn(_))
        ));
        assert!(!rows.advance().unwrap());
    }

    #[test]
    fn generated_keys_require_request_and_report_rowid() {
        let executor = executor();

        let mut plain = executor
            .prepare("INSERT INTO item (name) VALUES (?)", GeneratedKeys::None)
            .unwrap();
        plain.set_string(1, "two").unwrap();
        assert_eq!(plain.execute_update().unwrap(), 1);
        assert!(matches!(
            plain.generated_keys(),
            Err(DbError::GeneratedKeysNotRequested)
        ));

        let mut keyed = executor
            .prepare("INSERT INTO item (name) VALUES (?)", GeneratedKeys::Return)
            .unwrap();
        keyed.set_string(1, "three").unwrap();
        assert!(!keyed.execute().unwrap());
        let mut keys = keyed.generated_keys().unwrap();
        assert!(keys.advance().unwrap());
        assert_eq!(keys.get_long(GENERATED_KEY_COLUMN).unwrap(), Some(3));
    }
}
