//! Runtime configuration for the executor and logging bootstrap.
//!
//! # Invariants
//! - `Default` values are safe for tests and local tools.
//! - Configuration is read once at construction; nothing re-reads it later.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOG_BASENAME: &str = "myorm";
const DEFAULT_MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;

/// SQLite connection settings applied by `SqliteExecutor` bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Enables `PRAGMA foreign_keys`.
    pub foreign_keys: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
        }
    }
}

impl DbConfig {
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_foreign_keys(mut self, foreign_keys: bool) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }
}

/// Rolling file logger settings consumed by `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// One of trace|debug|info|warn|error (case-insensitive, `warning` accepted).
    pub level: String,
    /// Absolute directory receiving log files.
    pub log_dir: PathBuf,
    pub basename: String,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl LogConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            basename: DEFAULT_LOG_BASENAME.to_string(),
            max_file_size_bytes: DEFAULT_MAX_LOG_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }

    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = basename.into();
        self
    }

    pub fn with_rotation(mut self, max_file_size_bytes: u64, max_files: usize) -> Self {
        self.max_file_size_bytes = max_file_size_bytes;
        self.max_files = max_files;
        self
    }
}
