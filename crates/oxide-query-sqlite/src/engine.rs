//! SQLite engine backed by `rusqlite`.

use std::path::PathBuf;
use std::time::Duration;

use oxide_query_core::dialect::Dialect;
use oxide_query_core::exec::{Engine, Execution, Prepared, Row};
use oxide_query_core::value::{SqlValue, ValueRef};
use oxide_query_core::{EngineError, Result};
use rusqlite::{CachedStatement, Connection};
use tracing::{debug, info};

use crate::dialect::SqliteDialect;

/// Connection settings.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file; `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// How long to wait on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            foreign_keys: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl SqliteConfig {
    /// Settings for an in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Settings for a database file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

/// Converts a `rusqlite` error, keeping SQLite's extended result code.
pub(crate) fn engine_error(error: rusqlite::Error) -> EngineError {
    let code = match &error {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
        _ => None,
    };
    let converted = EngineError::from_source(error);
    match code {
        Some(code) => converted.with_code(code),
        None => converted,
    }
}

/// A SQLite connection usable as an [`Engine`].
///
/// Prepared statements are kept in the connection's statement cache, so
/// compiling the same seed twice reuses the compiled program.
#[derive(Debug)]
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    /// Opens a connection with the given settings.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error when the database cannot be opened or
    /// configured.
    pub fn open(config: &SqliteConfig) -> Result<Self, EngineError> {
        let conn = match &config.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(engine_error)?;
        conn.busy_timeout(config.busy_timeout).map_err(engine_error)?;
        let pragma = if config.foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        conn.execute_batch(pragma).map_err(engine_error)?;
        info!(
            path = ?config.path,
            foreign_keys = config.foreign_keys,
            "opened sqlite database"
        );
        Ok(Self { conn })
    }

    /// Opens a private in-memory database with default settings.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error when the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::open(&SqliteConfig::in_memory())
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Engine for SqliteEngine {
    type Prepared<'e> = SqliteStatement<'e>;

    fn prepare(&self, sql: &str) -> Result<SqliteStatement<'_>, EngineError> {
        debug!(sql, "preparing statement");
        let stmt = self.conn.prepare_cached(sql).map_err(engine_error)?;
        Ok(SqliteStatement {
            conn: &self.conn,
            stmt,
        })
    }

    fn execute_batch(&self, sql: &str) -> Result<(), EngineError> {
        self.conn.execute_batch(sql).map_err(engine_error)
    }

    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }
}

/// A compiled SQLite statement.
pub struct SqliteStatement<'c> {
    conn: &'c Connection,
    stmt: CachedStatement<'c>,
}

impl Prepared for SqliteStatement<'_> {
    fn bind(&mut self, index: usize, value: &SqlValue) -> Result<(), EngineError> {
        let position = index + 1;
        match value {
            SqlValue::Null => self
                .stmt
                .raw_bind_parameter(position, rusqlite::types::Null),
            SqlValue::Integer(n) => self.stmt.raw_bind_parameter(position, n),
            SqlValue::Real(f) => self.stmt.raw_bind_parameter(position, f),
            SqlValue::Text(s) => self.stmt.raw_bind_parameter(position, s.as_str()),
            SqlValue::Blob(b) => self.stmt.raw_bind_parameter(position, b.as_slice()),
        }
        .map_err(engine_error)
    }

    fn execute(&mut self) -> Result<Execution, EngineError> {
        let changed = self.stmt.raw_execute().map_err(engine_error)?;
        let rowid = self.conn.last_insert_rowid();
        Ok(Execution {
            rows_affected: u64::try_from(changed).unwrap_or(u64::MAX),
            last_insert_id: (rowid != 0).then_some(rowid),
        })
    }

    fn query(&mut self, visit: &mut dyn FnMut(&dyn Row) -> Result<bool>) -> Result<()> {
        let mut rows = self.stmt.raw_query();
        while let Some(row) = rows.next().map_err(engine_error)? {
            if !visit(&SqliteRow { row })? {
                break;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("sql", &self.stmt.expanded_sql())
            .finish_non_exhaustive()
    }
}

struct SqliteRow<'r, 's> {
    row: &'r rusqlite::Row<'s>,
}

impl Row for SqliteRow<'_, '_> {
    fn column_count(&self) -> usize {
        self.row.as_ref().column_count()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.row.as_ref().column_name(index).ok()
    }

    fn value(&self, index: usize) -> Result<ValueRef<'_>, EngineError> {
        use rusqlite::types::ValueRef as Raw;

        Ok(match self.row.get_ref(index).map_err(engine_error)? {
            Raw::Null => ValueRef::Null,
            Raw::Integer(n) => ValueRef::Integer(n),
            Raw::Real(f) => ValueRef::Real(f),
            Raw::Text(bytes) => {
                ValueRef::Text(std::str::from_utf8(bytes).map_err(EngineError::from_source)?)
            }
            Raw::Blob(bytes) => ValueRef::Blob(bytes),
        })
    }
}
