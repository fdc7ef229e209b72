//! Execution against an SQL engine.
//!
//! The engine itself lives outside this crate. It is reached through three
//! small traits: an [`Engine`] prepares SQL text, a [`Prepared`] handle binds
//! storage values by position and runs, and a [`Row`] exposes the raw values
//! of one result row. Everything typed (argument coercion, result decoding,
//! error context) is layered on top by [`Arguments`], [`Statement`] and
//! [`ResultRow`].

mod args;
mod statement;

use std::sync::Arc;

use tracing::info;

use crate::dialect::{Dialect, GenericDialect};
use crate::error::{EngineError, Error, Result};
use crate::query::Seed;
use crate::schema::{creation_order, Table};
use crate::value::ValueRef;

pub use args::Arguments;
pub use statement::{ResultRow, Statement};

/// Outcome of an INSERT, UPDATE or DELETE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Execution {
    /// Number of rows changed.
    pub rows_affected: u64,
    /// Row id generated by the last INSERT, if the engine reports one.
    pub last_insert_id: Option<i64>,
}

/// One row of a result set, as stored by the engine.
pub trait Row {
    /// Returns the number of columns.
    fn column_count(&self) -> usize;

    /// Returns the name of a column.
    fn column_name(&self, index: usize) -> Option<&str>;

    /// Returns the value of a column.
    fn value(&self, index: usize) -> Result<ValueRef<'_>, EngineError>;

    /// Returns whether a column is NULL.
    fn is_null(&self, index: usize) -> Result<bool, EngineError> {
        Ok(self.value(index)?.is_null())
    }

    /// Returns an integer column.
    fn get_i64(&self, index: usize) -> Result<Option<i64>, EngineError> {
        match self.value(index)? {
            ValueRef::Null => Ok(None),
            ValueRef::Integer(i) => Ok(Some(i)),
            other => Err(storage_mismatch(index, "integer", other)),
        }
    }

    /// Returns a real column; integers are widened.
    #[allow(clippy::cast_precision_loss)]
    fn get_f64(&self, index: usize) -> Result<Option<f64>, EngineError> {
        match self.value(index)? {
            ValueRef::Null => Ok(None),
            ValueRef::Real(f) => Ok(Some(f)),
            ValueRef::Integer(i) => Ok(Some(i as f64)),
            other => Err(storage_mismatch(index, "real", other)),
        }
    }

    /// Returns a text column.
    fn get_text(&self, index: usize) -> Result<Option<&str>, EngineError> {
        match self.value(index)? {
            ValueRef::Null => Ok(None),
            ValueRef::Text(s) => Ok(Some(s)),
            other => Err(storage_mismatch(index, "text", other)),
        }
    }

    /// Returns a blob column.
    fn get_blob(&self, index: usize) -> Result<Option<&[u8]>, EngineError> {
        match self.value(index)? {
            ValueRef::Null => Ok(None),
            ValueRef::Blob(b) => Ok(Some(b)),
            other => Err(storage_mismatch(index, "blob", other)),
        }
    }
}

fn storage_mismatch(index: usize, expected: &str, found: ValueRef<'_>) -> EngineError {
    EngineError::new(format!(
        "column {index} holds {}, not {expected}",
        found.kind_name()
    ))
}

/// A compiled statement handle of the engine.
pub trait Prepared {
    /// Binds a storage value at a 0-based parameter position.
    fn bind(&mut self, index: usize, value: &crate::value::SqlValue) -> Result<(), EngineError>;

    /// Runs a statement that returns no rows.
    fn execute(&mut self) -> Result<Execution, EngineError>;

    /// Runs a query, calling `visit` for each row until it returns `false`.
    ///
    /// # Errors
    ///
    /// Engine failures as [`Error::Engine`], or whatever `visit` returns.
    fn query(&mut self, visit: &mut dyn FnMut(&dyn Row) -> Result<bool>) -> Result<()>;
}

/// An SQL engine.
pub trait Engine {
    /// Compiled statement handle, borrowing the engine.
    type Prepared<'e>: Prepared
    where
        Self: 'e;

    /// Compiles SQL text.
    fn prepare(&self, sql: &str) -> Result<Self::Prepared<'_>, EngineError>;

    /// Runs one or more statements without parameters.
    fn execute_batch(&self, sql: &str) -> Result<(), EngineError>;

    /// Returns the dialect to render statements and DDL with.
    fn dialect(&self) -> &dyn Dialect {
        &GenericDialect
    }

    /// Compiles a seed into a reusable statement.
    ///
    /// # Errors
    ///
    /// [`Error::Execution`] when the engine rejects the SQL.
    fn compile(&self, seed: &Seed) -> Result<Statement<Self::Prepared<'_>>> {
        let prepared = self.prepare(seed.sql()).map_err(|source| Error::Execution {
            sql: Arc::clone(seed.sql_arc()),
            args: Vec::new(),
            source,
        })?;
        Ok(Statement::new(seed.clone(), prepared))
    }

    /// Creates `tables`, referenced tables first. Returns the order used.
    ///
    /// # Errors
    ///
    /// Configuration errors of the table set, or [`Error::Execution`] for
    /// the first `CREATE TABLE` the engine rejects.
    fn create_tables(&self, tables: &[Table]) -> Result<Vec<Table>> {
        let ordered = creation_order(tables)?;
        for table in &ordered {
            let sql = table.create_sql(self.dialect());
            info!(table = table.name(), "creating table");
            self.execute_batch(&sql).map_err(|source| Error::Execution {
                sql: Arc::from(sql),
                args: Vec::new(),
                source,
            })?;
        }
        Ok(ordered)
    }
}
