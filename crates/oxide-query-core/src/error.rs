//! Error types for query construction, binding and execution.

use std::sync::Arc;

use thiserror::Error;

use crate::value::SqlValue;

/// Configuration errors detected while tables, column sets and queries are
/// being defined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The identifier cannot be used as a table, column or alias name.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Two columns of the same set share a name.
    #[error("duplicate column '{column}' in '{set}'")]
    DuplicateColumn {
        /// The table, alias or view being defined.
        set: String,
        /// The repeated column name.
        column: String,
    },

    /// Two tables of the same table set share a name.
    #[error("duplicate table '{0}'")]
    DuplicateTable(String),

    /// A table was built without any column.
    #[error("table '{0}' has no columns")]
    EmptyTable(String),

    /// Foreign keys form a cycle among the listed tables.
    #[error("foreign key cycle between tables: {}", .tables.join(", "))]
    ForeignKeyCycle {
        /// Tables that could not be ordered.
        tables: Vec<String>,
    },

    /// A column was used with a set it does not belong to.
    #[error("column '{column}' does not belong to '{set}'")]
    ColumnNotInSet {
        /// Qualified name of the offending column.
        column: String,
        /// Name of the set it was looked up in.
        set: String,
    },

    /// The source cannot be wrapped in an alias.
    #[error("cannot alias {0}")]
    InvalidAlias(String),

    /// A foreign key must target a table column.
    #[error("column '{0}' cannot be referenced by a foreign key")]
    InvalidReference(String),

    /// A column default cannot be stored by the column's descriptor.
    #[error("invalid default for column '{column}': {reason}")]
    InvalidDefault {
        /// Column name.
        column: String,
        /// The conversion failure.
        reason: String,
    },

    /// A query has no result columns and no source to take them from.
    #[error("query selects no columns")]
    NoResultColumns,

    /// A view definition is not usable.
    #[error("invalid view '{view}': {reason}")]
    InvalidView {
        /// View name.
        view: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Conversion failures between semantic values and storage values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// No coercion exists from the source storage class.
    #[error("cannot convert {from} to {target}")]
    Incompatible {
        /// Descriptor name.
        target: &'static str,
        /// Storage class of the rejected value.
        from: &'static str,
    },

    /// The value does not fit the target kind.
    #[error("value {value} is out of range for {target}")]
    OutOfRange {
        /// Descriptor name.
        target: &'static str,
        /// Rendered source value.
        value: String,
    },

    /// Text could not be parsed into the target kind.
    #[error("cannot parse {input:?} as {target}")]
    Parse {
        /// Descriptor name.
        target: &'static str,
        /// The rejected input.
        input: String,
    },

    /// NULL was bound to a non-nullable descriptor.
    #[error("NULL is not allowed for non-nullable {target}")]
    NullNotAllowed {
        /// Descriptor name.
        target: &'static str,
    },

    /// NULL was read through a non-nullable descriptor.
    #[error("unexpected NULL for non-nullable {target}")]
    UnexpectedNull {
        /// Descriptor name.
        target: &'static str,
    },
}

/// An error reported by the underlying SQL engine.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    code: Option<i32>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl EngineError {
    /// Creates an engine error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Wraps an engine-specific error, keeping it as the source.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attaches the engine's numeric error code.
    #[must_use]
    pub const fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the engine's numeric error code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }
}

/// Errors raised while rendering, binding, executing or decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Standalone conversion error (descriptor used outside a statement).
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A value could not be bound to a parameter slot.
    #[error("cannot bind parameter {index} ({ty}) of `{sql}`: {source}")]
    Bind {
        /// Zero-based parameter position.
        index: usize,
        /// Descriptor name of the slot.
        ty: &'static str,
        /// Generated SQL.
        sql: Arc<str>,
        /// The conversion failure.
        #[source]
        source: ConversionError,
    },

    /// A positional bind used an index outside the parameter list.
    #[error("parameter index {index} is out of range ({count} parameters) for `{sql}`")]
    ParameterIndex {
        /// Requested position.
        index: usize,
        /// Number of parameters in the seed.
        count: usize,
        /// Generated SQL.
        sql: Arc<str>,
    },

    /// A placeholder was bound that the seed never registered.
    #[error("placeholder is not part of `{sql}`")]
    UnknownParameter {
        /// Generated SQL.
        sql: Arc<str>,
    },

    /// Arguments built for one seed were used with another.
    #[error("arguments were built for `{found}`, not `{sql}`")]
    SeedMismatch {
        /// SQL of the statement being executed.
        sql: Arc<str>,
        /// SQL the arguments belong to.
        found: Arc<str>,
    },

    /// A parameter slot was never bound.
    #[error("parameter {index} is unbound in `{sql}`")]
    Unbound {
        /// Zero-based parameter position.
        index: usize,
        /// Generated SQL.
        sql: Arc<str>,
    },

    /// A result column could not be decoded.
    #[error("cannot decode column '{column}' of `{sql}`: {source}")]
    Decode {
        /// Result column name.
        column: String,
        /// Generated SQL.
        sql: Arc<str>,
        /// The conversion failure.
        #[source]
        source: ConversionError,
    },

    /// The requested expression is not part of the result.
    #[error("'{column}' is not a result column of `{sql}`")]
    NotInResult {
        /// Requested column.
        column: String,
        /// Generated SQL.
        sql: Arc<str>,
    },

    /// Raw engine error without statement context.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The engine rejected a generated statement.
    #[error("failed to execute `{sql}` with arguments {args:?}: {source}")]
    Execution {
        /// Generated SQL.
        sql: Arc<str>,
        /// Snapshot of the bound arguments.
        args: Vec<SqlValue>,
        /// The engine error.
        #[source]
        source: EngineError,
    },
}

/// Result type alias for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
