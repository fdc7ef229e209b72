//! SQL text rendering.
//!
//! Rendering walks a statement once, appending text to a pooled builder and
//! registering every bind placeholder in render order. The result is a
//! [`Seed`](crate::query::Seed).

mod pool;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dialect::{Dialect, GenericDialect};
use crate::error::{ConversionError, Error, Result, SchemaError};
use crate::expr::ParamId;
use crate::query::{OutputColumn, Seed};
use crate::schema::ColumnRef;
use crate::source::{ColumnSet, Source};
use crate::types::TypeRef;
use crate::value::SqlValue;

pub use pool::{BuilderPool, PoolConfig, PoolStats, PooledBuilder};

/// Pool and dialect used to render a statement.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'o> {
    /// Pool that provides text builders.
    pub pool: &'o BuilderPool,
    /// Dialect used for identifier quoting and placeholders.
    pub dialect: &'o dyn Dialect,
}

impl<'o> RenderOptions<'o> {
    /// Creates render options from an explicit pool and dialect.
    #[must_use]
    pub const fn new(pool: &'o BuilderPool, dialect: &'o dyn Dialect) -> Self {
        Self { pool, dialect }
    }

    /// Renders with the global pool and the given dialect.
    #[must_use]
    pub fn with_dialect(dialect: &'o dyn Dialect) -> Self {
        Self {
            pool: BuilderPool::global(),
            dialect,
        }
    }
}

impl Default for RenderOptions<'static> {
    fn default() -> Self {
        Self {
            pool: BuilderPool::global(),
            dialect: &GenericDialect,
        }
    }
}

/// One registered bind placeholder.
#[derive(Clone)]
pub struct ParamSpec {
    ty: TypeRef,
    preset: Option<SqlValue>,
    id: Option<ParamId>,
}

impl ParamSpec {
    /// Descriptor values bound to this slot are coerced through.
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Value rendered into the statement by the query itself, if any.
    #[must_use]
    pub const fn preset(&self) -> Option<&SqlValue> {
        self.preset.as_ref()
    }

    /// Placeholder token this slot was rendered from, if any.
    #[must_use]
    pub const fn id(&self) -> Option<ParamId> {
        self.id
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("ty", &self.ty.type_name())
            .field("nullable", &self.ty.is_nullable())
            .field("preset", &self.preset)
            .field("id", &self.id)
            .finish()
    }
}

enum Deferred {
    Schema(SchemaError),
    Preset {
        index: usize,
        ty: &'static str,
        source: ConversionError,
    },
}

/// State shared by every node while one statement is rendered.
pub(crate) struct RenderCtx<'o> {
    pub(crate) dialect: &'o dyn Dialect,
    pub(crate) pool: &'o BuilderPool,
    params: Vec<ParamSpec>,
    positions: HashMap<ParamId, Vec<usize>>,
    deferred: Vec<Deferred>,
    scopes: Vec<Option<Source>>,
}

impl<'o> RenderCtx<'o> {
    pub(crate) fn new(options: &RenderOptions<'o>) -> Self {
        Self {
            dialect: options.dialect,
            pool: options.pool,
            params: Vec::new(),
            positions: HashMap::new(),
            deferred: Vec::new(),
            scopes: Vec::new(),
        }
    }

    pub(crate) fn identifier(&self, out: &mut String, name: &str) {
        self.dialect.write_identifier(out, name);
    }

    /// Writes `qualifier.name`, or just `name` for an empty qualifier.
    pub(crate) fn qualified(&self, out: &mut String, qualifier: &str, name: &str) {
        if !qualifier.is_empty() {
            self.identifier(out, qualifier);
            out.push('.');
        }
        self.identifier(out, name);
    }

    /// Appends a placeholder and registers its slot.
    pub(crate) fn placeholder(
        &mut self,
        out: &mut String,
        id: Option<ParamId>,
        ty: &TypeRef,
        preset: Option<&Result<SqlValue, ConversionError>>,
    ) {
        let index = self.params.len();
        let preset = match preset {
            None => None,
            Some(Ok(value)) => match ty.accept_encoded(value.clone()) {
                Ok(coerced) => Some(coerced),
                Err(source) => {
                    self.defer_preset(index, ty, source);
                    None
                }
            },
            Some(Err(source)) => {
                self.defer_preset(index, ty, source.clone());
                None
            }
        };
        self.params.push(ParamSpec {
            ty: Arc::clone(ty),
            preset,
            id,
        });
        if let Some(id) = id {
            self.positions.entry(id).or_default().push(index);
        }
        out.push_str(self.dialect.parameter_placeholder());
    }

    fn defer_preset(&mut self, index: usize, ty: &TypeRef, source: ConversionError) {
        self.deferred.push(Deferred::Preset {
            index,
            ty: ty.type_name(),
            source,
        });
    }

    /// Makes the columns of `source` referable until the matching
    /// [`RenderCtx::leave_scope`]. Nested queries also see every enclosing
    /// scope, so correlated references resolve.
    pub(crate) fn enter_scope(&mut self, source: Option<&Source>) {
        self.scopes.push(source.cloned());
    }

    pub(crate) fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    /// Records [`SchemaError::ColumnNotInSet`] when `column` belongs to no
    /// enclosing scope. Fragments rendered outside any scope are not checked.
    pub(crate) fn check_scope(&mut self, column: &ColumnRef) {
        let Some(innermost) = self.scopes.last() else {
            return;
        };
        if self.scopes.iter().flatten().any(|s| s.contains(column.key())) {
            return;
        }
        let set = innermost
            .as_ref()
            .map_or_else(|| String::from("no source"), |s| s.set_name().to_owned());
        self.defer(SchemaError::ColumnNotInSet {
            column: column.to_string(),
            set,
        });
    }

    /// Records a configuration error found while rendering.
    pub(crate) fn defer(&mut self, error: SchemaError) {
        self.deferred.push(Deferred::Schema(error));
    }

    pub(crate) fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Returns the first configuration error, if any.
    pub(crate) fn schema_error(&self) -> Option<SchemaError> {
        self.deferred.iter().find_map(|d| match d {
            Deferred::Schema(e) => Some(e.clone()),
            Deferred::Preset { .. } => None,
        })
    }

    /// Finishes rendering, reporting the first deferred error.
    pub(crate) fn into_seed(self, sql: &str, columns: Vec<OutputColumn>) -> Result<Seed> {
        let sql: Arc<str> = Arc::from(sql);
        if let Some(first) = self.deferred.into_iter().next() {
            return Err(match first {
                Deferred::Schema(e) => Error::Schema(e),
                Deferred::Preset { index, ty, source } => Error::Bind {
                    index,
                    ty,
                    sql,
                    source,
                },
            });
        }
        Ok(Seed::new(sql, self.params, self.positions, columns))
    }
}
