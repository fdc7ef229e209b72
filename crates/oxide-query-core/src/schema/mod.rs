//! Column identity, tables and their ordering.
//!
//! A column is identified by a [`ColumnKey`]: the [`SetId`] of the column set
//! that declares it plus its name. Columns re-exposed by an alias, a view or
//! a subquery get a key of their own and remember the keys they were derived
//! from, so lookups can match either exactly or through that lineage.

mod order;
mod table;

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::expr::{Expr, Expression, Param};
use crate::types::{PersistentType, TypeRef, ValueKind};
use crate::value::SqlValue;

pub use order::creation_order;
pub use table::{ColumnDef, CompositeColumn, CompositeDef, Table, TableBuilder};

/// Identity of a column set (table, alias, view, query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(u64);

impl SetId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable identity of a column: owning set plus declared name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub(crate) set: SetId,
    pub(crate) name: Arc<str>,
}

impl ColumnKey {
    pub(crate) fn new(set: SetId, name: &str) -> Self {
        Self {
            set,
            name: Arc::from(name),
        }
    }

    /// Returns the owning set.
    #[must_use]
    pub const fn set(&self) -> SetId {
        self.set
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A foreign key reference to a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: Arc<str>,
    /// Referenced column.
    pub column: Arc<str>,
    /// Action on delete.
    pub on_delete: Option<ForeignKeyAction>,
    /// Action on update.
    pub on_update: Option<ForeignKeyAction>,
    pub(crate) table_id: SetId,
}

impl ForeignKey {
    /// Returns the identity of the referenced table.
    #[must_use]
    pub const fn table_id(&self) -> SetId {
        self.table_id
    }
}

/// Column constraints used by DDL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Part of the primary key.
    pub primary_key: bool,
    /// Unique constraint.
    pub unique: bool,
    /// Auto-increment (integer primary keys only).
    pub auto_increment: bool,
    /// Default value, already in storage form.
    pub default: Option<SqlValue>,
    /// Foreign key reference.
    pub foreign_key: Option<ForeignKey>,
}

/// Shared description of one column.
#[derive(Debug)]
pub struct ColumnInfo {
    key: ColumnKey,
    qualifier: Arc<str>,
    ty: TypeRef,
    constraints: Constraints,
    origins: Vec<ColumnKey>,
}

/// Cheap handle to a column of any kind.
#[derive(Debug, Clone)]
pub struct ColumnRef(Arc<ColumnInfo>);

impl ColumnRef {
    pub(crate) fn new(
        key: ColumnKey,
        qualifier: Arc<str>,
        ty: TypeRef,
        constraints: Constraints,
    ) -> Self {
        Self(Arc::new(ColumnInfo {
            key,
            qualifier,
            ty,
            constraints,
            origins: Vec::new(),
        }))
    }

    /// Creates the copy of this column exposed by another set.
    pub(crate) fn derive(&self, set: SetId, qualifier: &Arc<str>) -> Self {
        let mut origins = Vec::with_capacity(self.0.origins.len() + 1);
        origins.push(self.0.key.clone());
        origins.extend(self.0.origins.iter().cloned());
        Self(Arc::new(ColumnInfo {
            key: ColumnKey {
                set,
                name: Arc::clone(&self.0.key.name),
            },
            qualifier: Arc::clone(qualifier),
            ty: Arc::clone(&self.0.ty),
            constraints: Constraints::default(),
            origins,
        }))
    }

    /// Creates a column from a result column of a query.
    pub(crate) fn from_output(
        set: SetId,
        qualifier: &Arc<str>,
        name: &Arc<str>,
        ty: &TypeRef,
        lineage: Vec<ColumnKey>,
    ) -> Self {
        Self(Arc::new(ColumnInfo {
            key: ColumnKey {
                set,
                name: Arc::clone(name),
            },
            qualifier: Arc::clone(qualifier),
            ty: Arc::clone(ty),
            constraints: Constraints::default(),
            origins: lineage,
        }))
    }

    /// Returns the column identity.
    #[must_use]
    pub fn key(&self) -> &ColumnKey {
        &self.0.key
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.key.name
    }

    /// Returns the rendered qualifier (table or alias name); empty for none.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        &self.0.qualifier
    }

    /// Returns the erased descriptor.
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.0.ty
    }

    /// Returns the DDL constraints.
    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.0.constraints
    }

    /// Returns the keys this column was derived from, nearest first.
    #[must_use]
    pub fn origins(&self) -> &[ColumnKey] {
        &self.0.origins
    }

    /// Returns whether this column is `key` or was derived from it.
    #[must_use]
    pub fn derives_from(&self, key: &ColumnKey) -> bool {
        self.0.key == *key || self.0.origins.contains(key)
    }

    /// Returns whether the column is declared by a table.
    #[must_use]
    pub fn is_table_column(&self) -> bool {
        self.0.origins.is_empty()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifier().is_empty() {
            f.write_str(self.name())
        } else {
            write!(f, "{}.{}", self.qualifier(), self.name())
        }
    }
}

/// A typed column.
///
/// Dereferences to [`Expression`], so every comparison and operator of the
/// column's kind is available directly.
#[derive(Debug, Clone)]
pub struct Column<K: ValueKind> {
    expr: Expression<K>,
    column: ColumnRef,
}

impl<K: ValueKind> Column<K> {
    pub(crate) fn from_ref(column: ColumnRef, ty: Arc<PersistentType<K>>) -> Self {
        Self {
            expr: Expression::new(Expr::Column(column.clone()), ty),
            column,
        }
    }

    /// Returns the untyped handle.
    #[must_use]
    pub const fn column_ref(&self) -> &ColumnRef {
        &self.column
    }

    /// Returns the column as an expression.
    #[must_use]
    pub const fn expr(&self) -> &Expression<K> {
        &self.expr
    }

    /// Returns the column identity.
    #[must_use]
    pub fn key(&self) -> &ColumnKey {
        self.column.key()
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.column.name()
    }

    /// Creates a placeholder that shares this column's descriptor.
    #[must_use]
    pub fn param(&self) -> Param<K> {
        Param::with_type(Arc::clone(&self.expr.ty))
    }

    pub(crate) fn descriptor_arc(&self) -> &Arc<PersistentType<K>> {
        &self.expr.ty
    }
}

impl<K: ValueKind> Deref for Column<K> {
    type Target = Expression<K>;

    fn deref(&self) -> &Expression<K> {
        &self.expr
    }
}

impl<K: ValueKind> fmt::Display for Column<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.column.fmt(f)
    }
}
