//! INSERT statements.

use std::sync::Arc;

use super::seed::Seed;
use crate::error::{Result, SchemaError};
use crate::expr::{BindExpr, Expr, Operand};
use crate::render::{RenderCtx, RenderOptions};
use crate::schema::{Column, ColumnRef, CompositeColumn, Table};
use crate::source::ColumnSet;
use crate::types::{CompositeKind, TypeRef, ValueKind};

/// Conflict resolution of an INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conflict {
    Replace,
    Ignore,
}

/// An INSERT statement for one row.
///
/// Columns that are not set take their default. Values are always bound as
/// parameters: plain values are preset by the statement, [`placeholder`]
/// slots are left for the caller to bind by position.
///
/// [`placeholder`]: Insert::placeholder
#[derive(Debug, Clone)]
#[must_use]
pub struct Insert {
    table: Table,
    conflict: Option<Conflict>,
    columns: Vec<ColumnRef>,
    values: Vec<Expr>,
    errors: Vec<SchemaError>,
}

impl Insert {
    /// Starts an INSERT into `table`.
    pub fn into_table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            conflict: None,
            columns: Vec::new(),
            values: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn push(&mut self, column: &ColumnRef, value: Expr) {
        if !self.table.contains(column.key()) {
            self.errors.push(SchemaError::ColumnNotInSet {
                column: column.to_string(),
                set: self.table.name().to_owned(),
            });
        } else if self.columns.iter().any(|c| c.key() == column.key()) {
            self.errors.push(SchemaError::DuplicateColumn {
                set: self.table.name().to_owned(),
                column: column.name().to_owned(),
            });
        } else {
            self.columns.push(column.clone());
            self.values.push(value);
        }
    }

    /// Sets a column to a value, expression or [`Param`](crate::expr::Param).
    pub fn set<K: ValueKind>(mut self, column: &Column<K>, value: impl Into<Operand<K>>) -> Self {
        let value = value.into().into_expr(column.descriptor_arc());
        self.push(column.column_ref(), value);
        self
    }

    /// Sets a column to an anonymous placeholder bound later by position.
    pub fn placeholder<K: ValueKind>(mut self, column: &Column<K>) -> Self {
        let value = Expr::Bind(BindExpr {
            id: None,
            ty: Arc::clone(column.descriptor_arc()) as TypeRef,
            preset: None,
        });
        self.push(column.column_ref(), value);
        self
    }

    /// Sets every component of a composite column.
    pub fn set_composite<C: CompositeKind>(
        mut self,
        column: &CompositeColumn<C>,
        value: &C::Value,
    ) -> Self {
        for (part, bind) in column.parts().iter().zip(column.binds(value)) {
            self.push(part, bind);
        }
        self
    }

    /// Uses `INSERT OR REPLACE`.
    pub const fn or_replace(mut self) -> Self {
        self.conflict = Some(Conflict::Replace);
        self
    }

    /// Uses `INSERT OR IGNORE`.
    pub const fn or_ignore(mut self) -> Self {
        self.conflict = Some(Conflict::Ignore);
        self
    }

    /// Renders the statement with the global pool and the generic dialect.
    ///
    /// # Errors
    ///
    /// The first configuration or preset conversion error found.
    pub fn build(&self) -> Result<Seed> {
        self.build_with(&RenderOptions::default())
    }

    /// Renders the statement with an explicit pool and dialect.
    ///
    /// # Errors
    ///
    /// The first configuration or preset conversion error found.
    pub fn build_with(&self, options: &RenderOptions<'_>) -> Result<Seed> {
        let mut ctx = RenderCtx::new(options);
        let mut sql = options.pool.acquire();
        for error in &self.errors {
            ctx.defer(error.clone());
        }

        sql.push_str(match self.conflict {
            None => "INSERT INTO ",
            Some(Conflict::Replace) => "INSERT OR REPLACE INTO ",
            Some(Conflict::Ignore) => "INSERT OR IGNORE INTO ",
        });
        ctx.identifier(&mut sql, self.table.name());
        if self.columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(" (");
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                ctx.identifier(&mut sql, column.name());
            }
            sql.push_str(") VALUES (");
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                value.render(&mut ctx, &mut sql);
            }
            sql.push(')');
        }
        ctx.into_seed(&sql, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::error::{ConversionError, Error};
    use crate::expr::Param;
    use crate::types::{Int64, OffsetTimestamp, Text};
    use crate::value::SqlValue;

    #[test]
    fn test_insert_values_and_placeholders() {
        let mut t = Table::builder("Artist");
        let id = t.column("id", Int64).primary_key().add().unwrap();
        let name = t.column("name", Text).not_null().add().unwrap();
        let bio = t.column("bio", Text).add().unwrap();
        let artist = t.build().unwrap();

        let p = Param::new(Text);
        let seed = Insert::into_table(&artist)
            .placeholder(&id)
            .set(&name, &p)
            .set(&bio, None)
            .or_ignore()
            .build()
            .unwrap();
        assert_eq!(
            seed.sql(),
            "INSERT OR IGNORE INTO Artist (id, name, bio) VALUES (?, ?, ?)"
        );
        assert_eq!(seed.params()[0].preset(), None);
        assert_eq!(seed.positions(p.id()), &[1]);
        assert_eq!(seed.params()[2].preset(), Some(&SqlValue::Null));
    }

    #[test]
    fn test_insert_errors() {
        let mut t = Table::builder("Artist");
        let name = t.column("name", Text).not_null().add().unwrap();
        let artist = t.build().unwrap();
        let mut t = Table::builder("Other");
        let other = t.column("x", Text).add().unwrap();

        assert!(matches!(
            Insert::into_table(&artist).set(&other, "v").build(),
            Err(Error::Schema(SchemaError::ColumnNotInSet { .. }))
        ));
        assert!(matches!(
            Insert::into_table(&artist).set(&name, "a").set(&name, "b").build(),
            Err(Error::Schema(SchemaError::DuplicateColumn { .. }))
        ));
        match Insert::into_table(&artist).set(&name, None).build() {
            Err(Error::Bind { index, sql, source, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(&*sql, "INSERT INTO Artist (name) VALUES (?)");
                assert!(matches!(source, ConversionError::NullNotAllowed { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_values_and_composites() {
        let mut t = Table::builder("Event");
        let at = t.composite("at", OffsetTimestamp).not_null().add().unwrap();
        let event = t.build().unwrap();

        let seed = Insert::into_table(&event).or_replace().build().unwrap();
        assert_eq!(seed.sql(), "INSERT OR REPLACE INTO Event DEFAULT VALUES");

        let when = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+02:00").unwrap();
        let seed = Insert::into_table(&event).set_composite(&at, &when).build().unwrap();
        assert_eq!(
            seed.sql(),
            "INSERT INTO Event (at_utc_ms, at_offset_s) VALUES (?, ?)"
        );
        assert_eq!(seed.params()[1].preset(), Some(&SqlValue::Integer(7200)));
    }
}
