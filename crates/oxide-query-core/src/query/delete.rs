//! DELETE statements using the typestate pattern.
//!
//! A DELETE can only be built once it is filtered or explicitly marked as
//! deleting every row, so an unfiltered delete is never accidental.

use std::marker::PhantomData;

use super::seed::Seed;
use crate::error::Result;
use crate::expr::{combine, Expr, LogicalOp, Predicate};
use crate::render::{RenderCtx, RenderOptions};
use crate::schema::Table;
use crate::source::Source;

/// Marker: neither filtered nor marked as deleting every row.
#[derive(Debug, Clone, Copy)]
pub struct NoWhere;
/// Marker: filtered, or deleting every row on purpose.
#[derive(Debug, Clone, Copy)]
pub struct HasWhere;

/// A DELETE statement.
#[derive(Debug, Clone)]
#[must_use]
pub struct Delete<State> {
    table: Table,
    filter: Option<Expr>,
    _state: PhantomData<State>,
}

impl Delete<NoWhere> {
    /// Starts a DELETE from `table`.
    pub fn from_table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            filter: None,
            _state: PhantomData,
        }
    }

    /// Deletes every row.
    pub fn all_rows(self) -> Delete<HasWhere> {
        Delete {
            table: self.table,
            filter: None,
            _state: PhantomData,
        }
    }
}

impl<State> Delete<State> {
    /// Adds a WHERE condition, ANDed with any previous one.
    pub fn where_clause(self, predicate: Predicate) -> Delete<HasWhere> {
        let filter = match self.filter {
            Some(existing) => combine(LogicalOp::And, existing, predicate.expr),
            None => predicate.expr,
        };
        Delete {
            table: self.table,
            filter: Some(filter),
            _state: PhantomData,
        }
    }
}

impl Delete<HasWhere> {
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
        ctx.enter_scope(Some(&Source::from(&self.table)));
        sql.push_str("DELETE FROM ");
        ctx.identifier(&mut sql, self.table.name());
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render(&mut ctx, &mut sql);
        }
        ctx.into_seed(&sql, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Int64, Text};

    #[test]
    fn test_delete_requires_intent() {
        let mut t = Table::builder("Album");
        let id = t.column("id", Int64).primary_key().add().unwrap();
        let name = t.column("name", Text).add().unwrap();
        let album = t.build().unwrap();

        let seed = Delete::from_table(&album)
            .where_clause(id.gt(10_i64))
            .where_clause(name.is_null())
            .build()
            .unwrap();
        assert_eq!(
            seed.sql(),
            "DELETE FROM Album WHERE Album.id > ? AND Album.name IS NULL"
        );

        let seed = Delete::from_table(&album).all_rows().build().unwrap();
        assert_eq!(seed.sql(), "DELETE FROM Album");
        assert!(seed.params().is_empty());
    }
}
