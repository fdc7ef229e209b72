//! UPDATE statements using the typestate pattern.
//!
//! `build()` is only available once at least one column has been set.

use std::marker::PhantomData;

use super::seed::Seed;
use crate::error::{Result, SchemaError};
use crate::expr::{combine, Expr, LogicalOp, Operand, Predicate};
use crate::render::{RenderCtx, RenderOptions};
use crate::schema::{Column, ColumnRef, Table};
use crate::source::{ColumnSet, Source};
use crate::types::ValueKind;

/// Marker: no column set yet.
#[derive(Debug, Clone, Copy)]
pub struct NoSet;
/// Marker: at least one column set.
#[derive(Debug, Clone, Copy)]
pub struct HasSet;

/// An UPDATE statement.
#[derive(Debug, Clone)]
#[must_use]
pub struct Update<Set> {
    table: Table,
    assignments: Vec<(ColumnRef, Expr)>,
    filter: Option<Expr>,
    errors: Vec<SchemaError>,
    _state: PhantomData<Set>,
}

impl Update<NoSet> {
    /// Starts an UPDATE of `table`.
    pub fn table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            assignments: Vec::new(),
            filter: None,
            errors: Vec::new(),
            _state: PhantomData,
        }
    }
}

impl<Set> Update<Set> {
    /// Sets a column to a value, expression or placeholder.
    pub fn set<K: ValueKind>(
        mut self,
        column: &Column<K>,
        value: impl Into<Operand<K>>,
    ) -> Update<HasSet> {
        let target = column.column_ref();
        if !self.table.contains(target.key()) {
            self.errors.push(SchemaError::ColumnNotInSet {
                column: target.to_string(),
                set: self.table.name().to_owned(),
            });
        } else if self.assignments.iter().any(|(c, _)| c.key() == target.key()) {
            self.errors.push(SchemaError::DuplicateColumn {
                set: self.table.name().to_owned(),
                column: target.name().to_owned(),
            });
        } else {
            let value = value.into().into_expr(column.descriptor_arc());
            self.assignments.push((target.clone(), value));
        }
        Update {
            table: self.table,
            assignments: self.assignments,
            filter: self.filter,
            errors: self.errors,
            _state: PhantomData,
        }
    }

    /// Adds a WHERE condition, ANDed with any previous one.
    pub fn where_clause(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => combine(LogicalOp::And, existing, predicate.expr),
            None => predicate.expr,
        });
        self
    }
}

impl Update<HasSet> {
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

        ctx.enter_scope(Some(&Source::from(&self.table)));
        sql.push_str("UPDATE ");
        ctx.identifier(&mut sql, self.table.name());
        sql.push_str(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            ctx.identifier(&mut sql, column.name());
            sql.push_str(" = ");
            value.render(&mut ctx, &mut sql);
        }
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render(&mut ctx, &mut sql);
        }
        ctx.into_seed(&sql, Vec::new())
    }
}
