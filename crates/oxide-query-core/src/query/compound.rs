//! UNION, INTERSECT and EXCEPT.

use tracing::warn;

use super::select::{count_bind, render_limit, Order, Select};
use super::seed::{OutputColumn, Seed};
use crate::error::{Result, SchemaError};
use crate::expr::{Expr, Param, Selectable};
use crate::render::{RenderCtx, RenderOptions};
use crate::types::{Int64, ValueKind};

/// Set operator joining two queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// `UNION`: distinct rows of both.
    Union,
    /// `UNION ALL`: every row of both.
    UnionAll,
    /// `INTERSECT`: rows in both.
    Intersect,
    /// `EXCEPT`: rows of the first not in the second.
    Except,
}

impl SetOperator {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// Queries combined with set operators.
///
/// The result columns are those of the first branch; sorting refers to them
/// by position. Branches with a different column count are logged and left
/// to the engine to reject.
#[derive(Debug, Clone)]
#[must_use]
pub struct CompoundSelect {
    first: Select,
    branches: Vec<(SetOperator, Select)>,
    order_by: Vec<(usize, Order)>,
    limit: Option<Expr>,
    offset: Option<Expr>,
    errors: Vec<SchemaError>,
}

impl CompoundSelect {
    pub(crate) fn new(first: Select) -> Self {
        Self {
            first,
            branches: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            errors: Vec::new(),
        }
    }

    pub(crate) fn with_branch(mut self, operator: SetOperator, branch: Select) -> Self {
        let expected = self.first.output_columns().len();
        let found = branch.output_columns().len();
        if expected != found {
            warn!(
                operator = operator.as_sql(),
                expected,
                found,
                "compound branch column count differs from the first branch"
            );
        }
        self.branches.push((operator, branch));
        self
    }

    /// Adds a `UNION` branch.
    pub fn union(self, branch: Select) -> Self {
        self.with_branch(SetOperator::Union, branch)
    }

    /// Adds a `UNION ALL` branch.
    pub fn union_all(self, branch: Select) -> Self {
        self.with_branch(SetOperator::UnionAll, branch)
    }

    /// Adds an `INTERSECT` branch.
    pub fn intersect(self, branch: Select) -> Self {
        self.with_branch(SetOperator::Intersect, branch)
    }

    /// Adds an `EXCEPT` branch.
    pub fn except(self, branch: Select) -> Self {
        self.with_branch(SetOperator::Except, branch)
    }

    /// Sorts by a result column of the first branch.
    ///
    /// `target` is matched against the first branch's result columns by
    /// identity, or by the column they were derived from; anything else is a
    /// configuration error reported by [`CompoundSelect::build`].
    pub fn order_by<K: ValueKind, S: Selectable<K>>(mut self, target: &S, order: Order) -> Self {
        let key = target.result_key();
        let columns = self.first.output_columns();
        let position = columns
            .iter()
            .position(|c| c.key() == key)
            .or_else(|| columns.iter().position(|c| c.derives_from(key)));
        match position {
            Some(index) => self.order_by.push((index, order)),
            None => self.errors.push(SchemaError::ColumnNotInSet {
                column: target.display_name(),
                set: String::from("compound select"),
            }),
        }
        self
    }

    /// Limits the number of rows; the count is a bound parameter.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(count_bind(n));
        self
    }

    /// Limits the number of rows to the value bound to `param`.
    pub fn limit_param(mut self, param: &Param<Int64>) -> Self {
        self.limit = Some(param.to_expr());
        self
    }

    /// Skips rows; the count is a bound parameter.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(count_bind(n));
        self
    }

    /// Renders the query with the global pool and the generic dialect.
    ///
    /// # Errors
    ///
    /// The first configuration or preset conversion error found.
    pub fn build(&self) -> Result<Seed> {
        self.build_with(&RenderOptions::default())
    }

    /// Renders the query with an explicit pool and dialect.
    ///
    /// # Errors
    ///
    /// The first configuration or preset conversion error found.
    pub fn build_with(&self, options: &RenderOptions<'_>) -> Result<Seed> {
        let mut ctx = RenderCtx::new(options);
        let mut sql = options.pool.acquire();
        self.render(&mut ctx, &mut sql);
        ctx.into_seed(&sql, self.output_columns())
    }

    pub(crate) fn output_columns(&self) -> Vec<OutputColumn> {
        self.first.output_columns()
    }

    fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        for error in &self.errors {
            ctx.defer(error.clone());
        }
        self.first.render(ctx, out);
        for (operator, branch) in &self.branches {
            out.push(' ');
            out.push_str(operator.as_sql());
            out.push(' ');
            branch.render(ctx, out);
        }
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            for (i, (index, order)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&(index + 1).to_string());
                order.render(out);
            }
        }
        render_limit(self.limit.as_ref(), self.offset.as_ref(), ctx, out);
    }

    pub(crate) fn render_nested(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        let pool = ctx.pool;
        let mut body = pool.acquire();
        self.render(ctx, &mut body);
        out.push('(');
        out.push_str(&body);
        out.push(')');
    }
}
