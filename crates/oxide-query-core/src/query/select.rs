//! SELECT queries.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use super::compound::{CompoundSelect, SetOperator};
use super::seed::{OutputColumn, Seed};
use crate::error::{Result, SchemaError};
use crate::expr::{
    combine, BindExpr, Expr, Expression, LogicalOp, Operand, Param, Predicate, Projection,
    Selectable,
};
use crate::render::{RenderCtx, RenderOptions};
use crate::schema::{Column, ColumnKey, ColumnRef, CompositeColumn};
use crate::source::{ColumnSet, Source};
use crate::types::{CompositeKind, Int64, PersistentType, TypeRef, ValueKind};
use crate::value::SqlValue;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Ascending (the SQL default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Order {
    pub(crate) fn render(self, out: &mut String) {
        if self == Self::Desc {
            out.push_str(" DESC");
        }
    }
}

#[derive(Debug, Clone)]
enum ResultItem {
    Column(ColumnRef),
    Projection {
        key: ColumnKey,
        expr: Expr,
        ty: TypeRef,
    },
}

/// Result name of each item, and whether it had to be renamed.
///
/// A column whose name is already taken gets `name_1`, `name_2`, ... so
/// every result column of a subquery or view has its own identity.
/// Projection labels are kept as given.
fn result_names(items: &[ResultItem]) -> Vec<(Arc<str>, bool)> {
    let mut taken: HashSet<Arc<str>> = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(|item| {
            let (name, renamed): (Arc<str>, bool) = match item {
                ResultItem::Column(column) if taken.contains(column.name()) => {
                    let mut n = 1_u32;
                    loop {
                        let candidate = format!("{}_{n}", column.name());
                        if !taken.contains(candidate.as_str()) {
                            break (Arc::from(candidate), true);
                        }
                        n += 1;
                    }
                }
                ResultItem::Column(column) => (Arc::from(column.name()), false),
                ResultItem::Projection { key, .. } => (Arc::from(key.name()), false),
            };
            taken.insert(Arc::clone(&name));
            (name, renamed)
        })
        .collect()
}

/// A SELECT query.
///
/// Result columns must belong to the source; a column from anywhere else is
/// a configuration error reported by [`Select::build`]. Without explicit
/// result columns every column of the source is selected. Columns sharing a
/// name are labelled `name_1`, `name_2`, ... in select-list order.
///
/// # Example
///
/// ```rust
/// use oxide_query_core::query::Select;
/// use oxide_query_core::schema::Table;
/// use oxide_query_core::types::{Int64, Text};
///
/// # fn main() -> oxide_query_core::Result<()> {
/// let mut artist = Table::builder("Artist");
/// let _id = artist.column("id", Int64).primary_key().add()?;
/// let name = artist.column("name", Text).not_null().add()?;
/// let artist = artist.build()?;
///
/// let seed = Select::new()
///     .from(&artist)
///     .column(&name)
///     .where_clause(name.like("%Zep%"))
///     .build()?;
/// assert_eq!(seed.sql(), "SELECT Artist.name FROM Artist WHERE Artist.name LIKE ?");
/// assert_eq!(seed.params().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Select {
    source: Option<Source>,
    distinct: bool,
    items: Vec<ResultItem>,
    filter: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    order_by: Vec<(Expr, Order)>,
    limit: Option<Expr>,
    offset: Option<Expr>,
    errors: Vec<SchemaError>,
}

/// `LIMIT`/`OFFSET` value bound through the statement's parameters.
pub(crate) fn count_bind(n: i64) -> Expr {
    Expr::Bind(BindExpr {
        id: None,
        ty: Arc::new(PersistentType::new(Int64)),
        preset: Some(Ok(SqlValue::Integer(n))),
    })
}

/// Renders `LIMIT`/`OFFSET`; SQLite requires a limit before any offset.
pub(crate) fn render_limit(
    limit: Option<&Expr>,
    offset: Option<&Expr>,
    ctx: &mut RenderCtx<'_>,
    out: &mut String,
) {
    match (limit, offset) {
        (Some(limit), offset) => {
            out.push_str(" LIMIT ");
            limit.render(ctx, out);
            if let Some(offset) = offset {
                out.push_str(" OFFSET ");
                offset.render(ctx, out);
            }
        }
        (None, Some(offset)) => {
            out.push_str(" LIMIT -1 OFFSET ");
            offset.render(ctx, out);
        }
        (None, None) => {}
    }
}

impl Select {
    /// Creates an empty query without a source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source of the query.
    #[allow(clippy::should_implement_trait)]
    pub fn from(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the source, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    fn check(&mut self, column: &ColumnRef) -> bool {
        match &self.source {
            Some(source) if source.contains(column.key()) => true,
            source => {
                self.errors.push(SchemaError::ColumnNotInSet {
                    column: column.to_string(),
                    set: source
                        .as_ref()
                        .map_or_else(|| String::from("no source"), |s| s.set_name().to_owned()),
                });
                false
            }
        }
    }

    /// Adds a result column.
    pub fn column<K: ValueKind>(mut self, column: &Column<K>) -> Self {
        let column = column.column_ref();
        if self.check(column) {
            self.items.push(ResultItem::Column(column.clone()));
        }
        self
    }

    /// Adds every component column of a composite column.
    pub fn composite<C: CompositeKind>(mut self, column: &CompositeColumn<C>) -> Self {
        for part in column.parts() {
            if self.check(part) {
                self.items.push(ResultItem::Column(part.clone()));
            }
        }
        self
    }

    /// Adds every column of the source, in order.
    pub fn all_columns(mut self) -> Self {
        if let Some(source) = &self.source {
            self.items
                .extend(source.column_refs().iter().cloned().map(ResultItem::Column));
        }
        self
    }

    /// Adds a labelled expression.
    pub fn project<K: ValueKind>(mut self, projection: &Projection<K>) -> Self {
        self.items.push(ResultItem::Projection {
            key: projection.key.clone(),
            expr: projection.expr.clone(),
            ty: Arc::clone(&projection.ty) as TypeRef,
        });
        self
    }

    /// Selects distinct rows only.
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a WHERE condition, ANDed with any previous one.
    pub fn where_clause(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => combine(LogicalOp::And, existing, predicate.expr),
            None => predicate.expr,
        });
        self
    }

    /// Adds a GROUP BY term.
    pub fn group_by<K: ValueKind>(mut self, expr: impl Into<Operand<K>>) -> Self {
        self.group_by.push(expr.into().into_untyped());
        self
    }

    /// Adds a HAVING condition, ANDed with any previous one.
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => combine(LogicalOp::And, existing, predicate.expr),
            None => predicate.expr,
        });
        self
    }

    /// Adds an ORDER BY term.
    pub fn order_by<K: ValueKind>(mut self, expr: impl Into<Operand<K>>, order: Order) -> Self {
        self.order_by.push((expr.into().into_untyped(), order));
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

    /// Skips the number of rows bound to `param`.
    pub fn offset_param(mut self, param: &Param<Int64>) -> Self {
        self.offset = Some(param.to_expr());
        self
    }

    /// Combines with another query using `UNION`.
    pub fn union(self, other: Self) -> CompoundSelect {
        CompoundSelect::new(self).with_branch(SetOperator::Union, other)
    }

    /// Combines with another query using `UNION ALL`.
    pub fn union_all(self, other: Self) -> CompoundSelect {
        CompoundSelect::new(self).with_branch(SetOperator::UnionAll, other)
    }

    /// Combines with another query using `INTERSECT`.
    pub fn intersect(self, other: Self) -> CompoundSelect {
        CompoundSelect::new(self).with_branch(SetOperator::Intersect, other)
    }

    /// Combines with another query using `EXCEPT`.
    pub fn except(self, other: Self) -> CompoundSelect {
        CompoundSelect::new(self).with_branch(SetOperator::Except, other)
    }

    /// Uses the query as a scalar subquery producing the value of `of`.
    ///
    /// The result is nullable: a scalar subquery without rows yields NULL.
    pub fn scalar<K: ValueKind, S: Selectable<K>>(self, of: &S) -> Expression<K> {
        Expression::new(
            Expr::Subquery(Box::new(self)),
            Arc::new(of.descriptor().with_nullable(true)),
        )
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

    fn items(&self) -> Cow<'_, [ResultItem]> {
        match &self.source {
            Some(source) if self.items.is_empty() => Cow::Owned(
                source
                    .column_refs()
                    .iter()
                    .cloned()
                    .map(ResultItem::Column)
                    .collect(),
            ),
            _ => Cow::Borrowed(&self.items),
        }
    }

    /// Returns the result columns in order.
    pub(crate) fn output_columns(&self) -> Vec<OutputColumn> {
        let items = self.items();
        items
            .iter()
            .zip(result_names(&items))
            .map(|(item, (name, _))| match item {
                ResultItem::Column(column) => OutputColumn::new(
                    name,
                    Arc::clone(column.ty()),
                    column.key().clone(),
                    column.origins().to_vec(),
                ),
                ResultItem::Projection { key, ty, .. } => {
                    OutputColumn::new(name, Arc::clone(ty), key.clone(), Vec::new())
                }
            })
            .collect()
    }

    pub(crate) fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        for error in &self.errors {
            ctx.defer(error.clone());
        }
        ctx.enter_scope(self.source.as_ref());

        out.push_str("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        let items = self.items();
        if items.is_empty() {
            ctx.defer(SchemaError::NoResultColumns);
        }
        let names = result_names(&items);
        let mut seen = HashSet::with_capacity(names.len());
        for (i, (item, (name, renamed))) in items.iter().zip(names).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if !seen.insert(Arc::clone(&name)) {
                ctx.defer(SchemaError::DuplicateColumn {
                    set: String::from("result"),
                    column: name.to_string(),
                });
            }
            match item {
                ResultItem::Column(column) => {
                    ctx.qualified(out, column.qualifier(), column.name());
                    if renamed {
                        out.push_str(" AS ");
                        ctx.identifier(out, &name);
                    }
                }
                ResultItem::Projection { key, expr, .. } => {
                    expr.render(ctx, out);
                    out.push_str(" AS ");
                    ctx.identifier(out, key.name());
                }
            }
        }

        if let Some(source) = &self.source {
            out.push_str(" FROM ");
            source.render(ctx, out);
        }
        if let Some(filter) = &self.filter {
            out.push_str(" WHERE ");
            filter.render(ctx, out);
        }
        if !self.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                expr.render(ctx, out);
            }
        }
        if let Some(having) = &self.having {
            out.push_str(" HAVING ");
            having.render(ctx, out);
        }
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            for (i, (expr, order)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                expr.render(ctx, out);
                order.render(out);
            }
        }
        render_limit(self.limit.as_ref(), self.offset.as_ref(), ctx, out);
        ctx.leave_scope();
    }

    /// Renders `(SELECT ...)` into its own pooled builder first.
    pub(crate) fn render_nested(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        let pool = ctx.pool;
        let mut body = pool.acquire();
        self.render(ctx, &mut body);
        out.push('(');
        out.push_str(&body);
        out.push(')');
    }
}
