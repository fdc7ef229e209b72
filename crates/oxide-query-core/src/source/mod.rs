//! Column sets a query can read from.
//!
//! Every source exposes an ordered list of [`ColumnRef`]s. Tables declare
//! theirs; aliases, views and subqueries re-expose the columns of what they
//! wrap under a new identity that remembers where each column came from;
//! joins concatenate the columns of both sides unchanged.

mod alias;
mod join;
mod view;

use std::sync::Arc;

use crate::error::SchemaError;
use crate::expr::Selectable;
use crate::query::{CompoundSelect, OutputColumn, Select};
use crate::render::RenderCtx;
use crate::schema::{Column, ColumnKey, ColumnRef, SetId, Table};
use crate::types::ValueKind;

pub use alias::Alias;
pub use join::{Join, JoinKind};
pub use view::View;

/// An ordered, identified set of columns.
pub trait ColumnSet {
    /// Returns the identity of the set.
    fn set_id(&self) -> SetId;

    /// Returns the name used in messages and as the default qualifier.
    fn set_name(&self) -> &str;

    /// Returns the columns in order.
    fn column_refs(&self) -> &[ColumnRef];

    /// Returns whether `key` is one of the set's own columns.
    fn contains(&self, key: &ColumnKey) -> bool {
        self.column_refs().iter().any(|c| c.key() == key)
    }

    /// Finds the column for `key`: the column itself, or the one derived
    /// from it.
    fn find(&self, key: &ColumnKey) -> Option<&ColumnRef> {
        let columns = self.column_refs();
        columns
            .iter()
            .find(|c| c.key() == key)
            .or_else(|| columns.iter().find(|c| c.derives_from(key)))
    }

    /// Resolves a column of a wrapped set to this set's copy of it.
    ///
    /// # Errors
    ///
    /// [`SchemaError::ColumnNotInSet`] when no column of this set is, or was
    /// derived from, `target`.
    fn resolve<K, S>(&self, target: &S) -> Result<Column<K>, SchemaError>
    where
        Self: Sized,
        K: ValueKind,
        S: Selectable<K>,
    {
        match self.find(target.result_key()) {
            Some(found) => Ok(Column::from_ref(
                found.clone(),
                Arc::new(target.descriptor().clone()),
            )),
            None => Err(SchemaError::ColumnNotInSet {
                column: target.display_name(),
                set: self.set_name().to_owned(),
            }),
        }
    }
}

/// The FROM clause of a query.
#[derive(Debug, Clone)]
pub enum Source {
    /// A table.
    Table(Table),
    /// An aliased table, view or subquery.
    Alias(Alias),
    /// A join of two sources.
    Join(Join),
    /// A view.
    View(View),
    /// A nested query.
    Query(Subquery),
}

impl Source {
    pub(crate) fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        match self {
            Self::Table(table) => ctx.identifier(out, table.name()),
            Self::Alias(alias) => alias.render(ctx, out),
            Self::Join(join) => join.render(ctx, out),
            Self::View(view) => ctx.identifier(out, view.name()),
            Self::Query(query) => query.render(ctx, out),
        }
    }

    fn as_set(&self) -> &dyn ColumnSet {
        match self {
            Self::Table(t) => t,
            Self::Alias(a) => a,
            Self::Join(j) => j,
            Self::View(v) => v,
            Self::Query(q) => q,
        }
    }
}

impl ColumnSet for Source {
    fn set_id(&self) -> SetId {
        self.as_set().set_id()
    }

    fn set_name(&self) -> &str {
        self.as_set().set_name()
    }

    fn column_refs(&self) -> &[ColumnRef] {
        self.as_set().column_refs()
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<&Table> for Source {
    fn from(table: &Table) -> Self {
        Self::Table(table.clone())
    }
}

impl From<Alias> for Source {
    fn from(alias: Alias) -> Self {
        Self::Alias(alias)
    }
}

impl From<&Alias> for Source {
    fn from(alias: &Alias) -> Self {
        Self::Alias(alias.clone())
    }
}

impl From<Join> for Source {
    fn from(join: Join) -> Self {
        Self::Join(join)
    }
}

impl From<View> for Source {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

impl From<&View> for Source {
    fn from(view: &View) -> Self {
        Self::View(view.clone())
    }
}

impl From<Subquery> for Source {
    fn from(query: Subquery) -> Self {
        Self::Query(query)
    }
}

impl From<Select> for Source {
    fn from(select: Select) -> Self {
        Self::Query(Subquery::from(select))
    }
}

impl From<CompoundSelect> for Source {
    fn from(compound: CompoundSelect) -> Self {
        Self::Query(Subquery::from(compound))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum QueryBody {
    Select(Select),
    Compound(CompoundSelect),
}

impl QueryBody {
    pub(crate) fn output_columns(&self) -> Vec<OutputColumn> {
        match self {
            Self::Select(select) => select.output_columns(),
            Self::Compound(compound) => compound.output_columns(),
        }
    }

    pub(crate) fn render_nested(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        match self {
            Self::Select(select) => select.render_nested(ctx, out),
            Self::Compound(compound) => compound.render_nested(ctx, out),
        }
    }
}

#[derive(Debug)]
struct SubqueryDef {
    id: SetId,
    body: QueryBody,
    columns: Vec<ColumnRef>,
}

/// A query used as a source.
///
/// Its columns are the query's result columns, unqualified, each derived
/// from the column or projection it was selected from.
#[derive(Debug, Clone)]
pub struct Subquery(Arc<SubqueryDef>);

impl Subquery {
    fn new(body: QueryBody) -> Self {
        let id = SetId::next();
        let qualifier: Arc<str> = Arc::from("");
        let columns = output_refs(id, &qualifier, &body.output_columns());
        Self(Arc::new(SubqueryDef { id, body, columns }))
    }

    /// Returns this subquery's copy of a column or projection of the query.
    ///
    /// # Errors
    ///
    /// [`SchemaError::ColumnNotInSet`] when the query does not select it.
    pub fn column<K: ValueKind, S: Selectable<K>>(
        &self,
        target: &S,
    ) -> Result<Column<K>, SchemaError> {
        self.resolve(target)
    }

    fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        self.0.body.render_nested(ctx, out);
    }
}

impl From<Select> for Subquery {
    fn from(select: Select) -> Self {
        Self::new(QueryBody::Select(select))
    }
}

impl From<CompoundSelect> for Subquery {
    fn from(compound: CompoundSelect) -> Self {
        Self::new(QueryBody::Compound(compound))
    }
}

impl ColumnSet for Subquery {
    fn set_id(&self) -> SetId {
        self.0.id
    }

    fn set_name(&self) -> &str {
        "subquery"
    }

    fn column_refs(&self) -> &[ColumnRef] {
        &self.0.columns
    }
}

/// Turns the result columns of a query into columns of the set `id`.
pub(crate) fn output_refs(
    id: SetId,
    qualifier: &Arc<str>,
    outputs: &[OutputColumn],
) -> Vec<ColumnRef> {
    outputs
        .iter()
        .map(|output| {
            let mut lineage = Vec::with_capacity(output.lineage().len() + 1);
            lineage.push(output.key().clone());
            lineage.extend(output.lineage().iter().cloned());
            ColumnRef::from_output(id, qualifier, output.name_arc(), output.ty(), lineage)
        })
        .collect()
}
