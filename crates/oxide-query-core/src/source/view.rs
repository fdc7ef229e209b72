use std::sync::Arc;

use super::{output_refs, ColumnSet};
use crate::dialect::{validate_identifier, Dialect};
use crate::error::SchemaError;
use crate::expr::Selectable;
use crate::query::Select;
use crate::render::{RenderCtx, RenderOptions};
use crate::schema::{Column, ColumnRef, SetId};
use crate::types::ValueKind;

#[derive(Debug)]
struct ViewDef {
    id: SetId,
    name: Arc<str>,
    query: Select,
    columns: Vec<ColumnRef>,
}

/// A named stored query.
///
/// The columns of a view are the result columns of its query, qualified by
/// the view name. A view body cannot take bind parameters, so it may not
/// contain values, placeholders, `LIMIT` or `OFFSET`.
#[derive(Debug, Clone)]
pub struct View(Arc<ViewDef>);

impl View {
    /// Defines a view.
    ///
    /// # Errors
    ///
    /// [`SchemaError::InvalidIdentifier`] for a bad name,
    /// [`SchemaError::InvalidView`] when the query binds parameters, and any
    /// configuration error of the query itself.
    pub fn new(name: &str, query: Select) -> Result<Self, SchemaError> {
        validate_identifier(name)?;
        let options = RenderOptions::default();
        let mut ctx = RenderCtx::new(&options);
        let mut body = options.pool.acquire();
        query.render(&mut ctx, &mut body);
        if let Some(error) = ctx.schema_error() {
            return Err(error);
        }
        if ctx.param_count() > 0 {
            return Err(SchemaError::InvalidView {
                view: name.to_owned(),
                reason: format!("body binds {} parameter(s)", ctx.param_count()),
            });
        }

        let id = SetId::next();
        let name: Arc<str> = Arc::from(name);
        let columns = output_refs(id, &name, &query.output_columns());
        Ok(Self(Arc::new(ViewDef {
            id,
            name,
            query,
            columns,
        })))
    }

    /// Returns the view name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the view's copy of a column or projection of its query.
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

    /// Renders `CREATE VIEW IF NOT EXISTS`.
    #[must_use]
    pub fn create_sql(&self, dialect: &dyn Dialect) -> String {
        let options = RenderOptions::with_dialect(dialect);
        let mut ctx = RenderCtx::new(&options);
        let mut sql = String::from("CREATE VIEW IF NOT EXISTS ");
        dialect.write_identifier(&mut sql, &self.0.name);
        sql.push_str(" AS ");
        self.0.query.render(&mut ctx, &mut sql);
        sql
    }

    /// Renders `DROP VIEW IF EXISTS`.
    #[must_use]
    pub fn drop_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = String::from("DROP VIEW IF EXISTS ");
        dialect.write_identifier(&mut sql, &self.0.name);
        sql
    }
}

impl ColumnSet for View {
    fn set_id(&self) -> SetId {
        self.0.id
    }

    fn set_name(&self) -> &str {
        &self.0.name
    }

    fn column_refs(&self) -> &[ColumnRef] {
        &self.0.columns
    }
}
