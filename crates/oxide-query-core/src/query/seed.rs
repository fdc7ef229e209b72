//! Rendered statements.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::exec::Arguments;
use crate::expr::ParamId;
use crate::render::ParamSpec;
use crate::schema::{ColumnKey, SetId};
use crate::types::{Int64, PersistentType, TypeRef};

/// One result column of a rendered query.
#[derive(Debug, Clone)]
pub struct OutputColumn {
    name: Arc<str>,
    ty: TypeRef,
    key: ColumnKey,
    lineage: Vec<ColumnKey>,
}

impl OutputColumn {
    pub(crate) const fn new(
        name: Arc<str>,
        ty: TypeRef,
        key: ColumnKey,
        lineage: Vec<ColumnKey>,
    ) -> Self {
        Self {
            name,
            ty,
            key,
            lineage,
        }
    }

    /// Returns the column name as reported by the engine.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) const fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Returns the descriptor of the selected expression.
    #[must_use]
    pub const fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Returns the identity of the selected column or projection.
    #[must_use]
    pub const fn key(&self) -> &ColumnKey {
        &self.key
    }

    /// Returns the keys the selected column was derived from, nearest first.
    #[must_use]
    pub fn lineage(&self) -> &[ColumnKey] {
        &self.lineage
    }

    /// Returns whether this column is `key` or was derived from it.
    #[must_use]
    pub fn derives_from(&self, key: &ColumnKey) -> bool {
        self.key == *key || self.lineage.contains(key)
    }
}

#[derive(Debug)]
struct SeedInner {
    sql: Arc<str>,
    params: Vec<ParamSpec>,
    positions: HashMap<ParamId, Vec<usize>>,
    columns: Vec<OutputColumn>,
}

/// A rendered statement: SQL text plus its parameter contract.
///
/// A seed is immutable and cheap to clone. The parameter list holds one
/// entry per `?` in the text, in order; placeholders created with
/// [`Param`](crate::expr::Param) map to every position they were rendered
/// at.
#[derive(Debug, Clone)]
pub struct Seed(Arc<SeedInner>);

impl Seed {
    pub(crate) fn new(
        sql: Arc<str>,
        params: Vec<ParamSpec>,
        positions: HashMap<ParamId, Vec<usize>>,
        columns: Vec<OutputColumn>,
    ) -> Self {
        debug!(sql = %sql, params = params.len(), "rendered seed");
        Self(Arc::new(SeedInner {
            sql,
            params,
            positions,
            columns,
        }))
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.0.sql
    }

    pub(crate) fn sql_arc(&self) -> &Arc<str> {
        &self.0.sql
    }

    /// Returns the parameter slots in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.0.params
    }

    /// Returns the positions a placeholder was rendered at; empty if the
    /// placeholder is not part of this seed.
    #[must_use]
    pub fn positions(&self, id: ParamId) -> &[usize] {
        self.0.positions.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the result columns; empty for statements.
    #[must_use]
    pub fn columns(&self) -> &[OutputColumn] {
        &self.0.columns
    }

    /// Copies the parameter contract and result columns under new SQL text.
    ///
    /// The caller keeps the placeholders of the new text in the same order.
    #[must_use]
    pub fn with_sql(&self, sql: impl Into<Arc<str>>) -> Self {
        Self::new(
            sql.into(),
            self.0.params.clone(),
            self.0.positions.clone(),
            self.0.columns.clone(),
        )
    }

    /// Wraps the query in `SELECT COUNT(*) FROM (...)`.
    ///
    /// The count is the only result column; read it with
    /// [`ResultRow::get_at`](crate::exec::ResultRow::get_at).
    #[must_use]
    pub fn count_rows(&self) -> Self {
        let count = OutputColumn::new(
            Arc::from("count"),
            Arc::new(PersistentType::new(Int64)),
            ColumnKey::new(SetId::next(), "count"),
            Vec::new(),
        );
        Self::new(
            Arc::from(format!("SELECT COUNT(*) FROM ({})", self.0.sql)),
            self.0.params.clone(),
            self.0.positions.clone(),
            vec![count],
        )
    }

    /// Creates a fresh argument set for this seed.
    #[must_use]
    pub fn arguments(&self) -> Arguments {
        Arguments::new(self.clone())
    }

    /// Returns whether both seeds share SQL text and parameter contract.
    pub(crate) fn same_contract(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.sql == other.0.sql
                && self.0.params.len() == other.0.params.len()
                && self.0.params.iter().zip(&other.0.params).all(|(a, b)| {
                    a.ty().type_name() == b.ty().type_name()
                        && a.ty().storage() == b.ty().storage()
                        && a.ty().is_nullable() == b.ty().is_nullable()
                }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Param;
    use crate::query::Select;
    use crate::schema::Table;
    use crate::types::{Int64, Text};

    #[test]
    fn test_with_sql_keeps_contract() {
        let mut t = Table::builder("T");
        let name = t.column("name", Text).add().unwrap();
        let table = t.build().unwrap();
        let p = Param::new(Text);
        let seed = Select::new()
            .from(&table)
            .column(&name)
            .where_clause(name.eq(&p).or(name.like(&p)))
            .build()
            .unwrap();
        assert_eq!(seed.positions(p.id()), &[0, 1]);

        let copy = seed.with_sql("SELECT name FROM T WHERE name = ? OR name LIKE ?");
        assert_eq!(copy.params().len(), 2);
        assert_eq!(copy.positions(p.id()), &[0, 1]);
        assert_eq!(copy.columns().len(), 1);
        assert!(!copy.same_contract(&seed));
        assert!(seed.same_contract(&seed.clone()));
    }

    #[test]
    fn test_contract_compares_slot_types() {
        let mut t = Table::builder("T");
        let name = t.column("name", Text).not_null().add().unwrap();
        let text_table = t.build().unwrap();
        let text = Select::new()
            .from(&text_table)
            .where_clause(name.eq(&Param::new(Text)))
            .build()
            .unwrap();

        let mut t = Table::builder("T");
        let name = t.column("name", Int64).not_null().add().unwrap();
        let int_table = t.build().unwrap();
        let int = Select::new()
            .from(&int_table)
            .where_clause(name.eq(&Param::new(Int64)))
            .build()
            .unwrap();

        assert_eq!(text.sql(), int.sql());
        assert!(!text.same_contract(&int));
        assert!(text.same_contract(&text.with_sql(text.sql())));
    }

    #[test]
    fn test_count_rows() {
        let mut t = Table::builder("T");
        let name = t.column("name", Text).add().unwrap();
        let table = t.build().unwrap();
        let seed = Select::new()
            .from(&table)
            .column(&name)
            .where_clause(name.eq("x"))
            .build()
            .unwrap();
        let count = seed.count_rows();
        assert_eq!(
            count.sql(),
            "SELECT COUNT(*) FROM (SELECT T.name FROM T WHERE T.name = ?)"
        );
        assert_eq!(count.params().len(), 1);
        assert_eq!(count.columns()[0].name(), "count");
        assert_eq!(seed.positions(Param::new(Text).id()), &[] as &[usize]);
    }
}
