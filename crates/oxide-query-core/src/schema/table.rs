//! Table definitions and `CREATE TABLE` rendering.

use std::fmt::Write as _;
use std::sync::Arc;

use super::{Column, ColumnKey, ColumnRef, Constraints, ForeignKey, ForeignKeyAction, SetId};
use crate::dialect::{validate_identifier, Dialect};
use crate::error::SchemaError;
use crate::expr::{BindExpr, CompareOp, Expr, Predicate};
use crate::source::ColumnSet;
use crate::types::{CompositeKind, PersistentType, TypeRef, ValueKind};
use crate::value::SqlValue;

#[derive(Debug)]
struct TableDef {
    id: SetId,
    name: Arc<str>,
    columns: Vec<ColumnRef>,
}

/// A table: a named, ordered set of columns.
///
/// # Example
///
/// ```rust
/// use oxide_query_core::schema::Table;
/// use oxide_query_core::types::{Int64, Text};
///
/// # fn main() -> Result<(), oxide_query_core::SchemaError> {
/// let mut artist = Table::builder("Artist");
/// let id = artist.column("id", Int64).primary_key().add()?;
/// let name = artist.column("name", Text).not_null().unique().add()?;
/// let artist = artist.build()?;
///
/// assert_eq!(artist.columns().len(), 2);
/// assert_eq!(name.to_string(), "Artist.name");
/// # let _ = id;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Table(Arc<TableDef>);

impl Table {
    /// Starts a table definition.
    #[must_use]
    pub fn builder(name: &str) -> TableBuilder {
        TableBuilder {
            id: SetId::next(),
            name: Arc::from(name),
            columns: Vec::new(),
        }
    }

    /// Returns the table identity.
    #[must_use]
    pub fn id(&self) -> SetId {
        self.0.id
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnRef] {
        &self.0.columns
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<&ColumnRef> {
        self.0.columns.iter().find(|c| c.name() == name)
    }

    /// Returns the tables this table references, excluding itself.
    pub(crate) fn referenced_tables(&self) -> impl Iterator<Item = SetId> + '_ {
        self.0
            .columns
            .iter()
            .filter_map(|c| c.constraints().foreign_key.as_ref())
            .map(ForeignKey::table_id)
            .filter(move |id| *id != self.0.id)
    }

    /// Renders `CREATE TABLE IF NOT EXISTS`.
    #[must_use]
    pub fn create_sql(&self, dialect: &dyn Dialect) -> String {
        let primary_key: Vec<&ColumnRef> = self
            .0
            .columns
            .iter()
            .filter(|c| c.constraints().primary_key)
            .collect();
        let inline_pk = primary_key.len() == 1;

        let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
        dialect.write_identifier(&mut sql, &self.0.name);
        sql.push_str(" (");
        for (i, column) in self.0.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            write_column(&mut sql, dialect, column, inline_pk);
        }
        if !inline_pk && !primary_key.is_empty() {
            sql.push_str(", PRIMARY KEY (");
            for (i, column) in primary_key.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                dialect.write_identifier(&mut sql, column.name());
            }
            sql.push(')');
        }
        sql.push(')');
        sql
    }

    /// Renders `DROP TABLE IF EXISTS`.
    #[must_use]
    pub fn drop_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = String::from("DROP TABLE IF EXISTS ");
        dialect.write_identifier(&mut sql, &self.0.name);
        sql
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Table {}

fn write_column(sql: &mut String, dialect: &dyn Dialect, column: &ColumnRef, inline_pk: bool) {
    let constraints = column.constraints();
    dialect.write_identifier(sql, column.name());
    sql.push(' ');
    sql.push_str(column.ty().declared_type());
    if inline_pk && constraints.primary_key {
        sql.push_str(" PRIMARY KEY");
        if constraints.auto_increment {
            sql.push_str(" AUTOINCREMENT");
        }
    } else if !column.ty().is_nullable() {
        sql.push_str(" NOT NULL");
    }
    if constraints.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = &constraints.default {
        let _ = write!(sql, " DEFAULT {}", default.to_sql_inline());
    }
    if let Some(fk) = &constraints.foreign_key {
        sql.push_str(" REFERENCES ");
        dialect.write_identifier(sql, &fk.table);
        sql.push_str(" (");
        dialect.write_identifier(sql, &fk.column);
        sql.push(')');
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
    }
}

impl ColumnSet for Table {
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

/// Builder for a [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    id: SetId,
    name: Arc<str>,
    columns: Vec<ColumnRef>,
}

impl TableBuilder {
    /// Starts a column definition. Columns are nullable unless marked
    /// otherwise.
    pub fn column<K: ValueKind>(&mut self, name: &str, kind: K) -> ColumnDef<'_, K> {
        ColumnDef {
            builder: self,
            name: name.to_owned(),
            kind,
            nullable: true,
            constraints: Constraints::default(),
            default: None,
            error: None,
        }
    }

    /// Starts a composite column definition.
    pub fn composite<C: CompositeKind>(&mut self, name: &str, kind: C) -> CompositeDef<'_, C> {
        CompositeDef {
            builder: self,
            name: name.to_owned(),
            kind,
            nullable: true,
        }
    }

    fn check_name(&self, name: &str) -> Result<(), SchemaError> {
        validate_identifier(name)?;
        if self
            .columns
            .iter()
            .any(|c| c.name().eq_ignore_ascii_case(name))
        {
            return Err(SchemaError::DuplicateColumn {
                set: self.name.to_string(),
                column: name.to_owned(),
            });
        }
        Ok(())
    }

    fn push(&mut self, name: &str, ty: TypeRef, constraints: Constraints) -> ColumnRef {
        let column = ColumnRef::new(
            ColumnKey::new(self.id, name),
            Arc::clone(&self.name),
            ty,
            constraints,
        );
        self.columns.push(column.clone());
        column
    }

    /// Finishes the table.
    pub fn build(self) -> Result<Table, SchemaError> {
        validate_identifier(&self.name)?;
        if self.columns.is_empty() {
            return Err(SchemaError::EmptyTable(self.name.to_string()));
        }
        Ok(Table(Arc::new(TableDef {
            id: self.id,
            name: self.name,
            columns: self.columns,
        })))
    }
}

/// Fluent definition of one column.
#[derive(Debug)]
pub struct ColumnDef<'b, K: ValueKind> {
    builder: &'b mut TableBuilder,
    name: String,
    kind: K,
    nullable: bool,
    constraints: Constraints,
    default: Option<K::Value>,
    error: Option<SchemaError>,
}

impl<K: ValueKind> ColumnDef<'_, K> {
    /// Makes the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Makes the column nullable (the default).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds the column to the primary key. Implies NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.constraints.primary_key = true;
        self.nullable = false;
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.constraints.unique = true;
        self
    }

    /// Marks the column as auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.constraints.auto_increment = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: K::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// References a table column.
    #[must_use]
    pub fn references<R: ValueKind>(mut self, target: &Column<R>) -> Self {
        let target = target.column_ref();
        if target.is_table_column() {
            self.constraints.foreign_key = Some(ForeignKey {
                table: Arc::from(target.qualifier()),
                column: Arc::from(target.name()),
                on_delete: None,
                on_update: None,
                table_id: target.key().set(),
            });
        } else {
            self.error = Some(SchemaError::InvalidReference(target.to_string()));
        }
        self
    }

    /// Sets the foreign key's `ON DELETE` action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Some(fk) = &mut self.constraints.foreign_key {
            fk.on_delete = Some(action);
        }
        self
    }

    /// Sets the foreign key's `ON UPDATE` action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let Some(fk) = &mut self.constraints.foreign_key {
            fk.on_update = Some(action);
        }
        self
    }

    /// Adds the column to the table.
    pub fn add(self) -> Result<Column<K>, SchemaError> {
        let Self {
            builder,
            name,
            kind,
            nullable,
            mut constraints,
            default,
            error,
        } = self;
        if let Some(error) = error {
            return Err(error);
        }
        builder.check_name(&name)?;
        let ty = Arc::new(PersistentType::new(kind).with_nullable(nullable));
        if let Some(value) = default {
            let stored = ty
                .bind_value(Some(&value))
                .map_err(|e| SchemaError::InvalidDefault {
                    column: name.clone(),
                    reason: e.to_string(),
                })?;
            if matches!(stored, SqlValue::Real(f) if f.is_nan()) {
                return Err(SchemaError::InvalidDefault {
                    column: name,
                    reason: String::from("NaN has no SQL literal"),
                });
            }
            constraints.default = Some(stored);
        }
        let column = builder.push(&name, Arc::clone(&ty) as TypeRef, constraints);
        Ok(Column::from_ref(column, ty))
    }
}

/// Fluent definition of a composite column.
#[derive(Debug)]
pub struct CompositeDef<'b, C: CompositeKind> {
    builder: &'b mut TableBuilder,
    name: String,
    kind: C,
    nullable: bool,
}

impl<C: CompositeKind> CompositeDef<'_, C> {
    /// Makes every component NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Makes every component nullable (the default).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds one column per component, named `<name>_<suffix>`.
    pub fn add(self) -> Result<CompositeColumn<C>, SchemaError> {
        let Self {
            builder,
            name,
            kind,
            nullable,
        } = self;
        let components = kind.components(nullable);
        let names: Vec<String> = components
            .iter()
            .map(|(suffix, _)| format!("{name}_{suffix}"))
            .collect();
        for part in &names {
            builder.check_name(part)?;
        }
        let parts = names
            .iter()
            .zip(components)
            .map(|(part, (_, ty))| builder.push(part, ty, Constraints::default()))
            .collect();
        Ok(CompositeColumn {
            kind,
            name: Arc::from(name),
            nullable,
            parts,
        })
    }
}

/// A value stored across several columns.
#[derive(Debug, Clone)]
pub struct CompositeColumn<C: CompositeKind> {
    kind: C,
    name: Arc<str>,
    nullable: bool,
    parts: Vec<ColumnRef>,
}

impl<C: CompositeKind> CompositeColumn<C> {
    /// Returns the logical column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the composite kind.
    #[must_use]
    pub const fn kind(&self) -> &C {
        &self.kind
    }

    /// Returns whether the value can be NULL.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the component columns in storage order.
    #[must_use]
    pub fn parts(&self) -> &[ColumnRef] {
        &self.parts
    }

    /// Splits `value` into one preset bind per component.
    pub(crate) fn binds(&self, value: &C::Value) -> Vec<Expr> {
        let split = self.kind.split(value);
        self.parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let preset = match &split {
                    Ok(values) => Ok(values.get(i).cloned().unwrap_or(SqlValue::Null)),
                    Err(e) => Err(e.clone()),
                };
                Expr::Bind(BindExpr {
                    id: None,
                    ty: Arc::clone(part.ty()),
                    preset: Some(preset),
                })
            })
            .collect()
    }

    /// Joint equality over every component.
    #[must_use]
    pub fn eq(&self, value: &C::Value) -> Predicate {
        let comparisons = self
            .parts
            .iter()
            .zip(self.binds(value))
            .map(|(part, bind)| {
                Predicate::new(Expr::Compare {
                    op: CompareOp::Eq,
                    lhs: Box::new(Expr::Column(part.clone())),
                    rhs: Box::new(bind),
                })
            });
        Predicate::all(comparisons)
    }

    /// True when every component is NULL.
    #[must_use]
    pub fn is_null(&self) -> Predicate {
        Predicate::all(self.parts.iter().map(|part| {
            Predicate::new(Expr::IsNull {
                negated: false,
                expr: Box::new(Expr::Column(part.clone())),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;
    use crate::types::{Float64, Int64, OffsetTimestamp, Text};

    #[test]
    fn test_create_sql() {
        let mut artist = Table::builder("Artist");
        let artist_id = artist.column("id", Int64).primary_key().add().unwrap();
        artist.column("name", Text).not_null().unique().add().unwrap();
        let artist = artist.build().unwrap();
        assert_eq!(
            artist.create_sql(&GenericDialect),
            "CREATE TABLE IF NOT EXISTS Artist (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)"
        );

        let mut album = Table::builder("Album");
        album.column("id", Int64).primary_key().auto_increment().add().unwrap();
        album
            .column("artist_id", Int64)
            .references(&artist_id)
            .on_delete(ForeignKeyAction::Cascade)
            .add()
            .unwrap();
        album.column("rating", Int64).not_null().default_value(3).add().unwrap();
        let album = album.build().unwrap();
        assert_eq!(
            album.create_sql(&GenericDialect),
            "CREATE TABLE IF NOT EXISTS Album (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             artist_id INTEGER REFERENCES Artist (id) ON DELETE CASCADE, \
             rating INTEGER NOT NULL DEFAULT 3)"
        );
        assert_eq!(album.referenced_tables().collect::<Vec<_>>(), vec![artist.id()]);
    }

    #[test]
    fn test_table_level_primary_key_and_quoting() {
        let mut t = Table::builder("order");
        t.column("a", Int64).primary_key().add().unwrap();
        t.column("group", Text).primary_key().add().unwrap();
        let t = t.build().unwrap();
        assert_eq!(
            t.create_sql(&GenericDialect),
            "CREATE TABLE IF NOT EXISTS \"order\" (a INTEGER NOT NULL, \"group\" TEXT NOT NULL, \
             PRIMARY KEY (a, \"group\"))"
        );
        assert_eq!(t.drop_sql(&GenericDialect), "DROP TABLE IF EXISTS \"order\"");
    }

    #[test]
    fn test_configuration_errors() {
        let mut t = Table::builder("T");
        t.column("a", Int64).add().unwrap();
        assert_eq!(
            t.column("A", Text).add().unwrap_err(),
            SchemaError::DuplicateColumn {
                set: String::from("T"),
                column: String::from("A"),
            }
        );
        assert!(matches!(
            t.column("bad name", Text).add(),
            Err(SchemaError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Table::builder("Empty").build(),
            Err(SchemaError::EmptyTable(_))
        ));
        assert!(matches!(
            Table::builder("9lives").build(),
            Err(SchemaError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            t.column("ratio", Float64).default_value(f64::NAN).add(),
            Err(SchemaError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_infinite_default_renders_as_overflow_literal() {
        let mut t = Table::builder("Limits");
        t.column("ceiling", Float64)
            .not_null()
            .default_value(f64::INFINITY)
            .add()
            .unwrap();
        let t = t.build().unwrap();
        assert_eq!(
            t.create_sql(&GenericDialect),
            "CREATE TABLE IF NOT EXISTS Limits (ceiling REAL NOT NULL DEFAULT 9e999)"
        );
    }

    #[test]
    fn test_composite_columns() {
        let mut t = Table::builder("Event");
        let at = t.composite("at", OffsetTimestamp).not_null().add().unwrap();
        let t = t.build().unwrap();
        let names: Vec<&str> = t.columns().iter().map(ColumnRef::name).collect();
        assert_eq!(names, ["at_utc_ms", "at_offset_s"]);
        assert_eq!(at.parts().len(), 2);
        assert!(!at.parts()[0].ty().is_nullable());
    }
}
