use std::sync::Arc;

use super::{ColumnSet, Source};
use crate::dialect::validate_identifier;
use crate::error::SchemaError;
use crate::expr::Selectable;
use crate::render::RenderCtx;
use crate::schema::{Column, ColumnRef, SetId};
use crate::types::ValueKind;

#[derive(Debug)]
struct AliasDef {
    id: SetId,
    name: Arc<str>,
    source: Source,
    columns: Vec<ColumnRef>,
}

/// A table, view or subquery under another name.
///
/// Every column of the wrapped set gets a clone qualified by the alias. The
/// clone converts values exactly like the original; [`Alias::column`] maps
/// an original column to its clone.
///
/// # Example
///
/// ```rust
/// use oxide_query_core::schema::Table;
/// use oxide_query_core::source::Alias;
/// use oxide_query_core::types::Text;
///
/// # fn main() -> Result<(), oxide_query_core::SchemaError> {
/// let mut person = Table::builder("Person");
/// let name = person.column("name", Text).add()?;
/// let person = person.build()?;
///
/// let p = Alias::new(&person, "p")?;
/// assert_eq!(p.column(&name)?.to_string(), "p.name");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Alias(Arc<AliasDef>);

impl Alias {
    /// Wraps `source` under `name`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::InvalidIdentifier`] for a bad name and
    /// [`SchemaError::InvalidAlias`] for joins and aliases, which cannot be
    /// renamed.
    pub fn new(source: impl Into<Source>, name: &str) -> Result<Self, SchemaError> {
        validate_identifier(name)?;
        let source = source.into();
        if matches!(source, Source::Join(_) | Source::Alias(_)) {
            return Err(SchemaError::InvalidAlias(source.set_name().to_owned()));
        }
        let id = SetId::next();
        let name: Arc<str> = Arc::from(name);
        let columns = source
            .column_refs()
            .iter()
            .map(|c| c.derive(id, &name))
            .collect();
        Ok(Self(Arc::new(AliasDef {
            id,
            name,
            source,
            columns,
        })))
    }

    /// Returns the alias name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the aliased source.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.0.source
    }

    /// Returns the clone of `target` exposed by this alias.
    ///
    /// # Errors
    ///
    /// [`SchemaError::ColumnNotInSet`] when `target` is not a column of the
    /// aliased source.
    pub fn column<K: ValueKind, S: Selectable<K>>(
        &self,
        target: &S,
    ) -> Result<Column<K>, SchemaError> {
        self.resolve(target)
    }

    pub(super) fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        self.0.source.render(ctx, out);
        out.push_str(" AS ");
        ctx.identifier(out, &self.0.name);
    }
}

impl ColumnSet for Alias {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderOptions;
    use crate::schema::Table;
    use crate::source::Join;
    use crate::types::{Int64, Text};

    fn person() -> (Table, Column<Int64>, Column<Text>) {
        let mut t = Table::builder("Person");
        let id = t.column("id", Int64).primary_key().add().unwrap();
        let name = t.column("name", Text).add().unwrap();
        (t.build().unwrap(), id, name)
    }

    #[test]
    fn test_alias_clones_columns() {
        let (person, id, name) = person();
        let p = Alias::new(&person, "p").unwrap();
        let p_name = p.column(&name).unwrap();

        assert_eq!(p_name.to_string(), "p.name");
        assert_ne!(p_name.key(), name.key());
        assert_eq!(p_name.column_ref().origins(), std::slice::from_ref(name.key()));
        assert_eq!(p.column_refs().len(), 2);
        // Resolving a clone returns the clone itself.
        assert_eq!(p.column(&p_name).unwrap().key(), p_name.key());
        assert!(!p.contains(id.key()));
    }

    #[test]
    fn test_foreign_column_is_rejected() {
        let (person, _, _) = person();
        let mut other = Table::builder("Other");
        let stray = other.column("name", Text).add().unwrap();
        let p = Alias::new(&person, "p").unwrap();
        assert_eq!(
            p.column(&stray).unwrap_err(),
            SchemaError::ColumnNotInSet {
                column: String::from("Other.name"),
                set: String::from("p"),
            }
        );
    }

    #[test]
    fn test_alias_rejects_joins_and_aliases() {
        let (person, _, _) = person();
        let p = Alias::new(&person, "p").unwrap();
        assert!(matches!(
            Alias::new(p.clone(), "q"),
            Err(SchemaError::InvalidAlias(_))
        ));
        let join = Join::cross(&person, &p);
        assert!(matches!(
            Alias::new(join, "j"),
            Err(SchemaError::InvalidAlias(_))
        ));
        assert!(matches!(
            Alias::new(&person, "p q"),
            Err(SchemaError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_alias_renders_with_as() {
        let (person, _, _) = person();
        let p = Alias::new(&person, "p").unwrap();
        let options = RenderOptions::default();
        let mut ctx = RenderCtx::new(&options);
        let mut out = String::new();
        p.render(&mut ctx, &mut out);
        assert_eq!(out, "Person AS p");
    }
}
