//! Table creation ordering.

use std::collections::{BTreeSet, HashMap};

use super::{SetId, Table};
use crate::error::SchemaError;

/// Orders tables so that every referenced table precedes the tables that
/// reference it.
///
/// Uses Kahn's algorithm; among tables that are ready at the same time the
/// one declared first wins. Self references and references to tables outside
/// `tables` are ignored.
///
/// # Errors
///
/// [`SchemaError::DuplicateTable`] when two tables share a name and
/// [`SchemaError::ForeignKeyCycle`] naming the tables on a reference cycle.
pub fn creation_order(tables: &[Table]) -> Result<Vec<Table>, SchemaError> {
    for (i, table) in tables.iter().enumerate() {
        if tables[..i]
            .iter()
            .any(|t| t.name().eq_ignore_ascii_case(table.name()))
        {
            return Err(SchemaError::DuplicateTable(table.name().to_owned()));
        }
    }

    let index: HashMap<SetId, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id(), i))
        .collect();

    // dependencies[i] = tables i references; dependents[j] = tables referencing j
    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tables.len()];
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tables.len()];
    for (i, table) in tables.iter().enumerate() {
        for target in table.referenced_tables() {
            if let Some(&j) = index.get(&target) {
                dependencies[i].insert(j);
                dependents[j].insert(i);
            }
        }
    }

    let mut in_degree: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
    let mut ready: BTreeSet<usize> = (0..tables.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(tables.len());

    while let Some(next) = ready.pop_first() {
        order.push(tables[next].clone());
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == tables.len() {
        return Ok(order);
    }

    // Peel off tables that only hang off a cycle without being part of one.
    let mut remaining: BTreeSet<usize> = (0..tables.len()).filter(|&i| in_degree[i] > 0).collect();
    loop {
        let leaf = remaining
            .iter()
            .copied()
            .find(|&i| dependents[i].iter().all(|d| !remaining.contains(d)));
        match leaf {
            Some(i) => {
                remaining.remove(&i);
            }
            None => break,
        }
    }

    Err(SchemaError::ForeignKeyCycle {
        tables: remaining
            .into_iter()
            .map(|i| tables[i].name().to_owned())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, TableBuilder};
    use crate::types::{Int64, Text};

    fn table_with_id(name: &str) -> (TableBuilder, Column<Int64>) {
        let mut builder = Table::builder(name);
        let id = builder.column("id", Int64).primary_key().add().unwrap();
        (builder, id)
    }

    fn names(tables: &[Table]) -> Vec<&str> {
        tables.iter().map(Table::name).collect()
    }

    #[test]
    fn test_referenced_table_comes_first() {
        let (mut artist, artist_id) = table_with_id("Artist");
        artist.column("name", Text).unique().add().unwrap();
        let artist = artist.build().unwrap();

        let (mut album, _) = table_with_id("Album");
        album
            .column("artist_id", Int64)
            .references(&artist_id)
            .add()
            .unwrap();
        let album = album.build().unwrap();

        let order = creation_order(&[album, artist]).unwrap();
        assert_eq!(names(&order), ["Artist", "Album"]);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let (a, _) = table_with_id("A");
        let (b, _) = table_with_id("B");
        let (c, _) = table_with_id("C");
        let tables = [c.build().unwrap(), a.build().unwrap(), b.build().unwrap()];
        assert_eq!(names(&creation_order(&tables).unwrap()), ["C", "A", "B"]);
    }

    #[test]
    fn test_self_and_external_references_ignored() {
        let (external, external_id) = table_with_id("External");
        let _external = external.build().unwrap();

        let (mut node, node_id) = table_with_id("Node");
        node.column("parent", Int64).references(&node_id).add().unwrap();
        node.column("ext", Int64).references(&external_id).add().unwrap();
        let node = node.build().unwrap();

        assert_eq!(names(&creation_order(&[node]).unwrap()), ["Node"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let (mut a, a_id) = table_with_id("A");
        let (mut b, b_id) = table_with_id("B");
        a.column("b_id", Int64).references(&b_id).add().unwrap();
        b.column("a_id", Int64).references(&a_id).add().unwrap();
        let (mut c, _) = table_with_id("C");
        c.column("a_id", Int64).references(&a_id).add().unwrap();

        let tables = [a.build().unwrap(), b.build().unwrap(), c.build().unwrap()];
        assert_eq!(
            creation_order(&tables),
            Err(SchemaError::ForeignKeyCycle {
                tables: vec![String::from("A"), String::from("B")],
            })
        );
    }

    #[test]
    fn test_duplicate_table_names() {
        let (a, _) = table_with_id("Same");
        let (b, _) = table_with_id("same");
        assert_eq!(
            creation_order(&[a.build().unwrap(), b.build().unwrap()]),
            Err(SchemaError::DuplicateTable(String::from("same")))
        );
    }
}
