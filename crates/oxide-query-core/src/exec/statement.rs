//! Compiled statements and typed result rows.

use std::sync::Arc;

use parking_lot::FairMutex;
use tracing::{debug, warn};

use super::{Arguments, Execution, Prepared, Row};
use crate::error::{ConversionError, EngineError, Error, Result};
use crate::expr::Selectable;
use crate::query::Seed;
use crate::schema::{ColumnKey, CompositeColumn};
use crate::types::{CompositeKind, PersistentType, ValueKind};
use crate::value::{SqlValue, ValueRef};

/// A seed compiled by an engine, reusable with any number of argument sets.
///
/// The engine handle is guarded by a fair mutex: executions from several
/// threads are serialized in arrival order, each binding and running with
/// its own arguments.
pub struct Statement<P> {
    seed: Seed,
    handle: FairMutex<P>,
}

impl<P: Prepared> Statement<P> {
    /// Wraps an engine handle compiled from `seed`.
    pub fn new(seed: Seed, prepared: P) -> Self {
        Self {
            seed,
            handle: FairMutex::new(prepared),
        }
    }

    /// Returns the seed the statement was compiled from.
    #[must_use]
    pub const fn seed(&self) -> &Seed {
        &self.seed
    }

    /// Creates a fresh argument set for this statement.
    #[must_use]
    pub fn arguments(&self) -> Arguments {
        self.seed.arguments()
    }

    fn check(&self, args: &Arguments) -> Result<Vec<SqlValue>> {
        if !self.seed.same_contract(args.seed()) {
            return Err(Error::SeedMismatch {
                sql: Arc::clone(self.seed.sql_arc()),
                found: Arc::clone(args.seed().sql_arc()),
            });
        }
        args.values()
    }

    fn failed(&self, values: Vec<SqlValue>, source: EngineError) -> Error {
        warn!(sql = %self.seed.sql(), error = %source, "statement failed");
        Error::Execution {
            sql: Arc::clone(self.seed.sql_arc()),
            args: values,
            source,
        }
    }

    fn bind_all(handle: &mut P, values: &[SqlValue]) -> Result<(), EngineError> {
        for (index, value) in values.iter().enumerate() {
            handle.bind(index, value)?;
        }
        Ok(())
    }

    /// Runs a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// [`Error::SeedMismatch`] or [`Error::Unbound`] when the arguments are
    /// not usable, [`Error::Execution`] when the engine fails.
    pub fn execute(&self, args: &Arguments) -> Result<Execution> {
        let values = self.check(args)?;
        let mut handle = self.handle.lock();
        debug!(sql = %self.seed.sql(), params = values.len(), "executing statement");
        match Self::bind_all(&mut handle, &values).and_then(|()| handle.execute()) {
            Ok(execution) => Ok(execution),
            Err(source) => Err(self.failed(values, source)),
        }
    }

    /// Runs a query, calling `visit` for each row until it returns `false`.
    ///
    /// # Errors
    ///
    /// As [`Statement::execute`], or the first error `visit` returns.
    pub fn query<F>(&self, args: &Arguments, mut visit: F) -> Result<()>
    where
        F: FnMut(&ResultRow<'_>) -> Result<bool>,
    {
        let values = self.check(args)?;
        let mut handle = self.handle.lock();
        debug!(sql = %self.seed.sql(), params = values.len(), "running query");
        if let Err(source) = Self::bind_all(&mut handle, &values) {
            return Err(self.failed(values, source));
        }
        let seed = &self.seed;
        let outcome = handle.query(&mut |row: &dyn Row| visit(&ResultRow { row, seed }));
        match outcome {
            Err(Error::Engine(source)) => Err(self.failed(values, source)),
            other => other,
        }
    }

    /// Maps the first row, if any.
    ///
    /// # Errors
    ///
    /// As [`Statement::query`].
    pub fn query_row<T, F>(&self, args: &Arguments, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&ResultRow<'_>) -> Result<T>,
    {
        let mut f = Some(f);
        let mut out = None;
        self.query(args, |row| {
            if let Some(f) = f.take() {
                out = Some(f(row)?);
            }
            Ok(false)
        })?;
        Ok(out)
    }

    /// Maps every row.
    ///
    /// # Errors
    ///
    /// As [`Statement::query`].
    pub fn query_map<T, F>(&self, args: &Arguments, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&ResultRow<'_>) -> Result<T>,
    {
        let mut out = Vec::new();
        self.query(args, |row| {
            out.push(f(row)?);
            Ok(true)
        })?;
        Ok(out)
    }
}

impl<P> std::fmt::Debug for Statement<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.seed.sql())
            .finish_non_exhaustive()
    }
}

/// One result row, read through the seed's result columns.
pub struct ResultRow<'r> {
    row: &'r dyn Row,
    seed: &'r Seed,
}

impl<'r> ResultRow<'r> {
    /// Pairs a raw engine row with the seed it was produced by.
    pub fn new(row: &'r dyn Row, seed: &'r Seed) -> Self {
        Self { row, seed }
    }

    /// Returns the raw storage value at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::Engine`] when the engine cannot produce the value.
    pub fn raw(&self, index: usize) -> Result<ValueRef<'_>> {
        Ok(self.row.value(index)?)
    }

    fn index_of(&self, key: &ColumnKey) -> Option<usize> {
        let columns = self.seed.columns();
        columns
            .iter()
            .position(|c| c.key() == key)
            .or_else(|| columns.iter().position(|c| c.derives_from(key)))
    }

    fn locate<K: ValueKind, S: Selectable<K>>(&self, target: &S) -> Result<usize> {
        self.index_of(target.result_key())
            .ok_or_else(|| Error::NotInResult {
                column: target.display_name(),
                sql: Arc::clone(self.seed.sql_arc()),
            })
    }

    fn column_name(&self, index: usize) -> String {
        self.seed
            .columns()
            .get(index)
            .map(|c| c.name().to_owned())
            .or_else(|| self.row.column_name(index).map(str::to_owned))
            .unwrap_or_else(|| index.to_string())
    }

    fn decode_error(&self, index: usize, source: ConversionError) -> Error {
        Error::Decode {
            column: self.column_name(index),
            sql: Arc::clone(self.seed.sql_arc()),
            source,
        }
    }

    /// Reads a selected column, projection or subquery column.
    ///
    /// The target is matched by identity, so a column read through an alias
    /// or a subquery is found under its original handle too.
    ///
    /// # Errors
    ///
    /// [`Error::NotInResult`] when the target was not selected and
    /// [`Error::Decode`] when the stored value does not fit its descriptor.
    pub fn get<K: ValueKind, S: Selectable<K>>(&self, target: &S) -> Result<Option<K::Value>> {
        let index = self.locate(target)?;
        self.get_at(index, target.descriptor())
    }

    /// Reads a selected column, returning `default` for NULL.
    ///
    /// # Errors
    ///
    /// As [`ResultRow::get`].
    pub fn get_or<K: ValueKind, S: Selectable<K>>(
        &self,
        target: &S,
        default: K::Value,
    ) -> Result<K::Value> {
        let index = self.locate(target)?;
        let raw = self.row.value(index)?;
        if raw.is_null() {
            return Ok(default);
        }
        target
            .descriptor()
            .kind()
            .decode(raw)
            .map_err(|source| self.decode_error(index, source))
    }

    /// Reads the column at `index` through an explicit descriptor.
    ///
    /// # Errors
    ///
    /// [`Error::Engine`] for an index the row does not have and
    /// [`Error::Decode`] when the value does not fit `ty`.
    pub fn get_at<K: ValueKind>(
        &self,
        index: usize,
        ty: &PersistentType<K>,
    ) -> Result<Option<K::Value>> {
        let raw = self.row.value(index)?;
        ty.read(raw).map_err(|source| self.decode_error(index, source))
    }

    /// Reads a value stored across several selected columns.
    ///
    /// # Errors
    ///
    /// [`Error::NotInResult`] when a component was not selected and
    /// [`Error::Decode`] when the components cannot be joined.
    pub fn get_composite<C: CompositeKind>(
        &self,
        column: &CompositeColumn<C>,
    ) -> Result<Option<C::Value>> {
        let mut indexes = Vec::with_capacity(column.parts().len());
        for part in column.parts() {
            let index = self.index_of(part.key()).ok_or_else(|| Error::NotInResult {
                column: part.to_string(),
                sql: Arc::clone(self.seed.sql_arc()),
            })?;
            indexes.push(index);
        }
        let mut parts = Vec::with_capacity(indexes.len());
        for &index in &indexes {
            parts.push(self.row.value(index)?);
        }
        let first = indexes.first().copied().unwrap_or_default();
        if parts.iter().all(ValueRef::is_null) {
            if column.is_nullable() {
                return Ok(None);
            }
            return Err(self.decode_error(
                first,
                ConversionError::UnexpectedNull {
                    target: column.kind().name(),
                },
            ));
        }
        column
            .kind()
            .join(&parts)
            .map(Some)
            .map_err(|source| self.decode_error(first, source))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::query::Select;
    use crate::schema::Table;
    use crate::types::{Int64, OffsetTimestamp, Text};

    struct MockRow<'a> {
        names: &'a [&'static str],
        values: &'a [SqlValue],
    }

    impl Row for MockRow<'_> {
        fn column_count(&self) -> usize {
            self.values.len()
        }

        fn column_name(&self, index: usize) -> Option<&str> {
            self.names.get(index).copied()
        }

        fn value(&self, index: usize) -> Result<ValueRef<'_>, EngineError> {
            self.values
                .get(index)
                .map(SqlValue::as_value_ref)
                .ok_or_else(|| EngineError::new(format!("no column {index}")))
        }
    }

    #[derive(Default)]
    struct MockPrepared {
        names: Vec<&'static str>,
        rows: Vec<Vec<SqlValue>>,
        bound: Vec<SqlValue>,
        log: Vec<Vec<SqlValue>>,
        fail: bool,
    }

    impl Prepared for MockPrepared {
        fn bind(&mut self, index: usize, value: &SqlValue) -> Result<(), EngineError> {
            if self.bound.len() <= index {
                self.bound.resize(index + 1, SqlValue::Null);
            }
            self.bound[index] = value.clone();
            Ok(())
        }

        fn execute(&mut self) -> Result<Execution, EngineError> {
            if self.fail {
                return Err(EngineError::new("constraint failed").with_code(19));
            }
            self.log.push(std::mem::take(&mut self.bound));
            Ok(Execution {
                rows_affected: 1,
                last_insert_id: Some(i64::try_from(self.log.len()).unwrap_or_default()),
            })
        }

        fn query(&mut self, visit: &mut dyn FnMut(&dyn Row) -> Result<bool>) -> Result<()> {
            if self.fail {
                return Err(EngineError::new("no such table").into());
            }
            for values in &self.rows {
                let row = MockRow {
                    names: &self.names,
                    values,
                };
                if !visit(&row)? {
                    break;
                }
            }
            Ok(())
        }
    }

    struct Fixture {
        id: crate::schema::Column<Int64>,
        name: crate::schema::Column<Text>,
        seed: Seed,
    }

    fn fixture() -> Fixture {
        let mut t = Table::builder("Artist");
        let id = t.column("id", Int64).primary_key().add().unwrap();
        let name = t.column("name", Text).add().unwrap();
        let table = t.build().unwrap();
        let seed = Select::new()
            .from(&table)
            .column(&id)
            .column(&name)
            .where_clause(id.gt(id.param()))
            .build()
            .unwrap();
        Fixture { id, name, seed }
    }

    fn rows() -> Vec<Vec<SqlValue>> {
        vec![
            vec![SqlValue::Integer(1), SqlValue::Text(String::from("Low"))],
            vec![SqlValue::Integer(2), SqlValue::Null],
        ]
    }

    #[test]
    fn test_query_decodes_by_handle() {
        let f = fixture();
        let statement = Statement::new(
            f.seed.clone(),
            MockPrepared {
                names: vec!["id", "name"],
                rows: rows(),
                ..MockPrepared::default()
            },
        );
        let mut args = statement.arguments();
        args.set(0, 0).unwrap();

        let names = statement
            .query_map(&args, |row| {
                Ok((row.get(&f.id)?, row.get_or(&f.name, String::from("?"))?))
            })
            .unwrap();
        assert_eq!(
            names,
            vec![(Some(1), String::from("Low")), (Some(2), String::from("?"))]
        );

        let first = statement
            .query_row(&args, |row| row.get(&f.name))
            .unwrap()
            .flatten();
        assert_eq!(first.as_deref(), Some("Low"));
    }

    #[test]
    fn test_unselected_and_undecodable_columns() {
        let f = fixture();
        let mut t = Table::builder("Other");
        let other = t.column("x", Int64).add().unwrap();
        let statement = Statement::new(
            f.seed.clone(),
            MockPrepared {
                names: vec!["id", "name"],
                rows: vec![vec![SqlValue::Text(String::from("one")), SqlValue::Null]],
                ..MockPrepared::default()
            },
        );
        let mut args = statement.arguments();
        args.set(0, 0).unwrap();

        let missing = statement.query_row(&args, |row| row.get(&other));
        assert!(matches!(missing, Err(Error::NotInResult { column, .. }) if column == "Other.x"));

        let bad = statement.query_row(&args, |row| row.get(&f.id));
        match bad {
            Err(Error::Decode { column, sql, .. }) => {
                assert_eq!(column, "id");
                assert_eq!(&*sql, f.seed.sql());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_argument_checks_precede_engine() {
        let f = fixture();
        let statement = Statement::new(f.seed.clone(), MockPrepared::default());
        assert!(matches!(
            statement.execute(&statement.arguments()),
            Err(Error::Unbound { index: 0, .. })
        ));

        let mut t = Table::builder("X");
        t.column("a", Int64).add().unwrap();
        let elsewhere = Select::new().from(&t.build().unwrap()).build().unwrap();
        assert!(matches!(
            statement.execute(&elsewhere.arguments()),
            Err(Error::SeedMismatch { .. })
        ));
    }

    #[test]
    fn test_engine_failure_carries_context() {
        let f = fixture();
        let statement = Statement::new(
            f.seed.clone(),
            MockPrepared {
                fail: true,
                ..MockPrepared::default()
            },
        );
        let mut args = statement.arguments();
        args.set(0, 5).unwrap();
        match statement.execute(&args) {
            Err(Error::Execution { sql, args, source }) => {
                assert_eq!(&*sql, f.seed.sql());
                assert_eq!(args, vec![SqlValue::Integer(5)]);
                assert_eq!(source.code(), Some(19));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            statement.query(&args, |_| Ok(true)),
            Err(Error::Execution { .. })
        ));
    }

    #[test]
    fn test_concurrent_executions_keep_their_arguments() {
        let f = fixture();
        let statement = Statement::new(f.seed.clone(), MockPrepared::default());
        thread::scope(|s| {
            for n in 0..8_i64 {
                let statement = &statement;
                s.spawn(move || {
                    let mut args = statement.arguments();
                    args.set(0, n).unwrap();
                    statement.execute(&args).unwrap();
                });
            }
        });
        let handle = statement.handle.lock();
        let mut seen: Vec<_> = handle.log.iter().map(|v| v[0].clone()).collect();
        seen.sort_by_key(|v| match v {
            SqlValue::Integer(i) => *i,
            _ => -1,
        });
        assert_eq!(seen, (0..8).map(SqlValue::Integer).collect::<Vec<_>>());
    }

    #[test]
    fn test_composite_read() {
        let mut t = Table::builder("Event");
        let at = t.composite("at", OffsetTimestamp).add().unwrap();
        let table = t.build().unwrap();
        let seed = Select::new().from(&table).composite(&at).build().unwrap();

        let tz = FixedOffset::east_opt(-3 * 3600).unwrap();
        let value = tz.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        let statement = Statement::new(
            seed,
            MockPrepared {
                names: vec!["at_utc_ms", "at_offset_s"],
                rows: vec![
                    vec![
                        SqlValue::Integer(value.timestamp_millis()),
                        SqlValue::Integer(-10_800),
                    ],
                    vec![SqlValue::Null, SqlValue::Null],
                ],
                ..MockPrepared::default()
            },
        );
        let read = statement
            .query_map(&statement.arguments(), |row| row.get_composite(&at))
            .unwrap();
        assert_eq!(read, vec![Some(value), None]);
    }
}
