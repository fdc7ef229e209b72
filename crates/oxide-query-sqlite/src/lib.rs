//! # oxide-query-sqlite
//!
//! SQLite engine for `oxide-query-core`, backed by `rusqlite`.
//!
//! # How SQLite differs from other dialects
//!
//! - **[Type affinity]**: any column can store any value regardless of its
//!   declared type. Descriptors coerce values on the way in and decode them
//!   on the way out, so affinity never leaks into typed reads.
//! - **[Foreign keys]** are off by default in SQLite. [`SqliteEngine`]
//!   turns them on unless [`SqliteConfig::foreign_keys`] says otherwise.
//! - **`LIMIT`**: an `OFFSET` needs a `LIMIT`; `LIMIT -1` means no limit.
//! - **Identifier quoting**: SQLite uses double quotes (`"`) as the standard
//!   quoting style. See [SQLite keywords].
//!
//! [Type affinity]: https://www.sqlite.org/datatype3.html
//! [Foreign keys]: https://www.sqlite.org/foreignkeys.html
//! [SQLite keywords]: https://www.sqlite.org/lang_keywords.html
//!
//! ## Example
//!
//! ```rust
//! use oxide_query_core::exec::Engine;
//! use oxide_query_core::query::{Insert, Order, Select};
//! use oxide_query_core::schema::Table;
//! use oxide_query_core::types::{Int64, Text};
//! use oxide_query_sqlite::SqliteEngine;
//!
//! let mut t = Table::builder("Artist");
//! let id = t.column("id", Int64).primary_key().auto_increment().add()?;
//! let name = t.column("name", Text).not_null().add()?;
//! let artist = t.build()?;
//!
//! let engine = SqliteEngine::open_in_memory()?;
//! engine.create_tables(&[artist.clone()])?;
//!
//! let insert = engine.compile(&Insert::into_table(&artist).placeholder(&name).build()?)?;
//! for n in ["Bach", "Brahms", "Chopin"] {
//!     let mut args = insert.arguments();
//!     args.set(0, n)?;
//!     insert.execute(&args)?;
//! }
//!
//! let select = engine.compile(
//!     &Select::new()
//!         .from(&artist)
//!         .column(&id)
//!         .column(&name)
//!         .where_clause(name.like("B%"))
//!         .order_by(&id, Order::Asc)
//!         .build()?,
//! )?;
//! let names = select.query_map(&select.arguments(), |row| row.get(&name))?;
//! assert_eq!(names, vec![Some("Bach".to_owned()), Some("Brahms".to_owned())]);
//! # Ok::<(), oxide_query_core::Error>(())
//! ```

mod dialect;
mod engine;

pub use dialect::SqliteDialect;
pub use engine::{SqliteConfig, SqliteEngine, SqliteStatement};
