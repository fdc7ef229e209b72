//! # oxide-query-core
//!
//! Typed query construction for embedded SQL engines.
//!
//! This crate provides:
//! - Value descriptors that convert between Rust values and storage values,
//!   with a single policy for NULL
//! - Table definitions with constraints, foreign keys and creation ordering
//! - Column sets (tables, aliases, joins, views and subqueries) whose columns
//!   keep their identity through every derivation
//! - Builders for SELECT, compound selects, INSERT, UPDATE and DELETE that
//!   render to a reusable [`Seed`]: the SQL text plus its parameter contract
//! - Typed binding and result decoding on top of a small engine abstraction
//!
//! ## Building queries
//!
//! ```rust
//! use oxide_query_core::query::Select;
//! use oxide_query_core::schema::Table;
//! use oxide_query_core::types::{Int64, Text};
//!
//! let mut t = Table::builder("Artist");
//! let id = t.column("id", Int64).primary_key().add()?;
//! let name = t.column("name", Text).not_null().add()?;
//! let artist = t.build()?;
//!
//! let seed = Select::new()
//!     .from(&artist)
//!     .column(&id)
//!     .column(&name)
//!     .where_clause(name.like("B%"))
//!     .build()?;
//!
//! assert_eq!(
//!     seed.sql(),
//!     "SELECT Artist.id, Artist.name FROM Artist WHERE Artist.name LIKE ?"
//! );
//! assert_eq!(seed.params().len(), 1);
//! # Ok::<(), oxide_query_core::Error>(())
//! ```
//!
//! ## Values never reach the SQL text
//!
//! Literal values become bind placeholders with a preset value, so the text
//! of a seed only depends on the shape of the query:
//!
//! ```rust
//! use oxide_query_core::query::Select;
//! use oxide_query_core::schema::Table;
//! use oxide_query_core::types::Text;
//!
//! let mut t = Table::builder("Artist");
//! let name = t.column("name", Text).add()?;
//! let artist = t.build()?;
//!
//! let user_input = "'; DROP TABLE Artist; --";
//! let seed = Select::new()
//!     .from(&artist)
//!     .column(&name)
//!     .where_clause(name.eq(user_input))
//!     .build()?;
//!
//! assert!(!seed.sql().contains("DROP"));
//! # Ok::<(), oxide_query_core::Error>(())
//! ```
//!
//! ## Executing
//!
//! Engines implement [`exec::Engine`]. A seed is compiled once into an
//! [`exec::Statement`] and executed with any number of [`exec::Arguments`];
//! rows are read back with the same column handles used to build the query.

pub mod dialect;
mod error;
pub mod exec;
pub mod expr;
pub mod query;
pub mod render;
pub mod schema;
pub mod source;
pub mod types;
pub mod value;

pub use error::{ConversionError, EngineError, Error, Result, SchemaError};
pub use exec::{Arguments, Engine, Execution, ResultRow, Statement};
pub use expr::{Param, Predicate};
pub use query::{CompoundSelect, Delete, Insert, Seed, Select, Update};
pub use schema::{Column, Table};
pub use source::{Alias, ColumnSet, Join, Source, Subquery, View};
pub use value::{SqlValue, ToSqlValue};
