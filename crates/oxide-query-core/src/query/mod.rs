//! Query and statement builders.
//!
//! Builders compose typed columns, predicates and sources, and render to a
//! [`Seed`]: the SQL text plus the ordered parameter contract needed to bind
//! and execute it any number of times.

mod compound;
mod delete;
mod insert;
mod seed;
mod select;
mod update;

pub use compound::{CompoundSelect, SetOperator};
pub use delete::{Delete, HasWhere, NoWhere};
pub use insert::Insert;
pub use seed::{OutputColumn, Seed};
pub use select::{Order, Select};
pub use update::{HasSet, NoSet, Update};
