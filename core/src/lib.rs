//! Core types for exposing remote management-API entities as SQL tables.
//!
//! This crate holds everything that does not talk to the network:
//!
//! - [`Entity`] / [`EntityProperty`]: the remote entity schema document.
//! - The type mapper ([`EntityProperty::column_type`],
//!   [`EntityProperty::is_primary`], [`Entity::columns`]) producing
//!   [`Column`]s and [`TableDefinition`]s.
//! - [`Value`] / [`Row`]: typed cells handed to the query engine.
//! - [`QueryContext`]: per-statement context with cancellation.
//! - [`engine`]: the capability traits a SQL engine calls into
//!   ([`Database`], [`Table`], [`DeletableTable`], [`RowDeleter`]).
//!
//! # Example
//!
//! ```
//! use shopsql_core::*;
//!
//! let entity = Entity::new("product")
//!     .with_property("id", EntityProperty::new("uuid").primary())
//!     .with_property("name", EntityProperty::new("string"))
//!     .with_property("tags", EntityProperty::many_to_many("tag", "product_tag"));
//!
//! let table = TableDefinition::from_entity("product", &entity, false);
//! assert_eq!(table.columns.len(), 2);
//! assert_eq!(table.primary_key_ordinals(), vec![0]);
//! assert_eq!(table.columns[1].column_type, ColumnType::Text);
//! ```

mod context;
pub mod engine;
mod types;
mod value;

pub use context::QueryContext;
pub use engine::{Database, DeletableTable, RowDeleter, Table, delete_matching, scan};
pub use types::*;
pub use value::{Row, Value};
