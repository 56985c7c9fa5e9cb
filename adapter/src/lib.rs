//! Remote admin-API entities as SQL tables.
//!
//! This crate implements the engine contracts of [`shopsql_core::engine`]
//! on top of a shop's admin API:
//!
//! - [`AdminDatabase`] resolves table names (case-insensitively) to
//!   [`AdminTable`]s, one per registered entity.
//! - Reading an [`AdminTable`] materializes the entity with one search
//!   request into a partitioned in-memory [`RowStore`].
//! - Deleting through the table's [`BulkEditor`] removes the rows locally
//!   and sends their primary keys as one bulk delete when the deleter is
//!   closed.
//!
//! There is no insert or update path.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shopsql_adapter::AdminDatabase;
//! use shopsql_client::{HttpAdminApi, ShopConfig};
//! use shopsql_core::{Database, QueryContext, Value, delete_matching};
//!
//! let config = ShopConfig::load(".shopware-project.yml").unwrap();
//! let api = Arc::new(HttpAdminApi::new(&config).unwrap());
//! let ctx = QueryContext::new();
//! let db = AdminDatabase::connect(api, &ctx, &config.adapter).unwrap();
//!
//! // DELETE FROM product WHERE name = 'Chair'
//! let product = db.table_insensitive(&ctx, "product").unwrap();
//! let name = product.definition().index_of("name").unwrap();
//! let chair = Value::from("Chair");
//! let deleted = delete_matching(&product, &ctx, |row| row.get(name) == Some(&chair)).unwrap();
//! println!("deleted {deleted} rows");
//! ```
//!
//! # Row store layout
//!
//! Each materialization opens a private in-memory SQLite database holding
//! one table. Column types map to `TEXT`, `BLOB` (JSON), `INTEGER`
//! (boolean) and `REAL` (float).

mod bulk;
mod convert;
mod database;
mod error;
mod materialize;
mod schema;
mod store;
mod table;

pub use bulk::{BulkEditor, BulkOperation, DELETE_ACTION};
pub use convert::{json_to_value, record_to_row};
pub use database::AdminDatabase;
pub use error::{AdapterError, Result};
pub use materialize::{FullFetch, Materializer, SearchResponse};
pub use schema::{generate_table_sql, quote_ident};
pub use store::{MemoryDeleter, Partition, RowStore};
pub use table::{AdminTable, build_tables};
