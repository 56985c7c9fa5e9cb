//! Admin API access for the shopsql adapter.
//!
//! This crate connects the adapter to a shop's management API:
//!
//! - [`AdminApi`]: the transport seam every request goes through, with
//!   [`HttpAdminApi`] as the reqwest-backed implementation (OAuth2
//!   client-credentials or password grant).
//! - [`ShopConfig`]: YAML project configuration.
//! - [`EntityRegistry`]: the entity schema, fetched once and indexed.
//!
//! # Quick start
//!
//! ```no_run
//! use shopsql_client::{EntityRegistry, HttpAdminApi, ShopConfig};
//! use shopsql_core::QueryContext;
//!
//! let config = ShopConfig::load(".shopware-project.yml").unwrap();
//! let api = HttpAdminApi::new(&config).unwrap();
//! let registry = EntityRegistry::load(&api, &QueryContext::new()).unwrap();
//!
//! for (name, table) in registry.table_definitions() {
//!     println!("{name}: {} columns", table.columns.len());
//! }
//! ```
//!
//! # Feature flags
//!
//! - **`mock`**: exposes [`MockAdminApi`], an in-memory double that serves
//!   canned responses and records requests.

mod api;
mod config;
mod error;
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod registry;

pub use api::{
    AdminApi, ApiRequest, ENTITY_SCHEMA_PATH, Method, SYNC_PATH, TOKEN_PATH, get_json, post_json,
    post_unit, search_path,
};
pub use config::{AdapterConfig, AdminApiConfig, DEFAULT_CONFIG_FILE, ShopConfig};
pub use error::{ApiError, Result};
pub use http::{Credentials, HttpAdminApi};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockAdminApi;
pub use registry::{EntityRegistry, RegistrySource};
