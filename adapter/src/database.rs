//! The database facade the query engine resolves tables through.

use std::collections::HashMap;
use std::sync::Arc;

use shopsql_client::{AdapterConfig, AdminApi, EntityRegistry};
use shopsql_core::{Database, QueryContext};
use tracing::info;

use crate::error::{AdapterError, Result};
use crate::table::{AdminTable, build_tables};

/// All entities of one shop, addressable as tables.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use shopsql_adapter::AdminDatabase;
/// use shopsql_client::{HttpAdminApi, ShopConfig};
/// use shopsql_core::{Database, QueryContext, scan};
///
/// let config = ShopConfig::load(".shopware-project.yml").unwrap();
/// let api = Arc::new(HttpAdminApi::new(&config).unwrap());
/// let ctx = QueryContext::new();
///
/// let db = AdminDatabase::connect(api, &ctx, &config.adapter).unwrap();
/// let products = db.table_insensitive(&ctx, "Product").unwrap();
/// println!("{} products", scan(&products, &ctx).unwrap().len());
/// ```
#[derive(Debug)]
pub struct AdminDatabase {
    name: String,
    tables: HashMap<String, AdminTable>,
}

impl AdminDatabase {
    /// Builds the database from an already loaded registry.
    pub fn new(
        name: impl Into<String>,
        registry: &EntityRegistry,
        api: Arc<dyn AdminApi>,
        config: &AdapterConfig,
    ) -> Self {
        let tables = build_tables(registry, api, config)
            .into_iter()
            .map(|(name, table)| (name.to_ascii_lowercase(), table))
            .collect();
        Self {
            name: name.into(),
            tables,
        }
    }

    /// Loads the entity registry and builds the database.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Api`] if the schema cannot be fetched or
    /// decoded.
    pub fn connect(api: Arc<dyn AdminApi>, ctx: &QueryContext, config: &AdapterConfig) -> Result<Self> {
        let registry = EntityRegistry::load(api.as_ref(), ctx)?;
        let db = Self::new(&config.database_name, &registry, api, config);
        info!(database = %db.name, tables = db.tables.len(), "database ready");
        Ok(db)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Database for AdminDatabase {
    type Table = AdminTable;

    fn name(&self) -> &str {
        &self.name
    }

    /// Returns a fresh statement handle for `name`, ignoring ASCII case.
    fn table_insensitive(&self, _ctx: &QueryContext, name: &str) -> Result<AdminTable> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .map(AdminTable::handle)
            .ok_or_else(|| AdapterError::TableNotFound(name.to_string()))
    }

    fn table_names(&self, _ctx: &QueryContext) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .tables
            .values()
            .map(|t| t.definition().name.clone())
            .collect();
        names.sort_unstable();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopsql_client::MockAdminApi;
    use shopsql_core::Table;

    fn api() -> Arc<MockAdminApi> {
        Arc::new(MockAdminApi::new().with_schema(json!({
            "product": {
                "entity": "product",
                "properties": { "id": { "type": "uuid", "flags": { "primary_key": true } } }
            },
            "tax": {
                "entity": "tax",
                "properties": { "id": { "type": "uuid", "flags": { "primary_key": true } } }
            }
        })))
    }

    #[test]
    fn test_connect_names_database() {
        let ctx = QueryContext::new();
        let db = AdminDatabase::connect(api(), &ctx, &AdapterConfig::default()).unwrap();
        assert_eq!(db.name(), "shopware");
        assert_eq!(db.len(), 2);
        assert_eq!(db.table_names(&ctx).unwrap(), vec!["product", "tax"]);
    }

    #[test]
    fn test_lookup_ignores_case() {
        let ctx = QueryContext::new();
        let db = AdminDatabase::connect(api(), &ctx, &AdapterConfig::default()).unwrap();
        assert_eq!(db.table_insensitive(&ctx, "PRODUCT").unwrap().name(), "product");
        let err = db.table_insensitive(&ctx, "customer").unwrap_err();
        assert!(matches!(err, AdapterError::TableNotFound(ref n) if n == "customer"));
    }
}
