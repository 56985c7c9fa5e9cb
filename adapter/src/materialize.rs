//! Table materialization: turning a remote entity into local rows.
//!
//! [`FullFetch`] issues one search request per call and copies the whole
//! result into a fresh [`RowStore`]. Nothing is cached between calls, so
//! every statement sees the remote state at the time it ran.

use std::sync::Arc;

use serde::Deserialize;
use shopsql_client::{AdminApi, post_json, search_path};
use shopsql_core::{QueryContext, Row, TableDefinition};
use tracing::debug;

use crate::convert::record_to_row;
use crate::error::Result;
use crate::store::RowStore;

/// Strategy that fills a row store for one table.
pub trait Materializer: Send + Sync {
    /// Fetches the rows of `definition` into a new store.
    ///
    /// # Errors
    ///
    /// Fails as a whole on any transport, decode or conversion error; no
    /// partially filled store is returned.
    fn materialize(&self, ctx: &QueryContext, definition: &TableDefinition) -> Result<RowStore>;
}

/// Body of a search response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: Option<u64>,
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Re-fetches the complete entity on every call.
pub struct FullFetch {
    api: Arc<dyn AdminApi>,
    partitions: usize,
}

impl FullFetch {
    pub fn new(api: Arc<dyn AdminApi>, partitions: usize) -> Self {
        Self { api, partitions }
    }
}

impl Materializer for FullFetch {
    fn materialize(&self, ctx: &QueryContext, definition: &TableDefinition) -> Result<RowStore> {
        let path = search_path(&definition.name);
        let response: SearchResponse = post_json::<(), _>(self.api.as_ref(), ctx, &path, None)?;

        let rows = response
            .data
            .into_iter()
            .map(|record| record_to_row(definition, record))
            .collect::<Result<Vec<Row>>>()?;

        let store = RowStore::new(&definition.name, definition.columns.clone(), self.partitions)?;
        store.insert_all(&rows)?;
        debug!(
            query_id = ctx.query_id(),
            entity = %definition.name,
            rows = rows.len(),
            total = ?response.total,
            "materialized table"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopsql_client::{Method, MockAdminApi};
    use shopsql_core::{Entity, EntityProperty, Value};

    fn definition() -> TableDefinition {
        let entity = Entity::new("product_review")
            .with_property("id", EntityProperty::new("uuid").primary())
            .with_property("points", EntityProperty::new("float"));
        TableDefinition::from_entity("product_review", &entity, false)
    }

    #[test]
    fn test_materialize_uses_hyphenated_search_path() {
        let api = Arc::new(
            MockAdminApi::new()
                .with_search("product_review", json!([{"id": "a", "points": 4.5}, {"id": "b"}])),
        );
        let store = FullFetch::new(api.clone(), 1)
            .materialize(&QueryContext::new(), &definition())
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].path, "/api/search/product-review");
        assert_eq!(requests[0].body, None);

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), Some(&Value::Float(4.5)));
        assert!(rows[1].get(1).unwrap().is_null());
    }

    #[test]
    fn test_conversion_error_aborts_materialization() {
        let api = Arc::new(
            MockAdminApi::new().with_search("product_review", json!([{"id": "a", "points": "lots"}])),
        );
        let result = FullFetch::new(api, 1).materialize(&QueryContext::new(), &definition());
        assert!(result.is_err());
    }
}
