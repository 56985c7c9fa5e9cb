//! Write translator: local row deletes become one remote bulk delete.
//!
//! A [`BulkEditor`] is created per `DELETE` statement. Each deleted row is
//! removed from the statement's row store immediately and its primary key
//! is buffered. On [`close`](RowDeleter::close) the buffer is sent as one
//! sync request:
//!
//! ```json
//! { "delete-product": { "entity": "product", "action": "delete",
//!                       "payload": [ { "id": "1" } ] } }
//! ```
//!
//! The remote call happens after the local statement has completed, so a
//! failed sync leaves the local rows deleted while the remote records
//! remain. The sync is sent at most once.

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use serde::Serialize;
use shopsql_client::{AdminApi, SYNC_PATH, post_unit};
use shopsql_core::{QueryContext, Row, RowDeleter, TableDefinition};
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::store::MemoryDeleter;

/// Action name of a bulk delete.
pub const DELETE_ACTION: &str = "delete";

/// One entry of a sync request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOperation {
    pub entity: String,
    pub action: String,
    /// Primary-key tuples, column name to stringified value.
    pub payload: Vec<BTreeMap<String, String>>,
}

impl BulkOperation {
    /// A delete of `keys` from `definition`'s entity.
    pub fn delete(definition: &TableDefinition, keys: Vec<BTreeMap<String, String>>) -> Self {
        Self {
            entity: definition.api_name(),
            action: DELETE_ACTION.to_string(),
            payload: keys,
        }
    }

    /// Label the operation is keyed by in the sync request.
    pub fn label(&self) -> String {
        format!("{}-{}", self.action, self.entity)
    }

    /// The sync request body carrying this operation alone.
    pub fn into_request(self) -> BTreeMap<String, BulkOperation> {
        BTreeMap::from([(self.label(), self)])
    }
}

/// Statement-scoped deleter that mirrors deletes to the admin API.
pub struct BulkEditor {
    definition: Arc<TableDefinition>,
    api: Arc<dyn AdminApi>,
    memory: MemoryDeleter,
    deletes: Vec<BTreeMap<String, String>>,
}

impl std::fmt::Debug for BulkEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkEditor")
            .field("entity", &self.definition.name)
            .field("pending", &self.deletes.len())
            .finish()
    }
}

impl BulkEditor {
    pub fn new(definition: Arc<TableDefinition>, api: Arc<dyn AdminApi>, memory: MemoryDeleter) -> Self {
        Self {
            definition,
            api,
            memory,
            deletes: Vec::new(),
        }
    }

    /// Key tuples buffered so far.
    pub fn pending(&self) -> &[BTreeMap<String, String>] {
        &self.deletes
    }

    fn key_of(&self, row: &Row) -> Result<BTreeMap<String, String>> {
        let ordinals = self.definition.primary_key_ordinals();
        if ordinals.is_empty() {
            return Err(AdapterError::MissingPrimaryKey(self.definition.name.clone()));
        }
        Ok(ordinals
            .into_iter()
            .map(|i| {
                let value = row.get(i).map(ToString::to_string).unwrap_or_default();
                (self.definition.columns[i].name.clone(), value)
            })
            .collect())
    }

    fn flush(&mut self, ctx: &QueryContext) -> Result<()> {
        if self.deletes.is_empty() {
            return Ok(());
        }
        let keys = std::mem::take(&mut self.deletes);
        let count = keys.len();
        let operation = BulkOperation::delete(&self.definition, keys);
        post_unit(self.api.as_ref(), ctx, SYNC_PATH, &operation.into_request())?;
        info!(
            query_id = ctx.query_id(),
            entity = %self.definition.name,
            keys = count,
            "sent bulk delete"
        );
        Ok(())
    }
}

impl RowDeleter for BulkEditor {
    type Error = AdapterError;

    fn statement_begin(&mut self, ctx: &QueryContext) -> Result<()> {
        self.deletes.clear();
        self.memory.statement_begin(ctx)
    }

    fn delete(&mut self, ctx: &QueryContext, row: &Row) -> Result<()> {
        let key = self.key_of(row)?;
        self.memory.delete(ctx, row)?;
        self.deletes.push(key);
        Ok(())
    }

    fn discard_changes(&mut self, ctx: &QueryContext, cause: &(dyn Error + 'static)) -> Result<()> {
        debug!(
            entity = %self.definition.name,
            keys = self.deletes.len(),
            "discarding bulk delete"
        );
        self.deletes.clear();
        self.memory.discard_changes(ctx, cause)
    }

    fn statement_complete(&mut self, ctx: &QueryContext) -> Result<()> {
        self.memory.statement_complete(ctx)
    }

    /// Sends the buffered deletes, then closes the row store deleter even
    /// if the request failed.
    fn close(&mut self, ctx: &QueryContext) -> Result<()> {
        let sent = self.flush(ctx);
        let closed = self.memory.close(ctx);
        sent.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsql_client::MockAdminApi;
    use shopsql_core::{Entity, EntityProperty, Value};

    use crate::store::RowStore;

    fn mapping_definition() -> TableDefinition {
        let entity = Entity::new("product_category")
            .with_property("productId", EntityProperty::new("uuid").primary())
            .with_property("categoryId", EntityProperty::new("uuid").primary())
            .with_property("position", EntityProperty::new("int"));
        TableDefinition::from_entity("product_category", &entity, true)
    }

    fn editor(api: Arc<MockAdminApi>, definition: TableDefinition, rows: &[Row]) -> BulkEditor {
        let store = RowStore::new(&definition.name, definition.columns.clone(), 1).unwrap();
        store.insert_all(rows).unwrap();
        BulkEditor::new(Arc::new(definition), api, MemoryDeleter::new(Arc::new(store)))
    }

    #[test]
    fn test_label_and_request_shape() {
        let op = BulkOperation::delete(
            &mapping_definition(),
            vec![BTreeMap::from([("productId".to_string(), "p".to_string())])],
        );
        assert_eq!(op.label(), "delete-product-category");
        let body = serde_json::to_value(op.into_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "delete-product-category": {
                    "entity": "product-category",
                    "action": "delete",
                    "payload": [{ "productId": "p" }]
                }
            })
        );
    }

    #[test]
    fn test_compound_key_payload_excludes_other_columns() {
        let api = Arc::new(MockAdminApi::new());
        let row = Row::new(vec!["c1".into(), "p1".into(), Value::Float(3.0)]);
        let mut editor = editor(api.clone(), mapping_definition(), std::slice::from_ref(&row));

        let ctx = QueryContext::new();
        editor.statement_begin(&ctx).unwrap();
        editor.delete(&ctx, &row).unwrap();
        assert_eq!(editor.pending().len(), 1);
        editor.statement_complete(&ctx).unwrap();
        editor.close(&ctx).unwrap();

        let sync = api.sync_requests();
        assert_eq!(sync.len(), 1);
        let body = sync[0].json_body().unwrap();
        assert_eq!(
            body["delete-product-category"]["payload"],
            serde_json::json!([{ "categoryId": "c1", "productId": "p1" }])
        );
    }

    #[test]
    fn test_float_keys_use_shortest_form() {
        let entity = Entity::new("counter").with_property("n", EntityProperty::new("int").primary());
        let definition = TableDefinition::from_entity("counter", &entity, false);
        let row = Row::new(vec![Value::Float(1.0)]);
        let mut editor = editor(Arc::new(MockAdminApi::new()), definition, std::slice::from_ref(&row));

        let ctx = QueryContext::new();
        editor.statement_begin(&ctx).unwrap();
        editor.delete(&ctx, &row).unwrap();
        assert_eq!(editor.pending()[0]["n"], "1");
    }

    #[test]
    fn test_table_without_primary_key_rejects_deletes() {
        let entity = Entity::new("log").with_property("message", EntityProperty::new("string"));
        let definition = TableDefinition::from_entity("log", &entity, false);
        let row = Row::new(vec!["hello".into()]);
        let api = Arc::new(MockAdminApi::new());
        let mut editor = editor(api.clone(), definition, std::slice::from_ref(&row));

        let ctx = QueryContext::new();
        editor.statement_begin(&ctx).unwrap();
        let err = editor.delete(&ctx, &row).unwrap_err();
        assert!(matches!(err, AdapterError::MissingPrimaryKey(_)));
        editor.close(&ctx).unwrap();
        assert!(api.sync_requests().is_empty());
    }

    #[test]
    fn test_failed_local_delete_is_not_buffered() {
        let api = Arc::new(MockAdminApi::new());
        let row = Row::new(vec!["c1".into(), "p1".into(), Value::Null]);
        let mut editor = editor(api.clone(), mapping_definition(), &[]);

        let ctx = QueryContext::new();
        editor.statement_begin(&ctx).unwrap();
        assert!(matches!(
            editor.delete(&ctx, &row),
            Err(AdapterError::RowNotFound(_))
        ));
        assert!(editor.pending().is_empty());
        editor.close(&ctx).unwrap();
        assert!(api.sync_requests().is_empty());
    }

    #[test]
    fn test_debug_shows_entity_and_pending_count() {
        let api = Arc::new(MockAdminApi::new());
        let row = Row::new(vec!["c1".into(), "p1".into(), Value::Float(2.0)]);
        let mut editor = editor(api, mapping_definition(), std::slice::from_ref(&row));

        let ctx = QueryContext::new();
        editor.statement_begin(&ctx).unwrap();
        editor.delete(&ctx, &row).unwrap();
        let debug = format!("{editor:?}");
        assert!(debug.contains("product_category"));
        assert!(debug.contains("pending: 1"));
    }
}
