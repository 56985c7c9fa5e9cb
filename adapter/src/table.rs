//! Tables backed by remote entities.
//!
//! An [`AdminTable`] pairs a [`TableDefinition`] with the admin API. Reading
//! it materializes the entity through a [`Materializer`]; the resulting row
//! store is kept in the table handle so a subsequent `DELETE` in the same
//! statement can be applied to the rows that were read.
//!
//! Handles are statement-scoped: the [`Database`](shopsql_core::Database)
//! hands out a fresh handle per lookup, sharing only the immutable
//! definition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shopsql_client::{AdapterConfig, AdminApi, EntityRegistry};
use shopsql_core::{Column, DeletableTable, QueryContext, Row, Table, TableDefinition};

use crate::bulk::BulkEditor;
use crate::error::{AdapterError, Result};
use crate::materialize::{FullFetch, Materializer};
use crate::store::{MemoryDeleter, Partition, RowStore};

/// A remote entity exposed as a table.
pub struct AdminTable {
    definition: Arc<TableDefinition>,
    api: Arc<dyn AdminApi>,
    materializer: Arc<dyn Materializer>,
    memory: Mutex<Option<Arc<RowStore>>>,
}

impl AdminTable {
    pub fn new(
        definition: TableDefinition,
        api: Arc<dyn AdminApi>,
        materializer: Arc<dyn Materializer>,
    ) -> Self {
        Self {
            definition: Arc::new(definition),
            api,
            materializer,
            memory: Mutex::new(None),
        }
    }

    /// A fresh handle for a new statement. Shares the definition and API,
    /// not the materialized rows.
    pub fn handle(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            api: Arc::clone(&self.api),
            materializer: Arc::clone(&self.materializer),
            memory: Mutex::new(None),
        }
    }

    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// Whether the entity is a many-to-many junction entity.
    pub fn is_mapping(&self) -> bool {
        self.definition.is_mapping
    }

    /// Rows materialized by the last read of this handle, if any.
    pub fn materialized(&self) -> Result<Option<Arc<RowStore>>> {
        Ok(self.memory.lock()?.clone())
    }
}

impl std::fmt::Debug for AdminTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminTable")
            .field("name", &self.definition.name)
            .field("columns", &self.definition.columns.len())
            .field("is_mapping", &self.definition.is_mapping)
            .finish()
    }
}

impl Table for AdminTable {
    type Error = AdapterError;
    type Partition = Partition;
    type Partitions = std::vec::IntoIter<Partition>;
    type Rows = std::vec::IntoIter<Row>;

    fn name(&self) -> &str {
        &self.definition.name
    }

    fn schema(&self) -> &[Column] {
        &self.definition.columns
    }

    /// Materializes the entity and returns the partitions of the new
    /// row store.
    fn partitions(&self, ctx: &QueryContext) -> Result<Self::Partitions> {
        let store = Arc::new(self.materializer.materialize(ctx, &self.definition)?);
        let partitions = store.partitions();
        *self.memory.lock()? = Some(store);
        Ok(partitions)
    }

    fn partition_rows(&self, _ctx: &QueryContext, partition: &Partition) -> Result<Self::Rows> {
        let store = self
            .materialized()?
            .ok_or_else(|| AdapterError::NotMaterialized(self.definition.name.clone()))?;
        store.partition_rows(partition)
    }
}

impl DeletableTable for AdminTable {
    type Deleter = BulkEditor;

    /// Returns a bulk editor over the rows read by this handle.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::NotMaterialized`] if the table has not been
    /// read in this statement.
    fn deleter(&self, _ctx: &QueryContext) -> Result<BulkEditor> {
        let store = self
            .materialized()?
            .ok_or_else(|| AdapterError::NotMaterialized(self.definition.name.clone()))?;
        Ok(BulkEditor::new(
            Arc::clone(&self.definition),
            Arc::clone(&self.api),
            MemoryDeleter::new(store),
        ))
    }
}

/// Builds one table per registered entity, keyed by entity name.
///
/// All tables share a single [`FullFetch`] materializer.
pub fn build_tables(
    registry: &EntityRegistry,
    api: Arc<dyn AdminApi>,
    config: &AdapterConfig,
) -> HashMap<String, AdminTable> {
    let materializer: Arc<dyn Materializer> =
        Arc::new(FullFetch::new(Arc::clone(&api), config.partitions));
    registry
        .table_definitions()
        .into_iter()
        .map(|(name, definition)| {
            let table = AdminTable::new(definition, Arc::clone(&api), Arc::clone(&materializer));
            (name, table)
        })
        .collect()
}
