//! Partitioned in-memory row store.
//!
//! A [`RowStore`] holds the rows of one table for the duration of one
//! statement. It is backed by a private in-memory SQLite connection; rows
//! are spread across partitions by insertion order (`(rowid - 1) % n`) and
//! come back in insertion order within a partition.
//!
//! Deletes go through a [`MemoryDeleter`], which wraps the statement in a
//! savepoint so [`RowDeleter::discard_changes`] restores deleted rows.

use std::error::Error;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, params, params_from_iter};
use shopsql_core::{Column, QueryContext, Row, RowDeleter};
use tracing::debug;

use crate::convert::{from_sql, to_sql};
use crate::error::{AdapterError, Result};
use crate::schema::{column_list, generate_table_sql, quote_ident};

/// One slice of a [`RowStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    index: usize,
}

impl Partition {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Rows of one materialized table.
#[derive(Debug)]
pub struct RowStore {
    name: String,
    columns: Vec<Column>,
    partitions: usize,
    conn: Mutex<Connection>,
}

impl RowStore {
    /// Creates an empty store for `columns` split into `partitions` slices
    /// (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if the in-memory connection
    /// cannot be opened or the table cannot be created.
    pub fn new(name: impl Into<String>, columns: Vec<Column>, partitions: usize) -> Result<Self> {
        let name = name.into();
        let conn = Connection::open_in_memory()?;
        conn.execute(&generate_table_sql(&name, &columns), [])?;
        Ok(Self {
            name,
            columns,
            partitions: partitions.max(1),
            conn: Mutex::new(conn),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Appends rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if a row violates the table
    /// layout (e.g. a null primary-key value); no row is kept in that case.
    pub fn insert_all<'a, I>(&self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&self.insert_sql())?;
            for row in rows {
                if self.columns.is_empty() {
                    stmt.execute([])?;
                } else {
                    stmt.execute(params_from_iter(row.values().iter().map(to_sql)))?;
                }
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Appends a single row.
    pub fn insert(&self, row: &Row) -> Result<()> {
        self.insert_all(std::iter::once(row)).map(|_| ())
    }

    fn insert_sql(&self) -> String {
        let table = quote_ident(&self.name);
        if self.columns.is_empty() {
            return format!("INSERT INTO {table} DEFAULT VALUES");
        }
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            column_list(&self.columns)
        )
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&self.name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions
    }

    /// All partitions of the store, including empty ones.
    pub fn partitions(&self) -> std::vec::IntoIter<Partition> {
        (0..self.partitions)
            .map(|index| Partition { index })
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Rows of one partition in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if the query fails.
    pub fn partition_rows(&self, partition: &Partition) -> Result<std::vec::IntoIter<Row>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE ((rowid - 1) % ?1) = ?2 ORDER BY rowid",
            column_list(&self.columns),
            quote_ident(&self.name)
        ))?;
        let rows = stmt
            .query_map(
                params![self.partitions as i64, partition.index as i64],
                |row| {
                    let mut values = Vec::with_capacity(self.columns.len());
                    for (i, column) in self.columns.iter().enumerate() {
                        values.push(from_sql(column, row.get_ref(i)?));
                    }
                    Ok(Row::new(values))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter())
    }

    /// Every row across all partitions, in insertion order.
    pub fn rows(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for partition in self.partitions() {
            rows.extend(self.partition_rows(&partition)?);
        }
        Ok(rows)
    }

    /// Ordinals identifying a row: the primary key, or every column when
    /// the table has none.
    fn key_ordinals(&self) -> Vec<usize> {
        let primary: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        if primary.is_empty() {
            (0..self.columns.len()).collect()
        } else {
            primary
        }
    }

    /// Deletes one row whose key columns equal those of `row`.
    fn delete_row(&self, row: &Row) -> Result<()> {
        let ordinals = self.key_ordinals();
        let table = quote_ident(&self.name);
        let predicate = if ordinals.is_empty() {
            "1".to_string()
        } else {
            ordinals
                .iter()
                .enumerate()
                .map(|(param, &ordinal)| {
                    format!("{} IS ?{}", quote_ident(&self.columns[ordinal].name), param + 1)
                })
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        let sql = format!(
            "DELETE FROM {table} WHERE rowid = (SELECT rowid FROM {table} WHERE {predicate} LIMIT 1)"
        );
        let values = ordinals
            .iter()
            .map(|&i| row.get(i).map(to_sql).unwrap_or(rusqlite::types::Value::Null));

        let conn = self.conn.lock()?;
        let changed = conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(AdapterError::RowNotFound(self.name.clone()));
        }
        Ok(())
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock()?.execute_batch(sql)?;
        Ok(())
    }
}

/// Statement-scoped deleter over a [`RowStore`].
#[derive(Debug)]
pub struct MemoryDeleter {
    store: Arc<RowStore>,
    savepoint: Option<String>,
}

impl MemoryDeleter {
    pub fn new(store: Arc<RowStore>) -> Self {
        Self {
            store,
            savepoint: None,
        }
    }

    pub fn store(&self) -> &Arc<RowStore> {
        &self.store
    }

    fn release(&mut self) -> Result<()> {
        if let Some(name) = self.savepoint.take() {
            self.store.execute_batch(&format!("RELEASE {name}"))?;
        }
        Ok(())
    }
}

impl RowDeleter for MemoryDeleter {
    type Error = AdapterError;

    fn statement_begin(&mut self, ctx: &QueryContext) -> Result<()> {
        if self.savepoint.is_none() {
            let name = format!("stmt_{}", ctx.query_id());
            self.store.execute_batch(&format!("SAVEPOINT {name}"))?;
            self.savepoint = Some(name);
        }
        Ok(())
    }

    fn delete(&mut self, _ctx: &QueryContext, row: &Row) -> Result<()> {
        self.store.delete_row(row)
    }

    fn discard_changes(&mut self, _ctx: &QueryContext, cause: &(dyn Error + 'static)) -> Result<()> {
        if let Some(name) = self.savepoint.take() {
            debug!(table = %self.store.name, %cause, "rolling back local deletes");
            self.store
                .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))?;
        }
        Ok(())
    }

    fn statement_complete(&mut self, _ctx: &QueryContext) -> Result<()> {
        self.release()
    }

    fn close(&mut self, _ctx: &QueryContext) -> Result<()> {
        self.release()
    }
}
