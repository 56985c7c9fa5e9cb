//! Capability contracts between the SQL execution engine and table
//! providers.
//!
//! The engine (planner, executor, wire protocol) lives outside this
//! workspace. It only ever talks to a provider through these traits:
//!
//! - [`Database`]: resolves tables by name.
//! - [`Table`]: exposes a schema and partitioned row iteration.
//! - [`DeletableTable`] / [`RowDeleter`]: statement-scoped row deletion.
//!
//! [`scan`] and [`delete_matching`] drive the contracts the way an engine
//! executes `SELECT *` and `DELETE ... WHERE`, and are what the CLI uses.

use std::error::Error;

use crate::context::QueryContext;
use crate::types::Column;
use crate::value::Row;

/// A queryable table.
pub trait Table {
    type Error: Error + Send + Sync + 'static;
    type Partition;
    type Partitions: Iterator<Item = Self::Partition>;
    type Rows: Iterator<Item = Row>;

    fn name(&self) -> &str;

    /// Ordered column list; stable for the lifetime of the table.
    fn schema(&self) -> &[Column];

    /// Enumerates the partitions to read for this statement.
    fn partitions(&self, ctx: &QueryContext) -> Result<Self::Partitions, Self::Error>;

    /// Iterates the rows of one partition returned by [`Table::partitions`].
    fn partition_rows(
        &self,
        ctx: &QueryContext,
        partition: &Self::Partition,
    ) -> Result<Self::Rows, Self::Error>;
}

/// Statement-scoped row deletion.
///
/// The engine calls [`statement_begin`](RowDeleter::statement_begin), then
/// [`delete`](RowDeleter::delete) once per matched row, then either
/// [`statement_complete`](RowDeleter::statement_complete) or
/// [`discard_changes`](RowDeleter::discard_changes), and finally
/// [`close`](RowDeleter::close) in both cases.
pub trait RowDeleter {
    type Error: Error + Send + Sync + 'static;

    fn statement_begin(&mut self, ctx: &QueryContext) -> Result<(), Self::Error>;

    fn delete(&mut self, ctx: &QueryContext, row: &Row) -> Result<(), Self::Error>;

    fn discard_changes(
        &mut self,
        ctx: &QueryContext,
        cause: &(dyn Error + 'static),
    ) -> Result<(), Self::Error>;

    fn statement_complete(&mut self, ctx: &QueryContext) -> Result<(), Self::Error>;

    fn close(&mut self, ctx: &QueryContext) -> Result<(), Self::Error>;
}

/// A table that accepts `DELETE` statements.
pub trait DeletableTable: Table {
    type Deleter: RowDeleter<Error = Self::Error>;

    fn deleter(&self, ctx: &QueryContext) -> Result<Self::Deleter, Self::Error>;
}

/// A named collection of tables.
pub trait Database {
    type Table: Table;

    fn name(&self) -> &str;

    /// Resolves `name` ignoring ASCII case.
    fn table_insensitive(
        &self,
        ctx: &QueryContext,
        name: &str,
    ) -> Result<Self::Table, <Self::Table as Table>::Error>;

    fn table_names(&self, ctx: &QueryContext) -> Result<Vec<String>, <Self::Table as Table>::Error>;
}

/// Reads every row of every partition.
pub fn scan<T: Table>(table: &T, ctx: &QueryContext) -> Result<Vec<Row>, T::Error> {
    let mut rows = Vec::new();
    for partition in table.partitions(ctx)? {
        rows.extend(table.partition_rows(ctx, &partition)?);
    }
    Ok(rows)
}

/// Runs one delete statement: scans the table, deletes every row accepted
/// by `predicate` and commits. Returns the number of deleted rows.
///
/// On any failure the deleter's changes are discarded before it is closed,
/// and the first error is returned.
pub fn delete_matching<T, F>(table: &T, ctx: &QueryContext, mut predicate: F) -> Result<usize, T::Error>
where
    T: DeletableTable,
    F: FnMut(&Row) -> bool,
{
    let rows: Vec<Row> = scan(table, ctx)?
        .into_iter()
        .filter(|row| predicate(row))
        .collect();

    let mut deleter = table.deleter(ctx)?;
    deleter.statement_begin(ctx)?;

    let outcome = rows
        .iter()
        .try_for_each(|row| deleter.delete(ctx, row))
        .and_then(|()| deleter.statement_complete(ctx));

    match outcome {
        Ok(()) => {
            deleter.close(ctx)?;
            Ok(rows.len())
        }
        Err(err) => {
            // The statement error wins over secondary cleanup failures.
            let _ = deleter.discard_changes(ctx, &err);
            let _ = deleter.close(ctx);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fmt;
    use std::rc::Rc;

    use super::*;
    use crate::types::{Entity, EntityProperty};
    use crate::value::Value;

    #[derive(Debug)]
    struct FakeError(&'static str);

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Error for FakeError {}

    struct FakeTable {
        columns: Vec<Column>,
        partitions: Vec<Vec<Row>>,
        log: Rc<RefCell<Vec<String>>>,
        fail_on: Option<String>,
    }

    struct FakeDeleter {
        log: Rc<RefCell<Vec<String>>>,
        fail_on: Option<String>,
    }

    impl Table for FakeTable {
        type Error = FakeError;
        type Partition = usize;
        type Partitions = std::ops::Range<usize>;
        type Rows = std::vec::IntoIter<Row>;

        fn name(&self) -> &str {
            "fake"
        }

        fn schema(&self) -> &[Column] {
            &self.columns
        }

        fn partitions(&self, _ctx: &QueryContext) -> Result<Self::Partitions, FakeError> {
            Ok(0..self.partitions.len())
        }

        fn partition_rows(&self, _ctx: &QueryContext, p: &usize) -> Result<Self::Rows, FakeError> {
            Ok(self.partitions[*p].clone().into_iter())
        }
    }

    impl DeletableTable for FakeTable {
        type Deleter = FakeDeleter;

        fn deleter(&self, _ctx: &QueryContext) -> Result<FakeDeleter, FakeError> {
            Ok(FakeDeleter {
                log: Rc::clone(&self.log),
                fail_on: self.fail_on.clone(),
            })
        }
    }

    impl RowDeleter for FakeDeleter {
        type Error = FakeError;

        fn statement_begin(&mut self, _ctx: &QueryContext) -> Result<(), FakeError> {
            self.log.borrow_mut().push("begin".into());
            Ok(())
        }

        fn delete(&mut self, _ctx: &QueryContext, row: &Row) -> Result<(), FakeError> {
            let key = row.get(0).map(Value::to_string).unwrap_or_default();
            if self.fail_on.as_deref() == Some(key.as_str()) {
                return Err(FakeError("boom"));
            }
            self.log.borrow_mut().push(format!("delete {key}"));
            Ok(())
        }

        fn discard_changes(&mut self, _ctx: &QueryContext, cause: &(dyn Error + 'static)) -> Result<(), FakeError> {
            self.log.borrow_mut().push(format!("discard {cause}"));
            Ok(())
        }

        fn statement_complete(&mut self, _ctx: &QueryContext) -> Result<(), FakeError> {
            self.log.borrow_mut().push("complete".into());
            Ok(())
        }

        fn close(&mut self, _ctx: &QueryContext) -> Result<(), FakeError> {
            self.log.borrow_mut().push("close".into());
            Ok(())
        }
    }

    fn fake_table(fail_on: Option<&str>) -> FakeTable {
        let entity = Entity::new("fake").with_property("id", EntityProperty::new("uuid").primary());
        FakeTable {
            columns: entity.columns(),
            partitions: vec![
                vec![Row::new(vec!["a".into()]), Row::new(vec!["b".into()])],
                vec![Row::new(vec!["c".into()])],
            ],
            log: Rc::new(RefCell::new(Vec::new())),
            fail_on: fail_on.map(String::from),
        }
    }

    #[test]
    fn test_scan_reads_all_partitions() {
        let table = fake_table(None);
        let rows = scan(&table, &QueryContext::new()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(table.schema().len(), 1);
    }

    #[test]
    fn test_delete_matching_runs_statement_lifecycle() {
        let table = fake_table(None);
        let deleted = delete_matching(&table, &QueryContext::new(), |row| {
            row.get(0) != Some(&Value::Text("b".into()))
        })
        .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            *table.log.borrow(),
            vec!["begin", "delete a", "delete c", "complete", "close"]
        );
    }

    #[test]
    fn test_delete_matching_discards_on_failure() {
        let table = fake_table(Some("c"));
        let err = delete_matching(&table, &QueryContext::new(), |_| true).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(
            *table.log.borrow(),
            vec!["begin", "delete a", "delete b", "discard boom", "close"]
        );
    }
}
