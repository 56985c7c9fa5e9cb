//! SQL generation for the in-memory row store.
//!
//! Each materialized table gets one SQLite table whose layout follows the
//! column list of its [`TableDefinition`](shopsql_core::TableDefinition).
//! Identifiers are double-quoted because entity property names are
//! camel-cased and may collide with SQL keywords (`group`, `order`, ...).
//!
//! # Type affinity
//!
//! | Column type | SQLite type |
//! |-------------|-------------|
//! | `Text`      | `TEXT`      |
//! | `Json`      | `BLOB`      |
//! | `Boolean`   | `INTEGER`   |
//! | `Float64`   | `REAL`      |
//!
//! Columns carrying the `json` comment are stored as `BLOB` regardless of
//! their mapped type since they hold serialized JSON bytes.

use shopsql_core::{Column, ColumnType};

/// Quotes an identifier, doubling embedded quotes.
///
/// # Examples
///
/// ```
/// use shopsql_adapter::quote_ident;
///
/// assert_eq!(quote_ident("order"), "\"order\"");
/// assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite storage type of a column.
pub(crate) fn storage_type(column: &Column) -> &'static str {
    if column.is_json() {
        return "BLOB";
    }
    match column.column_type {
        ColumnType::Text => "TEXT",
        ColumnType::Json => "BLOB",
        ColumnType::Boolean => "INTEGER",
        ColumnType::Float64 => "REAL",
    }
}

/// Column created for tables without any mapped column, since SQLite
/// rejects empty tables.
pub(crate) const PLACEHOLDER_COLUMN: &str = "_placeholder";

/// Generates the `CREATE TABLE` statement for a row store table.
///
/// The primary key is not declared as a constraint: the remote side owns
/// key uniqueness and a duplicate in a search result must not abort the
/// materialization.
///
/// # Examples
///
/// ```
/// use shopsql_adapter::generate_table_sql;
/// use shopsql_core::{Entity, EntityProperty};
///
/// let entity = Entity::new("tax")
///     .with_property("id", EntityProperty::new("uuid").primary())
///     .with_property("taxRate", EntityProperty::new("float"));
///
/// let sql = generate_table_sql("tax", &entity.columns());
/// assert_eq!(sql, "CREATE TABLE \"tax\" (\"id\" TEXT NOT NULL, \"taxRate\" REAL)");
/// ```
pub fn generate_table_sql(table: &str, columns: &[Column]) -> String {
    if columns.is_empty() {
        return format!(
            "CREATE TABLE {} ({} INTEGER)",
            quote_ident(table),
            quote_ident(PLACEHOLDER_COLUMN)
        );
    }
    let body = columns
        .iter()
        .map(|column| {
            let null = if column.nullable { "" } else { " NOT NULL" };
            format!("{} {}{null}", quote_ident(&column.name), storage_type(column))
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({body})", quote_ident(table))
}

/// Column list for `SELECT` statements, in schema order.
pub(crate) fn column_list(columns: &[Column]) -> String {
    if columns.is_empty() {
        return "NULL".to_string();
    }
    columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}
