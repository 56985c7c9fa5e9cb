//! Conversion between remote JSON records, engine [`Value`]s and SQLite
//! cells.
//!
//! Remote records arrive as JSON objects keyed by property name. Each key
//! that names a schema column is converted according to the column type;
//! keys with no matching column are dropped. Columns tagged with the
//! `json` comment keep the raw document as serialized bytes.

use rusqlite::types::{Value as SqlValue, ValueRef};
use shopsql_core::{Column, ColumnType, Row, TableDefinition, Value};

use crate::error::{AdapterError, Result};

/// Converts one JSON value into the cell of `column`.
///
/// # Errors
///
/// Returns [`AdapterError::Conversion`] if the value cannot be represented
/// in a boolean or numeric column.
pub fn json_to_value(column: &Column, value: serde_json::Value) -> Result<Value> {
    use serde_json::Value as Json;

    if value.is_null() {
        return Ok(Value::Null);
    }
    if column.is_json() || column.column_type == ColumnType::Json {
        return Ok(Value::Json(serde_json::to_vec(&value).map_err(|e| {
            AdapterError::Conversion(format!("{}: {e}", column.name))
        })?));
    }

    match column.column_type {
        ColumnType::Text => Ok(Value::Text(match value {
            Json::String(s) => s,
            other => other.to_string(),
        })),
        ColumnType::Boolean => match &value {
            Json::Bool(b) => Ok(Value::Boolean(*b)),
            Json::Number(n) => Ok(Value::Boolean(n.as_f64().is_some_and(|f| f != 0.0))),
            Json::String(s) => match s.as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(mismatch(column, &value)),
            },
            _ => Err(mismatch(column, &value)),
        },
        ColumnType::Float64 => match &value {
            Json::Number(n) => n.as_f64().map(Value::Float).ok_or_else(|| mismatch(column, &value)),
            Json::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch(column, &value)),
            Json::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            _ => Err(mismatch(column, &value)),
        },
        // Handled above together with json-commented columns.
        ColumnType::Json => Err(mismatch(column, &value)),
    }
}

fn mismatch(column: &Column, value: &serde_json::Value) -> AdapterError {
    AdapterError::Conversion(format!(
        "column {} ({}) cannot hold {value}",
        column.name,
        column.column_type.sql_name()
    ))
}

/// Builds a row in schema order from one remote record.
///
/// Columns absent from the record stay null; record fields without a
/// column are ignored.
pub fn record_to_row(
    definition: &TableDefinition,
    record: serde_json::Map<String, serde_json::Value>,
) -> Result<Row> {
    let mut row = Row::nulls(definition.columns.len());
    for (key, value) in record {
        if let Some(index) = definition.index_of(&key) {
            row.set(index, json_to_value(&definition.columns[index], value)?);
        }
    }
    Ok(row)
}

/// Converts a cell into a SQLite parameter.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Json(bytes) => SqlValue::Blob(bytes.clone()),
    }
}

/// Reads a SQLite cell back into the value type of `column`.
pub(crate) fn from_sql(column: &Column, cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if column.column_type == ColumnType::Boolean => Value::Boolean(i != 0),
        ValueRef::Integer(i) => Value::Float(i as f64),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Json(bytes.to_vec()),
    }
}
