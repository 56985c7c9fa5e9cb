//! Error types for the adapter.
//!
//! Wraps the row store, the admin API and table lookup failures in one
//! enum so every [`Table`](shopsql_core::Table) and
//! [`RowDeleter`](shopsql_core::RowDeleter) method shares an error type.

use shopsql_client::ApiError;
use thiserror::Error;

/// Errors surfaced to the query engine.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// In-memory row store failure.
    #[error("row store error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Admin API request failed or its response did not decode.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A remote value does not fit its column type.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// No table of that name exists in the database.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A deleter was requested before the table was read in this statement.
    #[error("table {0} has not been materialized in this statement")]
    NotMaterialized(String),

    /// The row handed to a deleter is not present in the row store.
    #[error("row not found in {0}")]
    RowNotFound(String),

    /// Deletes need a primary key to address remote records.
    #[error("table {0} has no primary key")]
    MissingPrimaryKey(String),

    /// A mutex guarding adapter state was poisoned by a panicking thread.
    #[error("adapter state lock poisoned")]
    LockPoisoned,
}

impl AdapterError {
    /// Returns `true` for transport-class failures: network errors,
    /// non-success statuses and cancellation.
    pub fn is_transport(&self) -> bool {
        matches!(self, AdapterError::Api(err) if err.is_transport())
    }

    /// Returns `true` if a remote response did not have the expected shape.
    pub fn is_decode(&self) -> bool {
        matches!(self, AdapterError::Api(err) if err.is_decode())
    }
}

impl<T> From<std::sync::PoisonError<T>> for AdapterError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        AdapterError::LockPoisoned
    }
}

/// Convenience alias for results with [`AdapterError`].
pub type Result<T> = std::result::Result<T, AdapterError>;
