//! Per-statement execution context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// Context passed by the query engine into every adapter call of one
/// statement.
///
/// Clones share the cancellation flag, so a handle kept by the engine can
/// cancel requests issued on behalf of the statement.
///
/// # Examples
///
/// ```
/// use shopsql_core::QueryContext;
///
/// let ctx = QueryContext::new();
/// let handle = ctx.clone();
/// assert!(!ctx.is_cancelled());
/// handle.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct QueryContext {
    query_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self {
            query_id: NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process-unique identifier, used to correlate log lines.
    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}
