//! In-memory [`AdminApi`] serving canned responses.
//!
//! Enabled with the `mock` feature. Every request is recorded so tests can
//! assert on exactly what would have been sent to the shop.

use std::collections::HashMap;
use std::sync::Mutex;

use shopsql_core::QueryContext;

use crate::api::{AdminApi, ApiRequest, ENTITY_SCHEMA_PATH, Method, SYNC_PATH, search_path};
use crate::error::{ApiError, Result};

#[derive(Debug, Clone)]
enum Canned {
    Body(Vec<u8>),
    Status(u16),
}

/// Admin API double keyed by (method, path).
#[derive(Debug, Default)]
pub struct MockAdminApi {
    responses: Mutex<HashMap<(Method, String), Canned>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockAdminApi {
    /// Creates a mock that answers the sync endpoint with `{}` and every
    /// other path with 404.
    pub fn new() -> Self {
        let mock = Self::default();
        mock.respond(Method::Post, SYNC_PATH, serde_json::json!({}));
        mock
    }

    /// Serves `body` for `method path`.
    pub fn respond(&self, method: Method, path: &str, body: serde_json::Value) {
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        self.set(method, path, Canned::Body(bytes));
    }

    /// Serves raw bytes for `method path`.
    pub fn respond_raw(&self, method: Method, path: &str, body: impl Into<Vec<u8>>) {
        self.set(method, path, Canned::Body(body.into()));
    }

    /// Fails `method path` with an HTTP status.
    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.set(method, path, Canned::Status(status));
    }

    fn set(&self, method: Method, path: &str, canned: Canned) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert((method, path.to_string()), canned);
        }
    }

    /// Serves `schema` as the entity schema document.
    pub fn with_schema(self, schema: serde_json::Value) -> Self {
        self.respond(Method::Get, ENTITY_SCHEMA_PATH, schema);
        self
    }

    /// Serves `records` as the search result of `entity`.
    pub fn with_search(self, entity: &str, records: serde_json::Value) -> Self {
        let total = records.as_array().map_or(0, Vec::len);
        self.respond(
            Method::Post,
            &search_path(entity),
            serde_json::json!({ "total": total, "data": records }),
        );
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests sent to `path`, in order.
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Requests sent to the sync endpoint.
    pub fn sync_requests(&self) -> Vec<ApiRequest> {
        self.requests_to(SYNC_PATH)
    }
}

impl AdminApi for MockAdminApi {
    fn send(&self, ctx: &QueryContext, request: ApiRequest) -> Result<Vec<u8>> {
        if ctx.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let canned = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(&(request.method, request.path.clone())).cloned());

        match canned {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status)) => Err(ApiError::Status {
                method: request.method.as_str(),
                path: request.path,
                status,
                body: String::new(),
            }),
            None => Err(ApiError::Status {
                method: request.method.as_str(),
                path: request.path,
                status: 404,
                body: "no canned response".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_path_is_404() {
        let api = MockAdminApi::new();
        let err = api
            .send(&QueryContext::new(), ApiRequest::get("/api/nope"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert_eq!(api.requests_to("/api/nope").len(), 1);
    }

    #[test]
    fn test_cancelled_requests_are_not_recorded() {
        let api = MockAdminApi::new();
        let ctx = QueryContext::new();
        ctx.cancel();
        assert!(api.send(&ctx, ApiRequest::get(ENTITY_SCHEMA_PATH)).is_err());
        assert!(api.requests().is_empty());
    }

    #[test]
    fn test_failure_status() {
        let api = MockAdminApi::new();
        api.fail(Method::Post, SYNC_PATH, 500);
        let err = api
            .send(&QueryContext::new(), ApiRequest::post(SYNC_PATH, None))
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert_eq!(api.sync_requests().len(), 1);
    }
}
