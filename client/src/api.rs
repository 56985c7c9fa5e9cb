//! Transport abstraction over the admin API.
//!
//! Everything the adapter sends goes through [`AdminApi::send`], which
//! moves raw JSON bytes. Decoding happens in [`get_json`] / [`post_json`]
//! so decode failures are reported separately from transport failures.

use serde::Serialize;
use serde::de::DeserializeOwned;
use shopsql_core::{QueryContext, api_entity_name};

use crate::error::{ApiError, Result};

/// Entity schema document endpoint.
pub const ENTITY_SCHEMA_PATH: &str = "/api/_info/entity-schema.json";

/// Batched write endpoint.
pub const SYNC_PATH: &str = "/api/_action/sync";

/// OAuth2 token endpoint.
pub const TOKEN_PATH: &str = "/api/oauth/token";

/// Search endpoint of one entity.
///
/// # Examples
///
/// ```
/// assert_eq!(shopsql_client::search_path("order_line_item"), "/api/search/order-line-item");
/// ```
pub fn search_path(entity: &str) -> String {
    format!("/api/search/{}", api_entity_name(entity))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One request against the API, relative to the shop's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    /// JSON body; `None` sends an empty body.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Vec<u8>>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }

    /// Parses the body as JSON, `None` for an empty body.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

/// Authenticated access to the admin API.
///
/// Implementations must honour [`QueryContext::is_cancelled`] by failing
/// with [`ApiError::Cancelled`](crate::ApiError::Cancelled).
pub trait AdminApi: Send + Sync {
    /// Sends `request` and returns the response body of a successful call.
    fn send(&self, ctx: &QueryContext, request: ApiRequest) -> Result<Vec<u8>>;
}

/// `GET path` and decode the response as `T`.
pub fn get_json<T: DeserializeOwned>(api: &dyn AdminApi, ctx: &QueryContext, path: &str) -> Result<T> {
    let body = api.send(ctx, ApiRequest::get(path))?;
    Ok(serde_json::from_slice(&body)?)
}

/// `POST path` with an optional JSON body and decode the response as `T`.
pub fn post_json<B, T>(api: &dyn AdminApi, ctx: &QueryContext, path: &str, body: Option<&B>) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let payload = body
        .map(serde_json::to_vec)
        .transpose()
        .map_err(ApiError::Encode)?;
    let response = api.send(ctx, ApiRequest::post(path, payload))?;
    Ok(serde_json::from_slice(&response)?)
}

/// `POST path` with a JSON body, ignoring the response body.
pub fn post_unit<B: Serialize + ?Sized>(
    api: &dyn AdminApi,
    ctx: &QueryContext,
    path: &str,
    body: &B,
) -> Result<()> {
    let payload = serde_json::to_vec(body).map_err(ApiError::Encode)?;
    api.send(ctx, ApiRequest::post(path, Some(payload)))?;
    Ok(())
}
