//! reqwest-backed [`AdminApi`] with OAuth2 token handling.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use shopsql_core::QueryContext;
use tracing::debug;

use crate::api::{AdminApi, ApiRequest, Method, TOKEN_PATH};
use crate::config::ShopConfig;
use crate::error::{ApiError, Result};

/// Client id used by the administration for the password grant.
const ADMINISTRATION_CLIENT_ID: &str = "administration";

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 30;

/// Grant used to obtain access tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Integration credentials (`client_credentials` grant).
    Client { id: String, secret: String },
    /// Admin user credentials (`password` grant).
    Password { username: String, password: String },
}

impl Credentials {
    /// Picks the grant configured in `config`; a username wins over an
    /// integration.
    pub fn from_config(config: &ShopConfig) -> Result<Self> {
        let api = &config.admin_api;
        if !api.username.is_empty() && !api.password.is_empty() {
            return Ok(Credentials::Password {
                username: api.username.clone(),
                password: api.password.clone(),
            });
        }
        if !api.client_id.is_empty() && !api.client_secret.is_empty() {
            return Ok(Credentials::Client {
                id: api.client_id.clone(),
                secret: api.client_secret.clone(),
            });
        }
        Err(ApiError::InvalidConfig(
            "admin_api needs client_id/client_secret or username/password".into(),
        ))
    }

    fn token_request_body(&self) -> serde_json::Value {
        match self {
            Credentials::Client { id, secret } => serde_json::json!({
                "grant_type": "client_credentials",
                "client_id": id,
                "client_secret": secret,
            }),
            Credentials::Password { username, password } => serde_json::json!({
                "grant_type": "password",
                "client_id": ADMINISTRATION_CLIENT_ID,
                "scopes": "write",
                "username": username,
                "password": password,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + TimeDelta::seconds(TOKEN_REFRESH_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

/// Admin API client over blocking HTTP.
///
/// # Examples
///
/// ```no_run
/// use shopsql_client::{HttpAdminApi, ShopConfig, EntityRegistry};
/// use shopsql_core::QueryContext;
///
/// let config = ShopConfig::load(".shopware-project.yml").unwrap();
/// let api = HttpAdminApi::new(&config).unwrap();
/// let registry = EntityRegistry::load(&api, &QueryContext::new()).unwrap();
/// println!("{} entities", registry.len());
/// ```
pub struct HttpAdminApi {
    base_url: String,
    client: Client,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl HttpAdminApi {
    /// Builds a client for the shop described by `config`.
    ///
    /// No request is sent until the first call; the token is fetched
    /// lazily.
    pub fn new(config: &ShopConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.adapter.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
            credentials: Credentials::from_config(config)?,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn cached_token(&self) -> Result<Option<String>> {
        let slot = self
            .token
            .lock()
            .map_err(|_| ApiError::Auth("token cache poisoned".into()))?;
        Ok(slot
            .as_ref()
            .filter(|t| t.is_fresh(Utc::now()))
            .map(|t| t.value.clone()))
    }

    /// Returns a fresh access token. The token endpoint is called without
    /// holding the cache lock.
    fn bearer(&self) -> Result<String> {
        if let Some(value) = self.cached_token()? {
            return Ok(value);
        }
        let token = self.fetch_token()?;
        let value = token.value.clone();
        let mut slot = self
            .token
            .lock()
            .map_err(|_| ApiError::Auth("token cache poisoned".into()))?;
        *slot = Some(token);
        Ok(value)
    }

    fn fetch_token(&self) -> Result<AccessToken> {
        debug!(url = %self.base_url, "requesting access token");
        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .header(ACCEPT, "application/json")
            .json(&self.credentials.token_request_body())
            .send()?;

        let status = response.status();
        let body = response.bytes()?;
        if !status.is_success() {
            return Err(ApiError::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| ApiError::Auth(format!("invalid token response: {e}")))?;
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: parsed
                .expires_in
                .and_then(TimeDelta::try_seconds)
                .map(|ttl| Utc::now() + ttl),
        })
    }
}

impl AdminApi for HttpAdminApi {
    fn send(&self, ctx: &QueryContext, request: ApiRequest) -> Result<Vec<u8>> {
        if ctx.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let bearer = self.bearer()?;

        debug!(
            query_id = ctx.query_id(),
            method = request.method.as_str(),
            path = %request.path,
            "admin api request"
        );

        let url = self.url(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let mut builder = builder
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json");
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.bytes()?;

        if !status.is_success() {
            if ctx.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            return Err(ApiError::Status {
                method: request.method.as_str(),
                path: request.path,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ShopConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_username_wins_over_integration() {
        let cfg = config(
            r#"
url: http://shop.test
admin_api:
  client_id: id
  client_secret: secret
  username: admin
  password: pw
"#,
        );
        assert_eq!(
            Credentials::from_config(&cfg).unwrap(),
            Credentials::Password {
                username: "admin".into(),
                password: "pw".into()
            }
        );
    }

    #[test]
    fn test_password_grant_uses_administration_client() {
        let creds = Credentials::Password {
            username: "admin".into(),
            password: "pw".into(),
        };
        let body = creds.token_request_body();
        assert_eq!(body["grant_type"], "password");
        assert_eq!(body["client_id"], "administration");
        assert_eq!(body["scopes"], "write");
    }

    #[test]
    fn test_client_grant_body() {
        let creds = Credentials::Client {
            id: "id".into(),
            secret: "secret".into(),
        };
        let body = creds.token_request_body();
        assert_eq!(body["grant_type"], "client_credentials");
        assert_eq!(body["client_secret"], "secret");
    }

    #[test]
    fn test_token_freshness_margin() {
        let now = Utc::now();
        let token = AccessToken {
            value: "t".into(),
            expires_at: Some(now + TimeDelta::seconds(10)),
        };
        assert!(!token.is_fresh(now));

        let token = AccessToken {
            value: "t".into(),
            expires_at: Some(now + TimeDelta::seconds(600)),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn test_cancelled_context_fails_before_network() {
        let cfg = config(
            r#"
url: http://shop.invalid
admin_api:
  client_id: id
  client_secret: secret
"#,
        );
        let api = HttpAdminApi::new(&cfg).unwrap();
        let ctx = QueryContext::new();
        ctx.cancel();
        let err = api.send(&ctx, ApiRequest::get("/api/_info/version")).unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
    }
}
