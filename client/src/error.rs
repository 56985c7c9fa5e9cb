//! Error types for admin API access.
//!
//! Covers the transport, decode and configuration failures of talking to
//! the remote management API.

use thiserror::Error;

/// Errors that can occur while talking to the admin API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or HTTP client failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    /// The statement context was cancelled before the request completed.
    #[error("request cancelled")]
    Cancelled,

    /// Response body did not match the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration is missing required values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Token endpoint rejected the credentials or returned garbage.
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    /// Returns `true` for failures reaching the API (network, status,
    /// authentication, cancellation).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_) | ApiError::Status { .. } | ApiError::Cancelled | ApiError::Auth(_)
        )
    }

    /// Returns `true` if a response body could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode(_))
    }
}

/// Convenience alias for results with [`ApiError`].
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ApiError::Cancelled.is_transport());
        let status = ApiError::Status {
            method: "POST",
            path: "/api/_action/sync".into(),
            status: 500,
            body: String::new(),
        };
        assert!(status.is_transport());
        assert!(status.to_string().contains("status 500"));

        let decode = ApiError::from(serde_json::from_str::<u8>("nope").unwrap_err());
        assert!(decode.is_decode());
        assert!(!decode.is_transport());
        assert!(!ApiError::InvalidConfig("x".into()).is_transport());

        let encode = ApiError::Encode(serde_json::from_str::<u8>("nope").unwrap_err());
        assert!(!encode.is_decode());
        assert!(!encode.is_transport());
        assert!(encode.to_string().starts_with("encode error"));
    }
}
