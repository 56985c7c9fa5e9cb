//! Project configuration for connecting the adapter to a shop.
//!
//! Loaded from a YAML file (typically `.shopware-project.yml` in the
//! project root).
//!
//! # Example YAML
//!
//! ```yaml
//! url: https://shop.example.com
//! admin_api:
//!   client_id: SWIAEXAMPLE
//!   client_secret: secret
//! adapter:
//!   database_name: shopware
//!   partitions: 1
//!   timeout_secs: 30
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Default name of the project configuration file.
pub const DEFAULT_CONFIG_FILE: &str = ".shopware-project.yml";

/// Admin API credentials.
///
/// Either an integration (`client_id` + `client_secret`) or an admin user
/// (`username` + `password`). A username takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminApiConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// How the adapter exposes the shop to the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Database name the engine addresses.
    #[serde(default = "default_database_name")]
    pub database_name: String,
    /// Number of partitions each materialized table is split into.
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Timeout of a single HTTP request in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_database_name() -> String {
    "shopware".to_string()
}

fn default_partitions() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            database_name: default_database_name(),
            partitions: default_partitions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level project configuration.
///
/// # Examples
///
/// ```
/// use shopsql_client::ShopConfig;
///
/// let config: ShopConfig = serde_yaml::from_str(r#"
/// url: https://shop.example.com
/// admin_api:
///   client_id: id
///   client_secret: secret
/// "#).unwrap();
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.adapter.database_name, "shopware");
/// assert_eq!(config.adapter.partitions, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Base URL of the shop, without the `/api` suffix.
    pub url: String,
    #[serde(default)]
    pub admin_api: AdminApiConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
}

impl ShopConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Io`] if the file cannot be read, or
    /// [`ApiError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Checks that the configuration can be used to connect.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] for an empty URL, missing
    /// credentials, or zero partitions.
    pub fn validate(&self) -> Result<()> {
        if self.base_url().is_empty() {
            return Err(ApiError::InvalidConfig("url must not be empty".into()));
        }
        let api = &self.admin_api;
        let has_password = !api.username.is_empty() && !api.password.is_empty();
        let has_integration = !api.client_id.is_empty() && !api.client_secret.is_empty();
        if !has_password && !has_integration {
            return Err(ApiError::InvalidConfig(
                "admin_api needs client_id/client_secret or username/password".into(),
            ));
        }
        if self.adapter.partitions == 0 {
            return Err(ApiError::InvalidConfig(
                "adapter.partitions must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
