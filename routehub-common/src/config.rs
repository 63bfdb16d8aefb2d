//! Configuration loading for the admin tooling
//!
//! Resolution priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! Endpoints and credentials only ever live in [`AdminConfig`]; the
//! reconciliation code receives collaborators that were built from it.

use crate::models::{AssociationStatus, ParentStatus, StatusFilter};
use crate::reconcile::DEFAULT_BATCH_SIZE;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENV_CONFIG_PATH: &str = "ROUTEHUB_CONFIG";
pub const ENV_BACKEND_URL: &str = "ROUTEHUB_BACKEND_URL";
pub const ENV_API_KEY: &str = "ROUTEHUB_API_KEY";
pub const ENV_DATABASE_URL: &str = "ROUTEHUB_DATABASE_URL";

/// Labor Safety, the service every company is expected to carry
pub const DEFAULT_ASSOCIATION_TYPE: &str = "შრომის უსაფრთხოება";

/// Full admin configuration (TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub backend: BackendConfig,
    pub database: DatabaseConfig,
    pub resources: ResourceNames,
    pub reconcile: ReconcileSettings,
}

/// Hosted REST backend
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, without the `/rest/v1` suffix
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    /// Rows requested per `Range` page
    pub page_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            page_size: 1000,
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_secs", &self.timeout_secs)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Direct PostgreSQL access for verification counts
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Table and column names on the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceNames {
    pub parents: String,
    pub associations: String,
    pub association_types: String,
    pub association_type_name_column: String,
    pub association_parent_column: String,
    /// Column on the link table referencing the service type
    pub association_type_column: String,
    pub latitude_column: String,
    pub longitude_column: String,
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            parents: "companies".to_string(),
            associations: "company_services".to_string(),
            association_types: "service_types".to_string(),
            association_type_name_column: "name_ka".to_string(),
            association_parent_column: "company_id".to_string(),
            association_type_column: "service_type_id".to_string(),
            latitude_column: "lat".to_string(),
            longitude_column: "lng".to_string(),
        }
    }
}

/// Defaults for the `reconcile` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub default_association_type: String,
    pub batch_size: usize,
    pub max_in_flight: usize,
    /// `any` or a company status
    pub parent_status: String,
    /// `any` or a link status
    pub association_status: String,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            default_association_type: DEFAULT_ASSOCIATION_TYPE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: 1,
            parent_status: ParentStatus::Active.to_string(),
            association_status: "any".to_string(),
        }
    }
}

impl ReconcileSettings {
    pub fn parent_filter(&self) -> Result<StatusFilter<ParentStatus>> {
        self.parent_status.parse()
    }

    pub fn association_filter(&self) -> Result<StatusFilter<AssociationStatus>> {
        self.association_status.parse()
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub database_url: Option<String>,
}

impl AdminConfig {
    /// Resolve configuration from all tiers
    ///
    /// A missing default config file is not an error; an explicitly named
    /// one (argument or `ROUTEHUB_CONFIG`) must exist.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let explicit = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
                None => {
                    warn!("Could not determine config directory, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env();
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = non_empty_env(ENV_API_KEY) {
            self.backend.api_key = key;
        }
        if let Some(url) = non_empty_env(ENV_DATABASE_URL) {
            self.database.url = Some(url);
        }
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.backend_url {
            self.backend.url = url.clone();
        }
        if let Some(key) = &overrides.api_key {
            self.backend.api_key = key.clone();
        }
        if let Some(url) = &overrides.database_url {
            self.database.url = Some(url.clone());
        }
    }

    /// Checks that hold regardless of which command runs
    pub fn validate(&self) -> Result<()> {
        if self.backend.page_size == 0 {
            return Err(Error::Config("backend.page_size must be at least 1".to_string()));
        }
        if self.reconcile.batch_size == 0 {
            return Err(Error::Config("reconcile.batch_size must be at least 1".to_string()));
        }
        if self.reconcile.max_in_flight == 0 {
            return Err(Error::Config("reconcile.max_in_flight must be at least 1".to_string()));
        }
        self.reconcile
            .parent_filter()
            .map_err(|e| Error::Config(format!("reconcile.parent_status: {}", e)))?;
        self.reconcile
            .association_filter()
            .map_err(|e| Error::Config(format!("reconcile.association_status: {}", e)))?;
        Ok(())
    }

    /// Backend URL and key, for commands that call the REST API
    pub fn require_backend(&self) -> Result<&BackendConfig> {
        if self.backend.url.trim().is_empty() {
            return Err(Error::Config(format!(
                "Backend URL not configured. Set one of:\n\
                 1. --backend-url <url>\n\
                 2. Environment: {}=<url>\n\
                 3. TOML config: [backend] url = \"...\"",
                ENV_BACKEND_URL
            )));
        }
        if self.backend.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "API key not configured. Set one of:\n\
                 1. --api-key <key>\n\
                 2. Environment: {}=<key>\n\
                 3. TOML config: [backend] api_key = \"...\"",
                ENV_API_KEY
            )));
        }
        Ok(&self.backend)
    }

    /// Database URL, for commands that query PostgreSQL directly
    pub fn require_database_url(&self) -> Result<&str> {
        self.database
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Database URL not configured. Use --database-url, {} or [database] url",
                    ENV_DATABASE_URL
                ))
            })
    }
}

/// `<config_dir>/routehub/admin.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("routehub").join("admin.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
