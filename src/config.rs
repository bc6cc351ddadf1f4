use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongodb,
    Jsonl,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Mongodb => write!(f, "mongodb"),
            StorageBackend::Jsonl => write!(f, "jsonl"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// MongoDB connection string
    #[serde(default)]
    pub uri: Option<String>,
    /// Falls back to the database named in the URI, then `test`
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Product dump used by the `jsonl` backend
    #[serde(default)]
    pub jsonl_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_collection() -> String {
    "openfoodfacts-products".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_limit() -> u64 {
    10
}

fn default_max_limit() -> u64 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            uri: None,
            database: None,
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
            jsonl_path: None,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the optional TOML file and the process environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, or fall back to defaults when it does not exist
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment overrides through `lookup`. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", port))?;
        }
        if let Some(uri) = lookup("MONGODB_URI") {
            self.storage.uri = Some(uri);
        }
        if let Some(database) = lookup("MONGODB_DATABASE") {
            self.storage.database = Some(database);
        }
        if let Some(collection) = lookup("MONGODB_COLLECTION") {
            self.storage.collection = collection;
        }
        if let Some(path) = lookup("PRODUCTS_JSONL") {
            self.storage.backend = StorageBackend::Jsonl;
            self.storage.jsonl_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match self.storage.backend {
            StorageBackend::Mongodb => {
                if self.storage.uri.as_deref().is_none_or(|u| u.trim().is_empty()) {
                    anyhow::bail!("MONGODB_URI is required for the mongodb storage backend");
                }
            }
            StorageBackend::Jsonl => {
                if self.storage.jsonl_path.is_none() {
                    anyhow::bail!("PRODUCTS_JSONL is required for the jsonl storage backend");
                }
            }
        }
        if self.pagination.max_limit == 0 {
            anyhow::bail!("pagination.max_limit must be at least 1");
        }
        if self.pagination.default_limit == 0 || self.pagination.default_limit > self.pagination.max_limit {
            anyhow::bail!(
                "pagination.default_limit must be between 1 and {}",
                self.pagination.max_limit
            );
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_public_service() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.storage.collection, "openfoodfacts-products");
        assert_eq!(config.storage.backend, StorageBackend::Mongodb);
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
    }

    #[test]
    fn toml_sections_are_optional() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [pagination]
            max_limit = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.pagination.max_limit, 50);
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.storage.connect_timeout_secs, 10);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = AppConfig::from_toml_str("[storage]\nuri = \"mongodb://file\"\n").unwrap();
        config
            .apply_overrides(env(&[
                ("PORT", "5000"),
                ("MONGODB_URI", "mongodb://env:27017/catalog"),
                ("MONGODB_COLLECTION", "products"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.uri.as_deref(), Some("mongodb://env:27017/catalog"));
        assert_eq!(config.storage.collection, "products");
        config.validate().unwrap();
    }

    #[test]
    fn jsonl_override_switches_backend() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("PRODUCTS_JSONL", "data/products.jsonl")]))
            .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Jsonl);
        config.validate().unwrap();
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_overrides(env(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("PORT", ""), ("HOST", "  "), ("MONGODB_COLLECTION", "")]))
            .unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.collection, "openfoodfacts-products");
    }

    #[test]
    fn mongodb_backend_requires_uri() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));
    }

    #[test]
    fn default_limit_cannot_exceed_max() {
        let mut config = AppConfig::from_toml_str(
            "[storage]\nuri = \"mongodb://localhost\"\n[pagination]\ndefault_limit = 200\nmax_limit = 100\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
        config.pagination.default_limit = 100;
        config.validate().unwrap();
    }
}
