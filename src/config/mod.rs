mod env;
pub use env::{apply_env_overrides, apply_overrides};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Prefix prepended to every entity path ("" mounts at the root)
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
    /// Maximum accepted request body
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_path_prefix() -> String {
    "/v1".to_string()
}

fn default_cors_enabled() -> bool {
    true
}

fn default_body_limit_bytes() -> usize {
    1_048_576 // 1 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path_prefix: default_path_prefix(),
            cors_enabled: default_cors_enabled(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

/// Which entity store backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Database file, only read by the sqlite backend
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Memory
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("sensorthings.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
