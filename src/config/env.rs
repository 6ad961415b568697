use super::AppConfig;
use std::path::PathBuf;
use tracing::warn;

/// Environment variable names, one per overridable setting
pub const ENV_BIND: &str = "SENSORTHINGS_BIND";
pub const ENV_PATH_PREFIX: &str = "SENSORTHINGS_PATH_PREFIX";
pub const ENV_CORS_ENABLED: &str = "SENSORTHINGS_CORS_ENABLED";
pub const ENV_BODY_LIMIT_BYTES: &str = "SENSORTHINGS_BODY_LIMIT_BYTES";
pub const ENV_STORAGE_BACKEND: &str = "SENSORTHINGS_STORAGE_BACKEND";
pub const ENV_SQLITE_PATH: &str = "SENSORTHINGS_SQLITE_PATH";

/// Apply `SENSORTHINGS_*` environment variables on top of `config`.
pub fn apply_env_overrides(config: &mut AppConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary lookup. Unparseable values are logged and skipped.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_BIND) {
        config.server.bind = v;
    }
    if let Some(v) = lookup(ENV_PATH_PREFIX) {
        config.server.path_prefix = v;
    }
    if let Some(v) = lookup(ENV_CORS_ENABLED) {
        match v.parse::<bool>() {
            Ok(b) => config.server.cors_enabled = b,
            Err(_) => warn!(key = ENV_CORS_ENABLED, value = %v, "Ignoring invalid override"),
        }
    }
    if let Some(v) = lookup(ENV_BODY_LIMIT_BYTES) {
        match v.parse::<usize>() {
            Ok(n) => config.server.body_limit_bytes = n,
            Err(_) => warn!(key = ENV_BODY_LIMIT_BYTES, value = %v, "Ignoring invalid override"),
        }
    }
    if let Some(v) = lookup(ENV_STORAGE_BACKEND) {
        match v.parse() {
            Ok(backend) => config.storage.backend = backend,
            Err(e) => warn!(key = ENV_STORAGE_BACKEND, error = %e, "Ignoring invalid override"),
        }
    }
    if let Some(v) = lookup(ENV_SQLITE_PATH) {
        config.storage.sqlite_path = PathBuf::from(v);
    }
}
