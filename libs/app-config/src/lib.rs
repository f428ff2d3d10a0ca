//! Configuration file loading for services.
//!
//! Any `serde`-deserializable settings struct can be loaded from a JSON or
//! YAML file; the format is chosen by the file extension. Environment
//! variables overlay the file values, so deployments can override single
//! keys without editing files (`SERVER__PORT=8080` overrides `server.port`).

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use tracing::info;

/// Load settings from `path`, then overlay environment variables.
///
/// Nested keys are addressed with `__` in variable names.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let cfg = Config::builder()
        .add_source(File::from(path))
        .add_source(Environment::default().separator("__"))
        .build()
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;

    cfg.try_deserialize()
        .with_context(|| format!("failed to deserialize configuration from {}", path.display()))
}

/// Load settings from environment variables alone.
///
/// Variable names are prefixed: with prefix `APP`, the key `server.port`
/// is read from `APP__SERVER__PORT`.
pub fn load_env<T: DeserializeOwned>(prefix: &str) -> Result<T> {
    let cfg = Config::builder()
        .add_source(Environment::with_prefix(prefix).prefix_separator("__").separator("__"))
        .build()
        .context("failed to read configuration from environment")?;

    cfg.try_deserialize()
        .context("failed to deserialize configuration from environment")
}

/// Load a `.env` file in development builds, if one exists.
pub fn load_dotenv() {
    if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
        info!("loaded .env file for development");
    }
}
