//! `modhost-config`: runtime configuration for the module host.
//!
//! Provides:
//! - Typed config schema (logging, bus, loader)
//! - YAML loading from the config directory
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{BusConfig, LoaderConfig, LoggingConfig, ModHostConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load, apply env substitution and defaults, then validate a config file.
///
/// This is the main entry point for loading a config at runtime. A missing
/// file yields the defaults; validation errors fail the load.
pub async fn load_and_prepare(path: &Path) -> Result<ModHostConfig> {
    let config = match load_config(path).await? {
        Some(value) => {
            let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
            serde_json::from_value::<Option<ModHostConfig>>(value)
                .context("Failed to deserialize config")?
                .unwrap_or_default()
        }
        None => ModHostConfig::default(),
    };

    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{} config error(s); first: {first}", report.errors.len());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modhost_core::LoadingStage;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_and_prepare(&config_file_path(dir.path())).await.unwrap();
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.stages(), LoadingStage::ALL.to_vec());
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "").unwrap();
        let config = load_and_prepare(&path).await.unwrap();
        assert!(!config.abort_on_first_failure());
    }

    #[tokio::test]
    async fn invalid_stages_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "loader:\n  stages: [common_setup]\n").unwrap();
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("loader.stages"));
    }

    #[tokio::test]
    async fn unknown_stage_name_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "loader:\n  stages: [construct, warp_speed]\n").unwrap();
        assert!(load_and_prepare(&path).await.is_err());
    }
}
