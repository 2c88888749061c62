//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{MonitorError, Result};

/// Environment prefix for overrides, e.g. `MONITOR__SETTINGS__LOG_LEVEL=debug`
pub const ENV_PREFIX: &str = "MONITOR";

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with MONITOR__)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if !Path::new(path).exists() {
            return Err(MonitorError::Configuration(format!(
                "config file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::with_name(path));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let app: AppConfig = config.try_deserialize()?;
    validate(&app)?;
    Ok(app)
}

/// Parse configuration from an in-memory TOML document
pub fn load_from_str(toml: &str) -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(toml, config::FileFormat::Toml))
        .build()?;
    let app: AppConfig = config.try_deserialize()?;
    validate(&app)?;
    Ok(app)
}

fn validate(app: &AppConfig) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for monitor in &app.monitors {
        if !seen.insert(monitor.execution_id.as_str()) {
            return Err(MonitorError::DuplicateMonitor(monitor.execution_id.clone()));
        }
    }
    if app.replacement.near_match_tolerance.is_sign_negative() {
        return Err(MonitorError::Configuration(format!(
            "replacement.near_match_tolerance must not be negative (got {})",
            app.replacement.near_match_tolerance
        )));
    }
    Ok(())
}
