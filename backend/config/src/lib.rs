//! `parley-config`: Parley runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, llm, agent, storage, logging, marks)
//! - YAML read/write with backup rotation
//! - `${ENV_VAR}` substitution
//! - Environment shortcuts and derived defaults
//! - Validation and redaction for display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config_value, write_config};
pub use redact::redact;
pub use schema::{
    AgentConfig, LlmConfig, LoggingConfig, MarksConfig, ParleyConfig, ProviderKind,
    RecorderSetting, ServerConfig, StorageBackend, StorageConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a config file, substitute env vars, apply defaults, and validate.
///
/// Warnings are logged; any validation error fails the load. This is the
/// main entry point at startup.
pub async fn load_and_prepare(path: &Path) -> Result<ParleyConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let raw = load_config_value(path).await?;
    prepare(raw, &env, config_dir)
}

/// The pure half of [`load_and_prepare`].
pub fn prepare(
    raw: serde_json::Value,
    env: &HashMap<String, String>,
    config_dir: &Path,
) -> Result<ParleyConfig> {
    tracing::debug!(vars = ?collect_referenced_vars(&raw), "Config references env vars");
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;
    let config: ParleyConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_all_defaults(config, env, config_dir);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }

    Ok(config)
}
