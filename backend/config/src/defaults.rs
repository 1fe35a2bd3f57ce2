//! Defaults that depend on the environment or on other settings.
//!
//! Plain field defaults live on the schema types; this pass fills what can
//! only be decided after loading.

use crate::schema::{ParleyConfig, ProviderKind, StorageBackend};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_DB_FILE: &str = "parley.db";

/// Apply environment shortcuts and derived defaults.
///
/// - `OPENAI_API_KEY` fills `llm.api_key` when none is configured.
/// - An unset `llm.provider` becomes `openai` with a key, else `keyword`.
/// - `PARLEY_PORT` overrides `server.port`.
/// - `PARLEY_DB` sets `storage.path` and selects the SQLite backend.
/// - A SQLite store without a path uses `<config_dir>/parley.db`.
pub fn apply_all_defaults(
    config: ParleyConfig,
    env: &HashMap<String, String>,
    config_dir: &Path,
) -> ParleyConfig {
    let config = apply_llm_defaults(config, env);
    let config = apply_server_defaults(config, env);
    apply_storage_defaults(config, env, config_dir)
}

fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn apply_llm_defaults(mut config: ParleyConfig, env: &HashMap<String, String>) -> ParleyConfig {
    let llm = &mut config.llm;
    if llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        llm.api_key = env_value(env, "OPENAI_API_KEY").map(str::to_string);
    }
    if llm.provider.is_none() {
        llm.provider = Some(if llm.api_key.is_some() {
            ProviderKind::OpenAi
        } else {
            ProviderKind::Keyword
        });
    }
    config
}

fn apply_server_defaults(mut config: ParleyConfig, env: &HashMap<String, String>) -> ParleyConfig {
    if let Some(port) = env_value(env, "PARLEY_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %port, "Ignoring PARLEY_PORT: not a port number"),
        }
    }
    config
}

fn apply_storage_defaults(
    mut config: ParleyConfig,
    env: &HashMap<String, String>,
    config_dir: &Path,
) -> ParleyConfig {
    if let Some(db) = env_value(env, "PARLEY_DB") {
        if config.storage.backend != StorageBackend::Sqlite {
            info!(path = %db, "PARLEY_DB set, switching storage to sqlite");
        }
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = Some(db.into());
    }
    if config.storage.backend == StorageBackend::Sqlite && config.storage.path.is_none() {
        config.storage.path = Some(config_dir.join(DEFAULT_DB_FILE));
    }
    config
}
