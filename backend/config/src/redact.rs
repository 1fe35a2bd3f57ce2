//! Safe-to-print view of a config.

use crate::schema::ParleyConfig;
use serde_json::Value;

/// Keys whose string values are secrets.
const SECRET_KEYS: &[&str] = &["api_key", "apikey", "token", "secret", "password"];

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Serialize `config` with every secret masked to its first three characters.
pub fn redact(config: &ParleyConfig) -> Value {
    let mut value = serde_json::to_value(config).unwrap_or(Value::Null);
    mask(&mut value);
    value
}

fn mask(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match child {
                    Value::String(s) if is_secret_key(key) && !s.is_empty() => {
                        let prefix: String = s.chars().take(3).collect();
                        *child = Value::String(format!("{prefix}***"));
                    }
                    _ => mask(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_masked() {
        let mut cfg = ParleyConfig::default();
        cfg.llm.api_key = Some("sk-verysecret".to_string());
        let out = redact(&cfg);
        assert_eq!(out["llm"]["api_key"], "sk-***");
        assert_eq!(out["llm"]["model"], "gpt-4o-mini");
    }

    #[test]
    fn absent_key_stays_absent() {
        let out = redact(&ParleyConfig::default());
        assert!(out["llm"].get("api_key").is_none());
    }
}
