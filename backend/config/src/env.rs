//! `${VAR}` substitution in config values.
//!
//! Only uppercase names (`[A-Z_][A-Z0-9_]*`) are recognised. `$${VAR}` is an
//! escape and yields the literal text `${VAR}`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

/// Matches `$${NAME}` (escape) and `${NAME}` (reference) in one pass.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute references using `env`. Unset or empty variables are errors.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute(value, env, "")?)
}

fn substitute(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    Ok(match value {
        Value::String(s) => Value::String(substitute_str(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute(v, env, &child)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute_str(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let replaced = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// Names of every variable referenced in the tree, sorted and deduplicated.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.extend(
                ENV_REF
                    .captures_iter(s)
                    .filter(|caps| caps[1].is_empty())
                    .map(|caps| caps[2].to_string()),
            ),
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    let mut vars = Vec::new();
    walk(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_api_key() {
        let v = json!({"llm": {"api_key": "${OPENAI_API_KEY}"}});
        let out = resolve_env_vars_with(&v, &env(&[("OPENAI_API_KEY", "sk-abc")])).unwrap();
        assert_eq!(out["llm"]["api_key"], "sk-abc");
    }

    #[test]
    fn substitutes_inside_text() {
        let v = json!({"url": "http://${HOST}:11434/v1"});
        let out = resolve_env_vars_with(&v, &env(&[("HOST", "gpu-box")])).unwrap();
        assert_eq!(out["url"], "http://gpu-box:11434/v1");
    }

    #[test]
    fn missing_var_names_path() {
        let v = json!({"llm": {"api_key": "${NOPE}"}});
        let err = resolve_env_vars_with(&v, &env(&[])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("NOPE"));
        assert!(msg.contains("llm.api_key"));
    }

    #[test]
    fn empty_var_is_missing() {
        let v = json!({"k": "${EMPTY}"});
        assert!(resolve_env_vars_with(&v, &env(&[("EMPTY", "")])).is_err());
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"k": "$${HOME_DIR} and ${A}"});
        let out = resolve_env_vars_with(&v, &env(&[("A", "x")])).unwrap();
        assert_eq!(out["k"], "${HOME_DIR} and x");
    }

    #[test]
    fn lowercase_names_untouched() {
        let v = json!({"k": "${lower}"});
        let out = resolve_env_vars_with(&v, &env(&[])).unwrap();
        assert_eq!(out["k"], "${lower}");
    }

    #[test]
    fn arrays_and_scalars() {
        let v = json!({"list": ["${A}", 3, true]});
        let out = resolve_env_vars_with(&v, &env(&[("A", "a")])).unwrap();
        assert_eq!(out["list"], json!(["a", 3, true]));
    }

    #[test]
    fn collects_referenced_vars() {
        let v = json!({"a": "${FOO}", "b": {"c": "${BAR} $${SKIP}"}, "d": ["${FOO}"]});
        assert_eq!(collect_referenced_vars(&v), vec!["BAR", "FOO"]);
    }
}
