//! Config validation with field paths in every message.

use crate::schema::{ParleyConfig, ProviderKind};
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a config after defaults have been applied.
pub fn validate(config: &ParleyConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_llm(config, &mut report);
    validate_agent(config, &mut report);
    validate_logging(config, &mut report);
    validate_marks(config, &mut report);
    report
}

fn validate_server(config: &ParleyConfig, report: &mut ValidationReport) {
    let port = config.server.port;
    if port == 0 {
        report.error("server.port", "port must be > 0");
    } else if port < 1024 && port != 80 && port != 443 {
        report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        );
    }
    if config.server.bind.trim().is_empty() {
        report.error("server.bind", "bind address cannot be empty");
    }
}

fn validate_llm(config: &ParleyConfig, report: &mut ValidationReport) {
    let llm = &config.llm;
    match llm.provider {
        Some(ProviderKind::OpenAi) => {
            if llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                report.error(
                    "llm.api_key",
                    "openai provider needs an API key (set llm.api_key or OPENAI_API_KEY)",
                );
            }
            if llm.model.trim().is_empty() {
                report.error("llm.model", "model cannot be empty");
            }
        }
        Some(ProviderKind::Mock) => {
            report.warn("llm.provider", "mock provider answers with canned replies only");
        }
        Some(ProviderKind::Keyword) | None => {}
    }
    if llm.request_timeout_secs == 0 {
        report.error("llm.request_timeout_secs", "request timeout must be > 0");
    }
    if llm.max_tokens == 0 {
        report.error("llm.max_tokens", "max_tokens must be > 0");
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        report.error("llm.temperature", "temperature must be between 0 and 2");
    }
    if let Some(url) = &llm.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            report.error("llm.base_url", format!("'{url}' is not an http(s) URL"));
        }
    }
}

fn validate_agent(config: &ParleyConfig, report: &mut ValidationReport) {
    let agent = &config.agent;
    if agent.classification_timeout_ms == 0 {
        report.error("agent.classification_timeout_ms", "timeout must be > 0");
    }
    if agent.history_window == 0 {
        report.warn(
            "agent.history_window",
            "history window is 0; follow-up questions will lose context",
        );
    }
    if agent.history_token_budget == 0 {
        report.error("agent.history_token_budget", "token budget must be > 0");
    }
    for (i, keyword) in agent.safety_keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            report.error(format!("agent.safety_keywords[{i}]"), "safety keyword cannot be empty");
        }
    }
}

fn validate_logging(config: &ParleyConfig, report: &mut ValidationReport) {
    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        report.warn(
            "logging.level",
            format!("'{level}' is not a plain level; it will be read as a filter directive"),
        );
    }
}

fn validate_marks(config: &ParleyConfig, report: &mut ValidationReport) {
    if let Some(csv) = &config.marks.csv {
        if !csv.exists() {
            report.error("marks.csv", format!("file not found: {}", csv.display()));
        }
    }
}
