//! Wiring: turn a prepared [`ParleyConfig`] into a running [`ChatService`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use parley_agent::{AgentContext, ChatService, RecorderMode, Router, RouterSettings};
use parley_config::{ParleyConfig, ProviderKind, RecorderSetting, StorageBackend};
use parley_logging::mask_secret;
use parley_memory::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use parley_planner::providers::{MockProvider, OpenAiProvider};
use parley_planner::{Classifier, KeywordClassifier, LlmClassifier, LlmSettings};
use parley_tools::{builtin_registry, CrisisDetector, MarksBook};

/// Config file path: `--config` if given, else `<config dir>/config.yaml`.
pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| parley_config::config_file_path(&parley_config::config_dir()))
}

pub fn load_marks(config: &ParleyConfig) -> Result<MarksBook> {
    match &config.marks.csv {
        Some(path) => MarksBook::from_csv(path),
        None => Ok(MarksBook::builtin()),
    }
}

pub fn build_store(config: &ParleyConfig) -> Result<Arc<dyn SessionStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory session store; history is lost on exit");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        StorageBackend::Sqlite => {
            let path = config
                .storage
                .path
                .clone()
                .context("storage.path is required for the sqlite backend")?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
            info!(path = %path.display(), "Using SQLite session store");
            Ok(Arc::new(SqliteSessionStore::open(&path)?))
        }
    }
}

pub fn build_classifier(config: &ParleyConfig, book: MarksBook) -> Result<Arc<dyn Classifier>> {
    let llm = &config.llm;
    let settings = LlmSettings {
        model: llm.model.clone(),
        max_tokens: llm.max_tokens,
        temperature: llm.temperature,
    };

    let classifier: Arc<dyn Classifier> = match llm.provider.unwrap_or(ProviderKind::Keyword) {
        ProviderKind::OpenAi => {
            let key = llm
                .api_key
                .clone()
                .context("llm.api_key is required for the openai provider")?;
            let mut provider =
                OpenAiProvider::new(key.clone(), Duration::from_secs(llm.request_timeout_secs))?;
            if let Some(url) = &llm.base_url {
                provider = provider.with_base_url(url);
            }
            info!(model = %llm.model, api_key = %mask_secret(&key), "Using LLM classifier");
            Arc::new(LlmClassifier::new(Arc::new(provider), settings))
        }
        ProviderKind::Mock => {
            info!("Using mock LLM classifier");
            let provider = MockProvider::new("mock")
                .with_response("This is a canned reply from the mock provider.");
            Arc::new(LlmClassifier::new(Arc::new(provider), settings))
        }
        ProviderKind::Keyword => {
            info!("Using offline keyword classifier");
            Arc::new(KeywordClassifier::new(book))
        }
    };
    Ok(classifier)
}

pub fn router_settings(config: &ParleyConfig) -> RouterSettings {
    RouterSettings {
        history_window: config.agent.history_window,
        history_token_budget: config.agent.history_token_budget,
        classification_timeout: Duration::from_millis(config.agent.classification_timeout_ms),
    }
}

/// Build the whole chat stack.
pub fn build_service(config: &ParleyConfig) -> Result<Arc<ChatService>> {
    let book = load_marks(config)?;
    let registry = builtin_registry(book.clone())?;
    let ctx = AgentContext {
        registry: Arc::new(registry),
        store: build_store(config)?,
        classifier: build_classifier(config, book)?,
    };

    let detector = CrisisDetector::new().with_extra_phrases(&config.agent.safety_keywords);
    let mode = match config.agent.recorder {
        RecorderSetting::Sync => RecorderMode::Sync,
        RecorderSetting::Background => RecorderMode::Background,
    };

    let service = ChatService::new(ctx, Router::new(detector, router_settings(config)), mode)
        .serialize_sessions(config.agent.serialize_sessions);
    Ok(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::ChatRequest;

    fn keyword_config() -> ParleyConfig {
        let mut config = ParleyConfig::default();
        config.llm.provider = Some(ProviderKind::Keyword);
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[tokio::test]
    async fn builds_keyword_service() {
        let service = build_service(&keyword_config()).unwrap();
        assert_eq!(service.tools().len(), 4);

        let reply = service
            .chat(ChatRequest {
                session_id: "cli".into(),
                message: "What did Priya score in maths?".into(),
            })
            .await;
        assert_eq!(reply.response, "Priya scored 88 in Maths (Grade: A)");
    }

    #[tokio::test]
    async fn sqlite_history_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = keyword_config();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = Some(dir.path().join("nested").join("parley.db"));

        let service = build_service(&config).unwrap();
        service
            .chat(ChatRequest {
                session_id: "keep".into(),
                message: "hello".into(),
            })
            .await;
        drop(service);

        let service = build_service(&config).unwrap();
        assert_eq!(service.history("keep").await.unwrap().history.len(), 1);
    }

    #[test]
    fn openai_requires_key() {
        let mut config = keyword_config();
        config.llm.provider = Some(ProviderKind::OpenAi);
        assert!(build_classifier(&config, MarksBook::builtin()).is_err());

        config.llm.api_key = Some("sk-test".into());
        config.llm.base_url = Some("http://localhost:11434/v1".into());
        assert!(build_classifier(&config, MarksBook::builtin()).is_ok());
    }

    #[test]
    fn custom_marks_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("marks.csv");
        std::fs::write(&csv, "student,subject,score\nMeera,History,91\n").unwrap();

        let mut config = keyword_config();
        config.marks.csv = Some(csv);
        let book = load_marks(&config).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.lookup("meera", "history").map(|r| r.score), Some(91));
    }

    #[test]
    fn router_settings_follow_config() {
        let mut config = keyword_config();
        config.agent.history_window = 3;
        config.agent.classification_timeout_ms = 250;
        let settings = router_settings(&config);
        assert_eq!(settings.history_window, 3);
        assert_eq!(settings.classification_timeout, Duration::from_millis(250));
    }
}
