//! The chat facade used by every surface (HTTP, CLI).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use parley_core::{
    ChatRequest, ChatResponse, HistoryEntry, HistoryResponse, ParleyError, ResetResponse,
    ToolDescriptor,
};
use parley_logging::{AgentEvent, EventLogger};

use crate::recorder::{RecordOutcome, RecorderMode, TurnRecorder};
use crate::router::{AgentContext, Router};
use crate::session_lock::SessionLocks;

/// Length of minted session ids.
const SESSION_ID_LEN: usize = 8;

/// Fresh short session id.
pub fn mint_session_id() -> String {
    Uuid::new_v4().simple().to_string()[..SESSION_ID_LEN].to_string()
}

pub struct ChatService {
    ctx: AgentContext,
    router: Router,
    recorder: TurnRecorder,
    locks: Option<SessionLocks>,
}

impl ChatService {
    pub fn new(ctx: AgentContext, router: Router, mode: RecorderMode) -> Self {
        let recorder = TurnRecorder::new(Arc::clone(&ctx.store), mode);
        Self {
            ctx,
            router,
            recorder,
            locks: None,
        }
    }

    /// Hold a per-session lock across history load, routing, and recording.
    pub fn serialize_sessions(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(SessionLocks::new);
        self
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Handle one chat message. Always produces a response.
    #[instrument(skip(self, request), fields(session_id = tracing::field::Empty))]
    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let session_id = match request.session_id.trim() {
            "" => mint_session_id(),
            id => id.to_string(),
        };
        tracing::Span::current().record("session_id", session_id.as_str());

        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(&session_id).await),
            None => None,
        };

        let routed = self
            .router
            .route(&self.ctx, &session_id, &request.message)
            .await;
        let outcome = self
            .recorder
            .record(&session_id, &request.message, &routed.decision)
            .await;

        info!(
            route = %routed.decision,
            path = %routed.path,
            persisted = outcome.is_stored(),
            "Turn complete"
        );
        EventLogger::log_event(
            &session_id,
            AgentEvent::Routed {
                route_selected: routed.decision.tool_used().to_string(),
                path: routed.path.to_string(),
                persisted: outcome.is_stored(),
            },
        );

        let timestamp = match &outcome {
            RecordOutcome::Stored(turn) => turn.timestamp,
            RecordOutcome::Scheduled | RecordOutcome::Failed => Utc::now(),
        };

        ChatResponse {
            session_id,
            timestamp,
            user: request.message,
            response: routed.decision.reply().to_string(),
            route_selected: routed.decision.tool_used().to_string(),
        }
    }

    /// Full history of a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<HistoryResponse, ParleyError> {
        let turns = self.ctx.store.list(session_id).await?;
        Ok(HistoryResponse {
            session_id: session_id.to_string(),
            history: turns.into_iter().map(HistoryEntry::from).collect(),
        })
    }

    /// Forget a session.
    pub async fn reset(&self, session_id: &str) -> Result<ResetResponse, ParleyError> {
        self.ctx.store.delete_all(session_id).await?;
        info!(session_id = %session_id, "Session history cleared");
        Ok(ResetResponse {
            status: format!("Session {} history reset successfully", session_id),
        })
    }

    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.ctx.registry.describe_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouterSettings;
    use crate::testing::{FailingStore, HistoryLenClassifier};
    use parley_memory::{InMemorySessionStore, SessionStore};
    use parley_planner::{Classifier, KeywordClassifier};
    use std::time::Duration;
    use parley_tools::{builtin_registry, CrisisDetector, MarksBook, CRISIS_RESPONSE};

    fn service_with(store: Arc<dyn SessionStore>) -> ChatService {
        let ctx = AgentContext {
            registry: Arc::new(builtin_registry(MarksBook::builtin()).unwrap()),
            store,
            classifier: Arc::new(KeywordClassifier::new(MarksBook::builtin())),
        };
        ChatService::new(
            ctx,
            Router::new(CrisisDetector::new(), RouterSettings::default()),
            RecorderMode::Sync,
        )
    }

    fn request(session_id: &str, message: &str) -> ChatRequest {
        ChatRequest {
            session_id: session_id.into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_minted_ids_are_short_and_distinct() {
        let a = mint_session_id();
        let b = mint_session_id();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_chat_records_and_returns_turn() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let response = service
            .chat(request("abc", "What are Priya's marks in Science?"))
            .await;
        assert_eq!(response.session_id, "abc");
        assert_eq!(response.route_selected, "student_marks_tool");
        assert_eq!(response.response, "Priya scored 95 in Science (Grade: A+)");

        let history = service.history("abc").await.unwrap();
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].user, "What are Priya's marks in Science?");
        assert_eq!(history.history[0].timestamp, response.timestamp);
    }

    #[tokio::test]
    async fn test_empty_session_id_is_minted() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let response = service.chat(request("  ", "hello")).await;
        assert_eq!(response.session_id.len(), 8);
        assert_eq!(service.history(&response.session_id).await.unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_crisis_reply_through_service() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let response = service.chat(request("abc", "I want to hurt myself")).await;
        assert_eq!(response.route_selected, "safety_tool");
        assert_eq!(response.response, CRISIS_RESPONSE);
    }

    #[tokio::test]
    async fn test_storage_outage_still_replies() {
        let service = service_with(Arc::new(FailingStore));
        let response = service
            .chat(request("abc", "What are Amit's marks in Maths?"))
            .await;
        assert_eq!(response.response, "Amit scored 81 in Maths (Grade: A)");

        let err = service.history("abc").await.unwrap_err();
        assert!(matches!(err, ParleyError::StorageUnavailable(_)));
        assert!(service.reset("abc").await.is_err());
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        service.chat(request("abc", "hello")).await;
        let reset = service.reset("abc").await.unwrap();
        assert!(reset.status.contains("abc"));
        assert!(service.history("abc").await.unwrap().history.is_empty());
        service.reset("never-seen").await.unwrap();
    }

    fn service_with_classifier(classifier: Arc<dyn Classifier>) -> ChatService {
        let ctx = AgentContext {
            registry: Arc::new(builtin_registry(MarksBook::builtin()).unwrap()),
            store: Arc::new(InMemorySessionStore::new()),
            classifier,
        };
        ChatService::new(
            ctx,
            Router::new(CrisisDetector::new(), RouterSettings::default()),
            RecorderMode::Sync,
        )
    }

    async fn run_concurrent(service: Arc<ChatService>, turns: usize) {
        let mut handles = Vec::new();
        for i in 0..turns {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.chat(request("abc", &format!("hello {}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_serialized_sessions_see_each_prior_turn() {
        let classifier = Arc::new(HistoryLenClassifier::new(Duration::from_millis(20)));
        let service = Arc::new(
            service_with_classifier(classifier.clone()).serialize_sessions(true),
        );
        run_concurrent(Arc::clone(&service), 6).await;

        let mut seen = classifier.seen();
        seen.sort_unstable();
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
        assert_eq!(service.history("abc").await.unwrap().history.len(), 6);
    }

    #[tokio::test]
    async fn test_unserialized_sessions_overlap() {
        let classifier = Arc::new(HistoryLenClassifier::new(Duration::from_millis(50)));
        let service = Arc::new(service_with_classifier(classifier.clone()));
        run_concurrent(Arc::clone(&service), 4).await;

        assert!(classifier.seen().iter().filter(|&&n| n == 0).count() > 1);
        assert_eq!(service.history("abc").await.unwrap().history.len(), 4);
    }

    #[tokio::test]
    async fn test_common_crisis_phrasings_take_safety_path() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        for text in [
            "I don't want to live anymore",
            "I'm going to hang myself tonight",
            "thinking about taking an overdose",
            "I want to be dead",
            "I want to slit my wrists",
            "honestly i might just kms",
            "I'm thinking about ending it",
        ] {
            let response = service.chat(request("abc", text)).await;
            assert_eq!(response.route_selected, "safety_tool", "{text}");
            assert_eq!(response.response, CRISIS_RESPONSE, "{text}");
        }
    }

    #[test]
    fn test_tools_listed_in_registration_order() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let names: Vec<String> = service.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "positive_prompt_tool",
                "negative_prompt_tool",
                "student_marks_tool",
                "safety_tool"
            ]
        );
    }
}
