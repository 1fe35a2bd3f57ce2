//! Per-turn routing: safety pre-filter, classification, and tool dispatch.
//!
//! The router never fails. Every path ends in a [`RoutingDecision`]; the
//! [`RoutePath`] alongside it records which path produced it, for logging and
//! tests.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use parley_core::{ParleyError, RoutingDecision, ToolOutcome, ToolRegistry, Turn};
use parley_logging::{AgentEvent, EventLogger};
use parley_memory::SessionStore;
use parley_planner::{Classification, Classifier};
use parley_tools::{CrisisDetector, ToolKind, CRISIS_RESPONSE};

use crate::context_window::ContextWindow;

/// Reply when classification fails or times out.
pub const GENERIC_FALLBACK_REPLY: &str =
    "Sorry, I couldn't work out how to help with that just now. Could you try asking again?";

/// Reply when a selected tool could not be run.
pub const TOOL_FAILURE_REPLY: &str =
    "Something went wrong, let me try to help directly. Could you rephrase what you need?";

/// Reply when the classifier chose to answer but drafted nothing.
pub const EMPTY_REPLY_FALLBACK: &str = "I'm here to help. What would you like to talk about?";

/// Everything the router needs for one call. Cheap to clone.
#[derive(Clone)]
pub struct AgentContext {
    pub registry: Arc<ToolRegistry>,
    pub store: Arc<dyn SessionStore>,
    pub classifier: Arc<dyn Classifier>,
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Most recent turns loaded as context.
    pub history_window: usize,
    /// Estimated token budget for that context.
    pub history_token_budget: usize,
    pub classification_timeout: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            history_window: 10,
            history_token_budget: 4000,
            classification_timeout: Duration::from_millis(15_000),
        }
    }
}

/// Which path produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePath {
    /// The pre-filter matched a crisis indicator.
    SafetyOverride,
    /// The classifier picked the safety tool itself.
    SafetySelected,
    Direct,
    Tool,
    /// The tool ran and reported it has no such record.
    NoData,
    ClassificationTimeout,
    ClassificationFailed,
    ToolFailed,
}

impl RoutePath {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutePath::SafetyOverride => "safety_override",
            RoutePath::SafetySelected => "safety_selected",
            RoutePath::Direct => "direct",
            RoutePath::Tool => "tool",
            RoutePath::NoData => "no_data",
            RoutePath::ClassificationTimeout => "classification_timeout",
            RoutePath::ClassificationFailed => "classification_failed",
            RoutePath::ToolFailed => "tool_failed",
        }
    }

    /// True when the decision is a substituted fallback reply.
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            RoutePath::ClassificationTimeout | RoutePath::ClassificationFailed | RoutePath::ToolFailed
        )
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Routed {
    pub decision: RoutingDecision,
    pub path: RoutePath,
}

impl Routed {
    fn new(decision: RoutingDecision, path: RoutePath) -> Self {
        Self { decision, path }
    }
}

pub struct Router {
    detector: CrisisDetector,
    settings: RouterSettings,
}

impl Router {
    pub fn new(detector: CrisisDetector, settings: RouterSettings) -> Self {
        Self { detector, settings }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Decide the reply for one message.
    #[instrument(skip(self, ctx, message), fields(classifier = ctx.classifier.name()))]
    pub async fn route(&self, ctx: &AgentContext, session_id: &str, message: &str) -> Routed {
        if let Some(indicator) = self.detector.matched_indicator(message) {
            info!(indicator = %indicator, "Crisis indicator matched, overriding classifier");
            return self
                .safety(ctx, session_id, message, RoutePath::SafetyOverride)
                .await;
        }

        let history = self.load_history(ctx, session_id).await;
        let tools = ctx.registry.describe_all();
        debug!(history_turns = history.len(), tools = tools.len(), "Classifying message");

        let classified = tokio::time::timeout(
            self.settings.classification_timeout,
            ctx.classifier.classify(message, &history, &tools),
        )
        .await;

        let classification = match classified {
            Ok(Ok(classification)) => classification,
            Ok(Err(e)) => {
                warn!(error = %e, "Classification failed, replying generically");
                log_error(session_id, "classify", &e.to_string());
                return Routed::new(
                    RoutingDecision::direct(GENERIC_FALLBACK_REPLY),
                    RoutePath::ClassificationFailed,
                );
            }
            Err(_) => {
                let err = ParleyError::ClassificationTimeout(
                    self.settings.classification_timeout.as_millis() as u64,
                );
                warn!(error = %err, "Classification timed out, replying generically");
                log_error(session_id, "classify", &err.to_string());
                return Routed::new(
                    RoutingDecision::direct(GENERIC_FALLBACK_REPLY),
                    RoutePath::ClassificationTimeout,
                );
            }
        };

        match classification {
            Classification::Direct { reply } => {
                let reply = reply.trim();
                let reply = if reply.is_empty() {
                    EMPTY_REPLY_FALLBACK
                } else {
                    reply
                };
                Routed::new(RoutingDecision::direct(reply), RoutePath::Direct)
            }
            Classification::Invoke { tool_name, .. } if tool_name == ToolKind::Safety.name() => {
                info!("Classifier selected the safety tool");
                self.safety(ctx, session_id, message, RoutePath::SafetySelected)
                    .await
            }
            Classification::Invoke {
                tool_name,
                arguments,
            } => self.dispatch(ctx, session_id, tool_name, arguments).await,
        }
    }

    /// Run a classifier-selected tool and turn its outcome into a decision.
    async fn dispatch(
        &self,
        ctx: &AgentContext,
        session_id: &str,
        tool_name: String,
        arguments: Value,
    ) -> Routed {
        EventLogger::log_event(
            session_id,
            AgentEvent::ToolCall {
                tool_name: tool_name.clone(),
                arguments_json: arguments.to_string(),
            },
        );

        match ctx.registry.invoke(&tool_name, &arguments).await {
            Ok(ToolOutcome::Completed(output)) => {
                info!(tool = %tool_name, "Tool completed");
                Routed::new(
                    RoutingDecision::ToolInvocation {
                        tool_name,
                        arguments,
                        reply: output,
                    },
                    RoutePath::Tool,
                )
            }
            Ok(ToolOutcome::NoData(detail)) => {
                info!(tool = %tool_name, detail = %detail, "Tool found no data");
                Routed::new(
                    RoutingDecision::ToolInvocation {
                        tool_name,
                        arguments,
                        reply: format!("I don't have that record: {}.", detail),
                    },
                    RoutePath::NoData,
                )
            }
            Err(e) => {
                warn!(tool = %tool_name, kind = e.kind(), error = %e, "Tool failed, replying directly");
                log_error(session_id, e.kind(), &e.to_string());
                Routed::new(
                    RoutingDecision::direct(TOOL_FAILURE_REPLY),
                    RoutePath::ToolFailed,
                )
            }
        }
    }

    /// The fixed crisis response. Never replaced by a fallback.
    async fn safety(
        &self,
        ctx: &AgentContext,
        session_id: &str,
        message: &str,
        path: RoutePath,
    ) -> Routed {
        let name = ToolKind::Safety.name();
        if !ctx.registry.contains(name) {
            warn!("Safety tool not registered, sending crisis response directly");
            return Routed::new(RoutingDecision::direct(CRISIS_RESPONSE), path);
        }

        let arguments = json!({ "text": message });
        if let Err(e) = ctx.registry.invoke(name, &arguments).await {
            warn!(error = %e, "Safety tool reported an error, crisis response kept");
            log_error(session_id, e.kind(), &e.to_string());
        }

        Routed::new(
            RoutingDecision::ToolInvocation {
                tool_name: name.to_string(),
                arguments,
                reply: CRISIS_RESPONSE.to_string(),
            },
            path,
        )
    }

    async fn load_history(&self, ctx: &AgentContext, session_id: &str) -> Vec<Turn> {
        match ctx
            .store
            .list_recent(session_id, self.settings.history_window)
            .await
        {
            Ok(turns) => ContextWindow::build(turns, self.settings.history_token_budget).turns,
            Err(e) => {
                warn!(error = %e, "History unavailable, classifying without context");
                log_error(session_id, "history", &e.to_string());
                Vec::new()
            }
        }
    }
}

fn log_error(session_id: &str, stage: &str, error_msg: &str) {
    EventLogger::log_event(
        session_id,
        AgentEvent::Error {
            stage: stage.to_string(),
            error_msg: error_msg.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStore, FailingTool, FixedClassifier, SleepingClassifier};
    use parley_core::{TurnDraft, NO_TOOL};
    use parley_memory::InMemorySessionStore;
    use parley_planner::KeywordClassifier;
    use parley_tools::{builtin_registry, MarksBook};

    fn context(classifier: Arc<dyn Classifier>) -> AgentContext {
        AgentContext {
            registry: Arc::new(builtin_registry(MarksBook::builtin()).unwrap()),
            store: Arc::new(InMemorySessionStore::new()),
            classifier,
        }
    }

    fn router() -> Router {
        Router::new(CrisisDetector::new(), RouterSettings::default())
    }

    #[tokio::test]
    async fn test_crisis_message_overrides_classifier() {
        let classifier = Arc::new(FixedClassifier::new(Classification::invoke(
            "positive_prompt_tool",
            json!({"prompt": "hurt"}),
        )));
        let ctx = context(classifier.clone());

        let routed = router().route(&ctx, "s1", "I want to hurt myself").await;
        assert_eq!(routed.decision.tool_used(), "safety_tool");
        assert_eq!(routed.decision.reply(), CRISIS_RESPONSE);
        assert_eq!(routed.path, RoutePath::SafetyOverride);
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_crisis_override_ignores_history() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::direct("hi"))));
        for i in 0..3 {
            ctx.store
                .append(TurnDraft {
                    session_id: "s1".into(),
                    user_message: format!("What are Priya's marks in Maths? {}", i),
                    assistant_message: "Priya scored 88 in Maths (Grade: A)".into(),
                    tool_used: "student_marks_tool".into(),
                })
                .await
                .unwrap();
        }

        let routed = router().route(&ctx, "s1", "I want to hurt myself").await;
        assert_eq!(routed.decision.tool_used(), "safety_tool");
        assert_eq!(routed.decision.reply(), CRISIS_RESPONSE);
    }

    #[tokio::test]
    async fn test_classifier_selected_safety_is_honoured() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::invoke(
            "safety_tool",
            json!({}),
        ))));
        let routed = router().route(&ctx, "s1", "everything feels pointless").await;
        assert_eq!(routed.decision.tool_used(), "safety_tool");
        assert_eq!(routed.decision.reply(), CRISIS_RESPONSE);
        assert_eq!(routed.path, RoutePath::SafetySelected);
    }

    #[tokio::test]
    async fn test_marks_lookup() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::invoke(
            "student_marks_tool",
            json!({"student": "Priya", "subject": "Science"}),
        ))));
        let routed = router().route(&ctx, "s1", "Priya science?").await;
        assert_eq!(routed.decision.tool_used(), "student_marks_tool");
        assert_eq!(routed.decision.reply(), "Priya scored 95 in Science (Grade: A+)");
        assert_eq!(routed.path, RoutePath::Tool);
    }

    #[tokio::test]
    async fn test_unknown_student_renders_no_data() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::invoke(
            "student_marks_tool",
            json!({"student": "Zed", "subject": "Science"}),
        ))));
        let routed = router().route(&ctx, "s1", "Zed science?").await;
        assert_eq!(routed.path, RoutePath::NoData);
        assert_eq!(routed.decision.tool_used(), "student_marks_tool");
        assert!(routed.decision.reply().starts_with("I don't have that record"));
        assert!(routed.decision.reply().contains("Zed"));
    }

    #[tokio::test]
    async fn test_tool_failure_degrades_to_direct_reply() {
        let mut registry = builtin_registry(MarksBook::builtin()).unwrap();
        registry.register(Arc::new(FailingTool)).unwrap();
        let ctx = AgentContext {
            registry: Arc::new(registry),
            store: Arc::new(InMemorySessionStore::new()),
            classifier: Arc::new(FixedClassifier::new(Classification::invoke(
                "failing_tool",
                json!({}),
            ))),
        };

        let routed = router().route(&ctx, "s1", "do the thing").await;
        assert_eq!(routed.decision.tool_used(), NO_TOOL);
        assert!(routed.decision.reply().starts_with("Something went wrong, let me try to help directly"));
        assert_eq!(routed.path, RoutePath::ToolFailed);
    }

    #[tokio::test]
    async fn test_unknown_tool_degrades_to_direct_reply() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::invoke(
            "weather_tool",
            json!({}),
        ))));
        let routed = router().route(&ctx, "s1", "weather?").await;
        assert_eq!(routed.decision.tool_used(), NO_TOOL);
        assert_eq!(routed.decision.reply(), TOOL_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_invalid_arguments_degrade_to_direct_reply() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::invoke(
            "student_marks_tool",
            json!({"student": "Priya"}),
        ))));
        let routed = router().route(&ctx, "s1", "Priya?").await;
        assert_eq!(routed.decision.tool_used(), NO_TOOL);
        assert_eq!(routed.path, RoutePath::ToolFailed);
    }

    #[tokio::test]
    async fn test_classifier_error_yields_generic_reply() {
        let ctx = context(Arc::new(FixedClassifier::failing("provider down")));
        let routed = router().route(&ctx, "s1", "hello").await;
        assert_eq!(routed.decision.reply(), GENERIC_FALLBACK_REPLY);
        assert_eq!(routed.decision.tool_used(), NO_TOOL);
        assert_eq!(routed.path, RoutePath::ClassificationFailed);
    }

    #[tokio::test]
    async fn test_classification_timeout_yields_generic_reply() {
        let ctx = context(Arc::new(SleepingClassifier::new(Duration::from_secs(5))));
        let router = Router::new(
            CrisisDetector::new(),
            RouterSettings {
                classification_timeout: Duration::from_millis(20),
                ..RouterSettings::default()
            },
        );
        let routed = router.route(&ctx, "s1", "hello").await;
        assert_eq!(routed.decision.reply(), GENERIC_FALLBACK_REPLY);
        assert_eq!(routed.path, RoutePath::ClassificationTimeout);
        assert!(routed.path.is_fallback());
    }

    #[tokio::test]
    async fn test_history_failure_still_routes() {
        let ctx = AgentContext {
            registry: Arc::new(builtin_registry(MarksBook::builtin()).unwrap()),
            store: Arc::new(FailingStore),
            classifier: Arc::new(FixedClassifier::new(Classification::direct("Hi there"))),
        };
        let routed = router().route(&ctx, "s1", "hello").await;
        assert_eq!(routed.decision.reply(), "Hi there");
        assert_eq!(routed.path, RoutePath::Direct);
    }

    #[tokio::test]
    async fn test_empty_direct_reply_replaced() {
        let ctx = context(Arc::new(FixedClassifier::new(Classification::direct("   "))));
        let routed = router().route(&ctx, "s1", "hmm").await;
        assert_eq!(routed.decision.reply(), EMPTY_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn test_history_window_bounds_context() {
        let classifier = Arc::new(FixedClassifier::new(Classification::direct("ok")));
        let ctx = context(classifier.clone());
        for i in 0..15 {
            ctx.store
                .append(TurnDraft {
                    session_id: "s1".into(),
                    user_message: format!("message {}", i),
                    assistant_message: "ok".into(),
                    tool_used: NO_TOOL.into(),
                })
                .await
                .unwrap();
        }

        router().route(&ctx, "s1", "next").await;
        let seen = classifier.last_history();
        assert_eq!(seen.len(), 10);
        assert_eq!(seen[0].user_message, "message 5");
        assert_eq!(seen[9].user_message, "message 14");
    }

    #[tokio::test]
    async fn test_keyword_classifier_end_to_end() {
        let ctx = context(Arc::new(KeywordClassifier::new(MarksBook::builtin())));
        let routed = router()
            .route(&ctx, "s1", "What are Priya's marks in Science?")
            .await;
        assert_eq!(routed.decision.tool_used(), "student_marks_tool");
        assert_eq!(routed.decision.reply(), "Priya scored 95 in Science (Grade: A+)");
    }
}
