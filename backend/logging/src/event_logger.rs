//! Turn Event Logger
//!
//! Structured per-turn events (route, tool call, error) written through
//! `tracing` under the `parley_turns` target, so the NDJSON file layer picks
//! them up as one line each.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Final routing outcome of a turn.
    Routed {
        route_selected: String,
        path: String,
        persisted: bool,
    },
    ToolCall {
        tool_name: String,
        arguments_json: String,
    },
    /// A recovered failure. `stage` names where it happened.
    Error {
        stage: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AgentEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact the event's free text and emit it.
    pub fn log_event(session_id: &str, mut event: AgentEvent) {
        match &mut event {
            AgentEvent::ToolCall { arguments_json, .. } => {
                *arguments_json = redact_sensitive_data(arguments_json);
            }
            AgentEvent::Error { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            AgentEvent::Routed { .. } => {}
        }

        let is_error = matches!(event, AgentEvent::Error { .. });
        let entry = EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        if is_error {
            warn!(target: "parley_turns", session_id = %entry.session_id, event = %json, "Turn event");
        } else {
            info!(target: "parley_turns", session_id = %entry.session_id, event = %json, "Turn event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_tagged() {
        let entry = EventLogEntry {
            session_id: "abc".into(),
            timestamp: Utc::now(),
            event: AgentEvent::Routed {
                route_selected: "safety_tool".into(),
                path: "safety_override".into(),
                persisted: true,
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event"]["type"], "routed");
        assert_eq!(value["event"]["route_selected"], "safety_tool");
    }

    #[test]
    fn test_log_event_without_subscriber() {
        EventLogger::log_event(
            "abc",
            AgentEvent::Error {
                stage: "append".into(),
                error_msg: "Bearer abc.def".into(),
            },
        );
    }
}
