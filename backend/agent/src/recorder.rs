//! Turn recording: pairs a routing decision with its message and appends it.
//!
//! A failed append never reaches the caller. It is logged for operators and the
//! reply goes out regardless.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use parley_core::{RoutingDecision, Turn, TurnDraft};
use parley_logging::{AgentEvent, EventLogger};
use parley_memory::SessionStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderMode {
    /// Await the append before replying.
    #[default]
    Sync,
    /// Spawn the append and reply immediately.
    Background,
}

/// What happened to the turn.
#[derive(Debug)]
pub enum RecordOutcome {
    Stored(Turn),
    /// Handed to a background task; not yet known to be stored.
    Scheduled,
    Failed,
}

impl RecordOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, RecordOutcome::Stored(_))
    }
}

pub struct TurnRecorder {
    store: Arc<dyn SessionStore>,
    mode: RecorderMode,
}

impl TurnRecorder {
    pub fn new(store: Arc<dyn SessionStore>, mode: RecorderMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> RecorderMode {
        self.mode
    }

    /// Append the turn for `decision`. The decision is only read.
    pub async fn record(
        &self,
        session_id: &str,
        user_message: &str,
        decision: &RoutingDecision,
    ) -> RecordOutcome {
        let draft = TurnDraft {
            session_id: session_id.to_string(),
            user_message: user_message.to_string(),
            assistant_message: decision.reply().to_string(),
            tool_used: decision.tool_used().to_string(),
        };

        match self.mode {
            RecorderMode::Sync => match append(self.store.as_ref(), draft).await {
                Some(turn) => RecordOutcome::Stored(turn),
                None => RecordOutcome::Failed,
            },
            RecorderMode::Background => {
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    append(store.as_ref(), draft).await;
                });
                RecordOutcome::Scheduled
            }
        }
    }
}

async fn append(store: &dyn SessionStore, draft: TurnDraft) -> Option<Turn> {
    let session_id = draft.session_id.clone();
    match store.append(draft).await {
        Ok(turn) => {
            debug!(session_id = %session_id, tool_used = %turn.tool_used, "Turn recorded");
            Some(turn)
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to record turn, reply still sent");
            EventLogger::log_event(
                &session_id,
                AgentEvent::Error {
                    stage: "append".into(),
                    error_msg: e.to_string(),
                },
            );
            None
        }
    }
}
