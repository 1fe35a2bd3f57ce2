use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use parley_core::{ParleyError, Turn, TurnDraft};

/// Durable, append-only log of turns keyed by session id.
///
/// Appends to one session are serialized; `list` returns turns in insertion
/// order and never a partially written turn.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stamp the draft with the write time and append it.
    async fn append(&self, draft: TurnDraft) -> Result<Turn, ParleyError>;

    /// All turns of a session in insertion order. Unknown sessions are empty.
    async fn list(&self, session_id: &str) -> Result<Vec<Turn>, ParleyError>;

    /// Remove every turn of a session. Succeeds if there were none.
    async fn delete_all(&self, session_id: &str) -> Result<(), ParleyError>;

    /// The most recent `limit` turns, oldest first.
    async fn list_recent(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, ParleyError> {
        let mut turns = self.list(session_id).await?;
        let skip = turns.len().saturating_sub(limit);
        turns.drain(..skip);
        Ok(turns)
    }
}

/// Write time for a new turn: now, but never earlier than the last turn.
pub(crate) fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

/// Process-local store. History is lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Turn>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, draft: TurnDraft) -> Result<Turn, ParleyError> {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(draft.session_id.clone()).or_default();
        let turn = draft.stamp(next_timestamp(turns.last().map(|t| t.timestamp)));
        turns.push(turn.clone());
        Ok(turn)
    }

    async fn list(&self, session_id: &str) -> Result<Vec<Turn>, ParleyError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn delete_all(&self, session_id: &str) -> Result<(), ParleyError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}
