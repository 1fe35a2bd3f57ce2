/// SQLite-backed durable turn log.
///
/// Turns live in a single `turns` table. Insertion order is the
/// autoincrement `id`, which is also the read order. Timestamps are stored as
/// RFC 3339 with nanosecond precision so they read back unchanged.
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use parley_core::{ParleyError, Turn, TurnDraft};

use crate::store::{next_timestamp, SessionStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS turns (
         id          INTEGER PRIMARY KEY AUTOINCREMENT,
         session_id  TEXT NOT NULL,
         user        TEXT NOT NULL,
         assistant   TEXT NOT NULL,
         tool_used   TEXT NOT NULL,
         timestamp   TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, id);";

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite session database")?;

        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .context("Failed to initialize turns schema")?;

        info!("SqliteSessionStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn unavailable(err: rusqlite::Error) -> ParleyError {
    ParleyError::StorageUnavailable(err.to_string())
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn append(&self, draft: TurnDraft) -> Result<Turn, ParleyError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(unavailable)?;

        let last: Option<String> = tx
            .query_row(
                "SELECT timestamp FROM turns WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
                params![draft.session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        let last = last.and_then(|ts| parse_timestamp(&ts).ok());

        let turn = draft.stamp(next_timestamp(last));
        tx.execute(
            "INSERT INTO turns (session_id, user, assistant, tool_used, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                turn.session_id,
                turn.user_message,
                turn.assistant_message,
                turn.tool_used,
                turn.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;

        debug!(session_id = %turn.session_id, tool_used = %turn.tool_used, "Appended turn");
        Ok(turn)
    }

    async fn list(&self, session_id: &str) -> Result<Vec<Turn>, ParleyError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT session_id, user, assistant, tool_used, timestamp
                 FROM turns WHERE session_id = ?1 ORDER BY id ASC",
            )
            .map_err(unavailable)?;

        let turns = stmt
            .query_map(params![session_id], row_to_turn)
            .map_err(unavailable)?
            .collect::<rusqlite::Result<Vec<Turn>>>()
            .map_err(unavailable)?;
        Ok(turns)
    }

    async fn delete_all(&self, session_id: &str) -> Result<(), ParleyError> {
        let conn = self.conn.lock().await;
        let removed = conn
            .execute("DELETE FROM turns WHERE session_id = ?1", params![session_id])
            .map_err(unavailable)?;
        debug!(session_id = %session_id, removed, "Deleted session turns");
        Ok(())
    }

    async fn list_recent(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, ParleyError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT session_id, user, assistant, tool_used, timestamp
                 FROM turns WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(unavailable)?;

        let mut turns = stmt
            .query_map(params![session_id, limit as i64], row_to_turn)
            .map_err(unavailable)?
            .collect::<rusqlite::Result<Vec<Turn>>>()
            .map_err(unavailable)?;
        turns.reverse();
        Ok(turns)
    }
}

// ---------------------------------------------------------------------------
// Row deserialization helpers
// ---------------------------------------------------------------------------

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

fn row_to_turn(row: &rusqlite::Row) -> rusqlite::Result<Turn> {
    let timestamp: String = row.get(4)?;
    let timestamp = parse_timestamp(&timestamp).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Turn {
        session_id: row.get(0)?,
        user_message: row.get(1)?,
        assistant_message: row.get(2)?,
        tool_used: row.get(3)?,
        timestamp,
    })
}
