//! JournalStore - SQLite WAL persistence for session journals
//!
//! - WAL mode: concurrent readers never block the writer
//! - Append-only: rows are inserted, never updated or deleted
//! - `(session_id, seq)` is the primary key, so re-persisting an entry fails
//!   instead of silently duplicating it

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::journal::{JournalEntry, JournalEvent, SessionId};
use crate::types::{RoleId, TaskId};

/// SQLite-backed store for journal entries
pub struct JournalStore {
    conn: Connection,
}

impl std::fmt::Debug for JournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl JournalStore {
    /// Open (or create) the database in WAL mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Creating journal directory '{}'", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Opening SQLite journal '{}'", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("Configuring SQLite WAL pragmas")?;

        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store, for tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Opening in-memory SQLite journal")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS journal_entries (
                session_id    TEXT NOT NULL,
                seq           INTEGER NOT NULL,
                timestamp     TEXT NOT NULL,
                timestamp_ms  INTEGER NOT NULL,
                role_id       TEXT,
                task_id       TEXT,
                event         TEXT NOT NULL,
                payload_json  TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            );

            CREATE INDEX IF NOT EXISTS idx_journal_task
                ON journal_entries(task_id, seq);
            ",
            )
            .context("Migrating journal schema")?;
        Ok(())
    }

    /// Persist one entry
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        insert(&self.conn, entry)
    }

    /// Persist a batch atomically; returns the number of rows written
    pub fn append_all(&self, entries: &[JournalEntry]) -> Result<usize> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Starting journal transaction")?;
        for entry in entries {
            insert(&tx, entry)?;
        }
        tx.commit().context("Committing journal batch")?;
        Ok(entries.len())
    }

    /// Load every entry of a session, in sequence order
    pub fn load_session(&self, session_id: SessionId) -> Result<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, timestamp, role_id, task_id, event, payload_json
             FROM journal_entries WHERE session_id = ?1 ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![session_id.to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (seq, timestamp, role_id, task_id, event, payload_json) = row?;

            let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
                .with_context(|| format!("Parsing journal timestamp '{}'", timestamp))?
                .with_timezone(&chrono::Utc);

            let task = task_id
                .map(|t| uuid::Uuid::parse_str(&t).map(TaskId))
                .transpose()
                .context("Parsing journal task id")?;

            let payload: serde_json::Value =
                serde_json::from_str(&payload_json).context("Parsing journal payload")?;
            let event: JournalEvent =
                serde_json::from_value(serde_json::json!({ "event": event, "payload": payload }))
                    .context("Decoding journal event")?;

            entries.push(JournalEntry {
                session_id,
                seq: seq as u64,
                timestamp,
                role: role_id.map(RoleId),
                task,
                event,
            });
        }

        Ok(entries)
    }

    /// Distinct sessions, oldest first
    pub fn sessions(&self) -> Result<Vec<SessionId>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, MIN(timestamp_ms) AS started
             FROM journal_entries GROUP BY session_id ORDER BY started ASC",
        )?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        ids.iter()
            .map(|id| uuid::Uuid::parse_str(id).context("Parsing session id"))
            .collect()
    }

    /// Number of persisted entries for a session
    pub fn count(&self, session_id: SessionId) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM journal_entries WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn insert(conn: &Connection, entry: &JournalEntry) -> Result<()> {
    let payload_json = serde_json::to_string(&entry.event.payload())
        .context("Serializing journal payload")?;

    conn.execute(
        "INSERT INTO journal_entries
            (session_id, seq, timestamp, timestamp_ms, role_id, task_id, event, payload_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.session_id.to_string(),
            entry.seq as i64,
            entry.timestamp.to_rfc3339(),
            entry.timestamp.timestamp_millis(),
            entry.role.as_ref().map(|r| r.as_str()),
            entry.task.map(|t| t.to_string()),
            entry.event.name(),
            payload_json,
        ],
    )
    .with_context(|| format!("INSERT journal entry {}#{}", entry.session_id, entry.seq))?;

    Ok(())
}
