//! Append-only session journal
//!
//! Every fact, question and status transition an orchestrator performs is
//! recorded as one `(timestamp, role, task, event, payload)` entry. The
//! journal is the persisted shape of a session; see
//! [`JournalStore`](crate::storage::JournalStore) for the SQLite backend.

use crate::types::{QuestionId, RoleId, TaskId, TaskStatus, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one workflow session
pub type SessionId = Uuid;

/// One journal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub session_id: SessionId,
    /// Position within the session, starting at 0
    pub seq: u64,
    pub timestamp: Timestamp,
    pub role: Option<RoleId>,
    pub task: Option<TaskId>,
    #[serde(flatten)]
    pub event: JournalEvent,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum JournalEvent {
    /// A task was created for a role
    Delegated {
        context: serde_json::Value,
        retry_of: Option<TaskId>,
    },

    StatusChanged {
        from: TaskStatus,
        to: TaskStatus,
        reason: Option<String>,
    },

    FactRecorded { seq: u64, text: String },

    QuestionRaised { id: QuestionId, text: String },

    QuestionResolved { text: String },

    /// A handoff report failed validation; nothing else was recorded for it
    ReportRejected { reason: String },

    /// The same pair of roles keeps handing work back and forth
    HandbackCycle {
        from: RoleId,
        to: RoleId,
        count: u32,
    },
}

impl JournalEvent {
    /// Short name, matching the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            JournalEvent::Delegated { .. } => "delegated",
            JournalEvent::StatusChanged { .. } => "status_changed",
            JournalEvent::FactRecorded { .. } => "fact_recorded",
            JournalEvent::QuestionRaised { .. } => "question_raised",
            JournalEvent::QuestionResolved { .. } => "question_resolved",
            JournalEvent::ReportRejected { .. } => "report_rejected",
            JournalEvent::HandbackCycle { .. } => "handback_cycle",
        }
    }

    /// Payload alone, as stored next to the event name
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("payload").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }
}

/// In-memory journal owned by one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    session_id: SessionId,
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            entries: Vec::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Append an entry
    pub fn record(&mut self, role: Option<&RoleId>, task: Option<TaskId>, event: JournalEvent) {
        tracing::debug!(
            session = %self.session_id,
            event = event.name(),
            "journal entry"
        );
        self.entries.push(JournalEntry {
            session_id: self.session_id,
            seq: self.entries.len() as u64,
            timestamp: crate::types::now(),
            role: role.cloned(),
            task,
            event,
        });
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Entries from `seq` onwards, for incremental persistence
    pub fn since(&self, seq: u64) -> &[JournalEntry] {
        let start = (seq as usize).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
