//! Task records
//!
//! A [`Task`] is one unit of delegated work. Only the orchestrator mutates a
//! task, and only by moving it along the lifecycle
//! `Pending -> InProgress -> {Completed | PartiallyCompleted | Blocked}`.
//! Terminal tasks are never reopened; a retry is a new task pointing back at
//! the old one through `retry_of`.

use crate::error::{MaestroError, Result};
use crate::types::{RoleId, TaskId, TaskStatus, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque key-value input handed to the role
pub type TaskContext = BTreeMap<String, serde_json::Value>;

/// One recorded lifecycle step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: TaskStatus,
    pub at: Timestamp,
}

/// A unit of work assigned to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    /// Assigned role (always registered)
    pub role: RoleId,

    pub context: TaskContext,

    pub status: TaskStatus,

    /// Every status the task has held, oldest first
    pub history: Vec<StatusChange>,

    /// Task this one retries, if any
    pub retry_of: Option<TaskId>,

    /// Why the task was forced to `Blocked`, if it was
    pub blocked_reason: Option<String>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Task {
    /// Create a new pending task
    pub fn new(role: RoleId, context: TaskContext) -> Self {
        let now = crate::types::now();

        Self {
            id: TaskId::new(),
            role,
            context,
            status: TaskStatus::Pending,
            history: vec![StatusChange {
                status: TaskStatus::Pending,
                at: now,
            }],
            retry_of: None,
            blocked_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a pending task that retries `previous`
    pub fn retry(previous: &Task, context: TaskContext) -> Self {
        let mut task = Self::new(previous.role.clone(), context);
        task.retry_of = Some(previous.id);
        task
    }

    /// Transition to a new status
    ///
    /// # Errors
    ///
    /// Returns [`MaestroError::InvalidStateTransition`] for any edge outside
    /// the lifecycle.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(MaestroError::InvalidStateTransition {
                from: self.status,
                to: new_status,
            });
        }

        let now = crate::types::now();
        self.status = new_status;
        self.history.push(StatusChange {
            status: new_status,
            at: now,
        });
        self.updated_at = now;

        Ok(())
    }

    /// Start work on the task
    pub fn start(&mut self) -> Result<()> {
        self.transition_to(TaskStatus::InProgress)
    }

    /// Force the task to `Blocked`
    pub fn block(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition_to(TaskStatus::Blocked)?;
        self.blocked_reason = Some(reason.into());
        Ok(())
    }

    /// Statuses held so far, oldest first
    pub fn status_path(&self) -> Vec<TaskStatus> {
        self.history.iter().map(|change| change.status).collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
