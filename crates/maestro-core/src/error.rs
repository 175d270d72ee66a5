//! Error types for Maestro Core
//!
//! This module defines all error types used throughout the coordination engine.
//! Every error is scoped to the single registry/delegate/accept call that raised it;
//! nothing here is fatal to a workflow session.

use crate::report::ReportField;
use crate::types::{CompletionStatus, RoleId, TaskId, TaskStatus};
use thiserror::Error;

/// Result type alias for Maestro operations
pub type Result<T> = std::result::Result<T, MaestroError>;

/// Main error type for Maestro operations
#[derive(Error, Debug)]
pub enum MaestroError {
    /// Delegation or report references a role absent from the registry
    #[error("Unknown role: {0}")]
    UnknownRole(RoleId),

    /// A role with this identifier is already registered
    #[error("Role already registered: {0}")]
    DuplicateRole(RoleId),

    /// Role rejected at registration (empty identifier or responsibilities)
    #[error("Invalid role definition: {0}")]
    InvalidRole(String),

    /// Delegation attempted for a role that already has an active task
    #[error("Role {role} is busy with task {active_task}")]
    RoleBusy { role: RoleId, active_task: TaskId },

    /// Acceptance, blocking or retry references an unknown task
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Handoff report failed structural validation; nothing was merged
    #[error("Invalid handoff report for task {task}: {reason}")]
    InvalidReport { task: TaskId, reason: ReportError },

    /// Illegal task lifecycle edge
    #[error("Invalid task state transition from {from} to {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },

    /// No live workflow session with this identifier
    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<MaestroError>,
    },
}

/// Reasons a handoff report is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("report closes task {actual}, expected {expected}")]
    TaskMismatch { expected: TaskId, actual: TaskId },

    #[error("task is {0}, only in-progress tasks accept reports")]
    TaskNotInProgress(TaskStatus),

    #[error("role {role} may not report status {status}")]
    StatusNotPermitted {
        role: RoleId,
        status: CompletionStatus,
    },

    #[error("artifact path at index {0} is empty")]
    EmptyArtifactPath(usize),

    #[error("recommended next role is not registered: {0}")]
    UnknownNextRole(RoleId),

    #[error("required field missing or empty: {0}")]
    MissingField(ReportField),
}

impl MaestroError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the caller can recover by retrying later (role busy)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RoleBusy { .. } => true,
            Self::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context() {
        let err = MaestroError::TaskNotFound(TaskId::new());
        let err = err.context("Failed to accept handoff");

        assert!(err.to_string().contains("Failed to accept handoff"));
        assert!(err.to_string().contains("Task not found"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(MaestroError::UnknownRole(RoleId::new("ghost")));
        let result = result.with_context(|| "Delegation failed".to_string());

        let message = result.unwrap_err().to_string();
        assert!(message.contains("Delegation failed"));
        assert!(message.contains("ghost"));
    }

    #[test]
    fn test_role_busy_is_retryable() {
        let busy = MaestroError::RoleBusy {
            role: RoleId::new("tester"),
            active_task: TaskId::new(),
        };
        assert!(busy.is_retryable());
        assert!(busy.context("wrapped").is_retryable());
        assert!(!MaestroError::UnknownRole(RoleId::new("x")).is_retryable());
    }

    #[test]
    fn test_report_error_display() {
        let err = ReportError::MissingField(ReportField::Summary);
        assert_eq!(err.to_string(), "required field missing or empty: summary");
    }
}
