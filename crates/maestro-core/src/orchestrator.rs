//! Orchestrator - task dispatch and handoff merging for one workflow session
//!
//! ```text
//!  delegate(role, ctx) ──► Task(Pending ─► InProgress) ──► role works (external)
//!                                                              │
//!  HandoffOutcome ◄── merge facts/questions ◄── validate ◄── accept(task, report)
//! ```
//!
//! Each `Orchestrator` owns its task table, workflow state and journal; the
//! role registry is shared read-only. Every operation either fully applies or
//! leaves the workflow state untouched.

use crate::config::SessionConfig;
use crate::error::{MaestroError, ReportError, Result};
use crate::journal::{Journal, JournalEntry, JournalEvent, SessionId};
use crate::report::{HandoffReport, NextStep};
use crate::role::{Role, RoleRegistry};
use crate::state::{Fact, WorkflowSnapshot, WorkflowState};
use crate::task::{Task, TaskContext};
use crate::types::{QuestionId, RoleId, TaskId, TaskStatus, Timestamp, WorkflowMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Result of an accepted handoff report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffOutcome {
    pub task_id: TaskId,
    pub role: RoleId,

    /// Status the task was closed with
    pub status: TaskStatus,

    /// Facts appended to the workflow state, in order
    pub accepted_facts: Vec<Fact>,

    /// Questions newly opened by this report
    pub new_questions: Vec<QuestionId>,

    /// Open questions this report resolved
    pub resolved_questions: Vec<String>,

    /// The issuing role's recommendation, passed through unchanged
    pub next_step: Option<NextStep>,

    /// Follow mode only: unresolved questions remain, so the next step
    /// should be confirmed before it is delegated
    pub requires_confirmation: bool,

    /// The recommendation continues a run of hand-backs between two roles
    pub cycle_detected: bool,
}

/// Everything a closed session leaves behind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionArchive {
    pub session_id: SessionId,
    pub tasks: Vec<Task>,
    pub snapshot: WorkflowSnapshot,
    pub journal: Vec<JournalEntry>,
    pub closed_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
struct HandbackTracker {
    last: Option<(RoleId, RoleId)>,
    streak: u32,
}

impl HandbackTracker {
    /// Record `from -> to`; returns the current run of reversals
    fn observe(&mut self, from: &RoleId, to: &RoleId) -> u32 {
        let reverses_last = matches!(&self.last, Some((a, b)) if a == to && b == from);
        self.streak = if reverses_last { self.streak + 1 } else { 0 };
        self.last = Some((from.clone(), to.clone()));
        self.streak
    }
}

/// Central coordinator of one workflow session
#[derive(Debug)]
pub struct Orchestrator {
    session_id: SessionId,
    registry: Arc<RoleRegistry>,
    config: SessionConfig,
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    active: HashMap<RoleId, Vec<TaskId>>,
    state: WorkflowState,
    journal: Journal,
    handbacks: HandbackTracker,
}

impl Orchestrator {
    pub fn new(registry: Arc<RoleRegistry>, config: SessionConfig) -> Self {
        Self::with_session_id(Uuid::new_v4(), registry, config)
    }

    pub fn with_session_id(
        session_id: SessionId,
        registry: Arc<RoleRegistry>,
        config: SessionConfig,
    ) -> Self {
        tracing::info!(session = %session_id, mode = ?config.mode, "Workflow session started");
        Self {
            session_id,
            registry,
            config,
            tasks: HashMap::new(),
            order: Vec::new(),
            active: HashMap::new(),
            state: WorkflowState::new(),
            journal: Journal::new(session_id),
            handbacks: HandbackTracker::default(),
        }
    }

    /// Create a task for `role` and start it
    ///
    /// # Errors
    ///
    /// - [`MaestroError::UnknownRole`] if the role is not registered
    /// - [`MaestroError::RoleBusy`] if the role already holds its quota of active tasks
    pub fn delegate(&mut self, role: impl Into<RoleId>, context: TaskContext) -> Result<TaskId> {
        let role = role.into();
        self.registry.lookup(&role)?;
        self.spawn(Task::new(role, context))
    }

    /// Spawn a new task retrying a `Blocked` or `PartiallyCompleted` one
    ///
    /// The new task keeps the old context unless `context` is given.
    pub fn retry(&mut self, task_id: TaskId, context: Option<TaskContext>) -> Result<TaskId> {
        let previous = self.task(task_id)?;

        if !previous.status.is_retryable() {
            return Err(MaestroError::InvalidStateTransition {
                from: previous.status,
                to: TaskStatus::Pending,
            });
        }

        let context = context.unwrap_or_else(|| previous.context.clone());
        let task = Task::retry(previous, context);
        tracing::info!(previous = %task_id, role = %task.role, "Retrying task");
        self.spawn(task)
    }

    fn spawn(&mut self, mut task: Task) -> Result<TaskId> {
        if let Some(active_task) = self.busy_with(&task.role) {
            tracing::debug!(role = %task.role, active = %active_task, "Delegation refused, role busy");
            return Err(MaestroError::RoleBusy {
                role: task.role,
                active_task,
            });
        }

        let id = task.id;
        self.journal.record(
            Some(&task.role),
            Some(id),
            JournalEvent::Delegated {
                context: serde_json::to_value(&task.context)?,
                retry_of: task.retry_of,
            },
        );

        task.start()?;
        self.journal.record(
            Some(&task.role),
            Some(id),
            JournalEvent::StatusChanged {
                from: TaskStatus::Pending,
                to: TaskStatus::InProgress,
                reason: None,
            },
        );

        tracing::info!(task = %id, role = %task.role, "Task delegated");
        self.active.entry(task.role.clone()).or_default().push(id);
        self.order.push(id);
        self.tasks.insert(id, task);

        Ok(id)
    }

    /// Validate and merge a handoff report closing `task_id`
    ///
    /// # Errors
    ///
    /// - [`MaestroError::TaskNotFound`] if the task is unknown
    /// - [`MaestroError::InvalidReport`] if the report fails validation; in
    ///   that case the task and the workflow state are left unchanged
    pub fn accept(&mut self, task_id: TaskId, report: HandoffReport) -> Result<HandoffOutcome> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(MaestroError::TaskNotFound(task_id))?;
        let role_id = task.role.clone();
        let from = task.status;

        let registry = Arc::clone(&self.registry);
        let role = registry.lookup(&role_id)?;

        if let Err(reason) = check_report(task, role, &registry, &report) {
            return Err(self.reject(task_id, &role_id, reason));
        }

        // Validation passed: from here on nothing can fail.
        let status = TaskStatus::from(report.status);
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.transition_to(status)?;
        }
        self.release(&role_id, task_id);
        self.journal.record(
            Some(&role_id),
            Some(task_id),
            JournalEvent::StatusChanged {
                from,
                to: status,
                reason: None,
            },
        );

        let first_fact = self.state.facts().len();
        self.state
            .append_facts(&role_id, task_id, report.key_facts.iter().cloned());
        let accepted_facts = self.state.facts()[first_fact..].to_vec();
        for fact in &accepted_facts {
            self.journal.record(
                Some(&role_id),
                Some(task_id),
                JournalEvent::FactRecorded {
                    seq: fact.seq,
                    text: fact.text.clone(),
                },
            );
        }

        let mut new_questions = Vec::new();
        for question in &report.open_questions {
            let known = self.state.questions().len();
            let id = self.state.add_open_question(question.clone(), &role_id);
            if self.state.questions().len() > known {
                new_questions.push(id);
                self.journal.record(
                    Some(&role_id),
                    Some(task_id),
                    JournalEvent::QuestionRaised {
                        id,
                        text: question.clone(),
                    },
                );
            }
        }

        let mut resolved_questions = Vec::new();
        for question in &report.resolved_questions {
            if self.state.resolve_question(question) {
                resolved_questions.push(question.clone());
                self.journal.record(
                    Some(&role_id),
                    Some(task_id),
                    JournalEvent::QuestionResolved {
                        text: question.clone(),
                    },
                );
            }
        }
        for id in &report.resolved_question_ids {
            if let Some(text) = self.resolve_by_id(*id) {
                resolved_questions.push(text.clone());
                self.journal.record(
                    Some(&role_id),
                    Some(task_id),
                    JournalEvent::QuestionResolved { text },
                );
            }
        }

        let mut cycle_detected = false;
        if let Some(next) = &report.next_step {
            let streak = self.handbacks.observe(&role_id, &next.role);
            if self.config.handback_limit > 0 && streak >= self.config.handback_limit {
                cycle_detected = true;
                tracing::warn!(
                    from = %role_id,
                    to = %next.role,
                    count = streak,
                    "Roles keep handing work back and forth"
                );
                self.journal.record(
                    Some(&role_id),
                    Some(task_id),
                    JournalEvent::HandbackCycle {
                        from: role_id.clone(),
                        to: next.role.clone(),
                        count: streak,
                    },
                );
            }
        }

        let requires_confirmation = self.config.mode == WorkflowMode::Follow
            && report.next_step.is_some()
            && self.state.has_unresolved();

        tracing::info!(
            task = %task_id,
            role = %role_id,
            status = %status,
            facts = accepted_facts.len(),
            "Handoff accepted"
        );

        Ok(HandoffOutcome {
            task_id,
            role: role_id,
            status,
            accepted_facts,
            new_questions,
            resolved_questions,
            next_step: report.next_step,
            requires_confirmation,
            cycle_detected,
        })
    }

    fn reject(&mut self, task_id: TaskId, role: &RoleId, reason: ReportError) -> MaestroError {
        tracing::warn!(task = %task_id, role = %role, %reason, "Handoff report rejected");
        self.journal.record(
            Some(role),
            Some(task_id),
            JournalEvent::ReportRejected {
                reason: reason.to_string(),
            },
        );
        MaestroError::InvalidReport {
            task: task_id,
            reason,
        }
    }

    /// Force an in-progress task to `Blocked` (timeout, external cancellation)
    /// and free its role
    pub fn block(&mut self, task_id: TaskId, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(MaestroError::TaskNotFound(task_id))?;

        let from = task.status;
        task.block(reason.clone())?;
        let role = task.role.clone();

        self.release(&role, task_id);
        self.journal.record(
            Some(&role),
            Some(task_id),
            JournalEvent::StatusChanged {
                from,
                to: TaskStatus::Blocked,
                reason: Some(reason.clone()),
            },
        );
        tracing::info!(task = %task_id, role = %role, %reason, "Task blocked");
        Ok(())
    }

    /// Resolve an open question by text; unknown questions are ignored
    pub fn resolve_question(&mut self, question: &str) -> bool {
        let resolved = self.state.resolve_question(question);
        if resolved {
            self.journal.record(
                None,
                None,
                JournalEvent::QuestionResolved {
                    text: question.to_string(),
                },
            );
            tracing::info!(question, "Question resolved");
        } else {
            tracing::debug!(question, "No open question matched");
        }
        resolved
    }

    /// Resolve an open question by the id `accept` handed out for it
    pub fn resolve_question_by_id(&mut self, id: QuestionId) -> bool {
        match self.resolve_by_id(id) {
            Some(text) => {
                tracing::info!(question = %id, "Question resolved");
                self.journal
                    .record(None, None, JournalEvent::QuestionResolved { text });
                true
            }
            None => {
                tracing::debug!(question = %id, "No open question with this id");
                false
            }
        }
    }

    /// Text of the question if it was open and is now resolved
    fn resolve_by_id(&mut self, id: QuestionId) -> Option<String> {
        if !self.state.resolve_question_by_id(id) {
            return None;
        }
        self.state.question(id).map(|q| q.text.clone())
    }

    /// End the session and hand back everything it produced
    pub fn close(self) -> SessionArchive {
        let still_active: usize = self.active.values().map(Vec::len).sum();
        if still_active > 0 {
            tracing::warn!(
                session = %self.session_id,
                active = still_active,
                "Closing session with tasks still in progress"
            );
        }

        let snapshot = self.state.snapshot();
        let mut tasks = self.tasks;
        let tasks = self
            .order
            .iter()
            .filter_map(|id| tasks.remove(id))
            .collect();

        tracing::info!(session = %self.session_id, "Workflow session closed");
        SessionArchive {
            session_id: self.session_id,
            tasks,
            snapshot,
            journal: self.journal.entries().to_vec(),
            closed_at: crate::types::now(),
        }
    }

    fn busy_with(&self, role: &RoleId) -> Option<TaskId> {
        let active = self.active.get(role)?;
        if active.len() >= self.config.max_active_per_role.max(1) {
            active.first().copied()
        } else {
            None
        }
    }

    fn release(&mut self, role: &RoleId, task_id: TaskId) {
        if let Some(active) = self.active.get_mut(role) {
            active.retain(|id| *id != task_id);
            if active.is_empty() {
                self.active.remove(role);
            }
        }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.state.snapshot()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn task(&self, task_id: TaskId) -> Result<&Task> {
        self.tasks
            .get(&task_id)
            .ok_or(MaestroError::TaskNotFound(task_id))
    }

    /// Tasks in creation order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn active_tasks(&self, role: &RoleId) -> &[TaskId] {
        self.active.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_busy(&self, role: &RoleId) -> bool {
        self.busy_with(role).is_some()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

fn check_report(
    task: &Task,
    role: &Role,
    registry: &RoleRegistry,
    report: &HandoffReport,
) -> std::result::Result<(), ReportError> {
    if report.task_id != task.id {
        return Err(ReportError::TaskMismatch {
            expected: task.id,
            actual: report.task_id,
        });
    }

    if task.status != TaskStatus::InProgress {
        return Err(ReportError::TaskNotInProgress(task.status));
    }

    report.validate(role, registry)
}
