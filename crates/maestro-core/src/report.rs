//! Handoff reports
//!
//! A [`HandoffReport`] is the structured result a role produces when it closes
//! a task. The orchestrator validates it against the issuing role's contract
//! before merging anything into the workflow state; a report that fails any
//! check is rejected wholesale.

use crate::error::ReportError;
use crate::role::{Role, RoleRegistry};
use crate::types::{CompletionStatus, QuestionId, RoleId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional report sections a role contract can make mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportField {
    Summary,
    Artifacts,
    Decisions,
    OpenQuestions,
    NextStep,
    KeyFacts,
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportField::Summary => "summary",
            ReportField::Artifacts => "artifacts",
            ReportField::Decisions => "decisions",
            ReportField::OpenQuestions => "open_questions",
            ReportField::NextStep => "next_step",
            ReportField::KeyFacts => "key_facts",
        };
        f.write_str(name)
    }
}

/// Recommended follow-up: which role should act next, and on what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub role: RoleId,
    pub task: String,
}

impl NextStep {
    pub fn new(role: impl Into<RoleId>, task: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            task: task.into(),
        }
    }
}

/// Structured result closing exactly one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffReport {
    /// Task this report closes
    pub task_id: TaskId,

    pub status: CompletionStatus,

    #[serde(default)]
    pub summary: String,

    /// Produced or modified documents (paths are not checked on disk)
    #[serde(default)]
    pub artifacts: Vec<String>,

    /// Key decisions and assumptions
    #[serde(default)]
    pub decisions: Vec<String>,

    #[serde(default)]
    pub open_questions: Vec<String>,

    /// Previously open questions this report answers, by exact text
    #[serde(default)]
    pub resolved_questions: Vec<String>,

    /// Previously open questions this report answers, by id
    #[serde(default)]
    pub resolved_question_ids: Vec<QuestionId>,

    #[serde(default)]
    pub next_step: Option<NextStep>,

    /// Facts to append to the workflow state
    #[serde(default)]
    pub key_facts: Vec<String>,
}

impl HandoffReport {
    /// Create a builder for a report closing `task_id`
    pub fn builder(task_id: TaskId, status: CompletionStatus) -> HandoffReportBuilder {
        HandoffReportBuilder::new(task_id, status)
    }

    /// Check the report against the issuing role's contract
    ///
    /// Checks, in order: the role permits the status, every artifact path is
    /// non-empty, a recommended next role is registered, and every field the
    /// role requires is present.
    pub fn validate(&self, role: &Role, registry: &RoleRegistry) -> Result<(), ReportError> {
        if !role.permits(self.status) {
            return Err(ReportError::StatusNotPermitted {
                role: role.id.clone(),
                status: self.status,
            });
        }

        if let Some(index) = self.artifacts.iter().position(|a| a.trim().is_empty()) {
            return Err(ReportError::EmptyArtifactPath(index));
        }

        if let Some(next) = &self.next_step {
            if !registry.contains(&next.role) {
                return Err(ReportError::UnknownNextRole(next.role.clone()));
            }
        }

        for field in &role.required_fields {
            if !self.has_field(*field) {
                return Err(ReportError::MissingField(*field));
            }
        }

        Ok(())
    }

    /// Whether `field` is present and non-empty
    pub fn has_field(&self, field: ReportField) -> bool {
        match field {
            ReportField::Summary => !self.summary.trim().is_empty(),
            ReportField::Artifacts => !self.artifacts.is_empty(),
            ReportField::Decisions => !self.decisions.is_empty(),
            ReportField::OpenQuestions => !self.open_questions.is_empty(),
            ReportField::NextStep => self.next_step.is_some(),
            ReportField::KeyFacts => !self.key_facts.is_empty(),
        }
    }
}

/// Builder for handoff reports
#[derive(Debug)]
pub struct HandoffReportBuilder {
    report: HandoffReport,
}

impl HandoffReportBuilder {
    fn new(task_id: TaskId, status: CompletionStatus) -> Self {
        Self {
            report: HandoffReport {
                task_id,
                status,
                summary: String::new(),
                artifacts: Vec::new(),
                decisions: Vec::new(),
                open_questions: Vec::new(),
                resolved_questions: Vec::new(),
                resolved_question_ids: Vec::new(),
                next_step: None,
                key_facts: Vec::new(),
            },
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.report.summary = summary.into();
        self
    }

    pub fn artifact(mut self, path: impl Into<String>) -> Self {
        self.report.artifacts.push(path.into());
        self
    }

    pub fn decision(mut self, decision: impl Into<String>) -> Self {
        self.report.decisions.push(decision.into());
        self
    }

    pub fn open_question(mut self, question: impl Into<String>) -> Self {
        self.report.open_questions.push(question.into());
        self
    }

    pub fn resolves(mut self, question: impl Into<String>) -> Self {
        self.report.resolved_questions.push(question.into());
        self
    }

    pub fn resolves_id(mut self, id: QuestionId) -> Self {
        self.report.resolved_question_ids.push(id);
        self
    }

    pub fn next_step(mut self, role: impl Into<RoleId>, task: impl Into<String>) -> Self {
        self.report.next_step = Some(NextStep::new(role, task));
        self
    }

    pub fn key_fact(mut self, fact: impl Into<String>) -> Self {
        self.report.key_facts.push(fact.into());
        self
    }

    pub fn build(self) -> HandoffReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoleRegistry {
        let backend = Role::builder("backend-developer")
            .responsibility("Implement services")
            .require(ReportField::Summary)
            .build()
            .unwrap();
        let reviewer = Role::builder("code-reviewer")
            .responsibility("Review changes")
            .permit([CompletionStatus::Completed, CompletionStatus::Blocked])
            .build()
            .unwrap();
        RoleRegistry::from_roles([backend, reviewer]).unwrap()
    }

    #[test]
    fn test_valid_report() {
        let registry = registry();
        let role = registry.lookup(&"backend-developer".into()).unwrap();
        let report = HandoffReport::builder(TaskId::new(), CompletionStatus::Completed)
            .summary("done")
            .artifact("src/auth/jwt.rs")
            .next_step("code-reviewer", "Review JWT auth")
            .key_fact("Implemented JWT auth")
            .build();

        assert_eq!(report.validate(role, &registry), Ok(()));
    }

    #[test]
    fn test_missing_required_field() {
        let registry = registry();
        let role = registry.lookup(&"backend-developer".into()).unwrap();
        let report = HandoffReport::builder(TaskId::new(), CompletionStatus::Completed)
            .summary("   ")
            .build();

        assert_eq!(
            report.validate(role, &registry),
            Err(ReportError::MissingField(ReportField::Summary))
        );
    }

    #[test]
    fn test_empty_artifact_path() {
        let registry = registry();
        let role = registry.lookup(&"backend-developer".into()).unwrap();
        let report = HandoffReport::builder(TaskId::new(), CompletionStatus::Completed)
            .summary("done")
            .artifact("docs/api.md")
            .artifact("")
            .build();

        assert_eq!(
            report.validate(role, &registry),
            Err(ReportError::EmptyArtifactPath(1))
        );
    }

    #[test]
    fn test_unknown_next_role() {
        let registry = registry();
        let role = registry.lookup(&"backend-developer".into()).unwrap();
        let report = HandoffReport::builder(TaskId::new(), CompletionStatus::Completed)
            .summary("done")
            .next_step("release-manager", "Ship it")
            .build();

        assert_eq!(
            report.validate(role, &registry),
            Err(ReportError::UnknownNextRole(RoleId::new("release-manager")))
        );
    }

    #[test]
    fn test_status_not_permitted() {
        let registry = registry();
        let role = registry.lookup(&"code-reviewer".into()).unwrap();
        let report =
            HandoffReport::builder(TaskId::new(), CompletionStatus::PartiallyCompleted).build();

        assert!(matches!(
            report.validate(role, &registry),
            Err(ReportError::StatusNotPermitted { .. })
        ));
    }

    #[test]
    fn test_report_deserializes_with_defaults() {
        let task_id = TaskId::new();
        let json = format!(r#"{{"task_id":"{}","status":"blocked"}}"#, task_id);
        let report: HandoffReport = serde_json::from_str(&json).unwrap();

        assert_eq!(report.task_id, task_id);
        assert_eq!(report.status, CompletionStatus::Blocked);
        assert!(report.key_facts.is_empty());
        assert!(report.next_step.is_none());
        assert!(report.resolved_question_ids.is_empty());
    }

    #[test]
    fn test_question_ids_serialize_as_numbers() {
        let report = HandoffReport::builder(TaskId::new(), CompletionStatus::Completed)
            .resolves_id(QuestionId(0))
            .resolves_id(QuestionId(3))
            .build();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["resolved_question_ids"], serde_json::json!([0, 3]));
    }
}
