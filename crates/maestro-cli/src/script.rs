//! Replayable handoff scripts
//!
//! A script is a JSON document listing orchestrator operations in order.
//! Tasks are referred to by labels assigned at delegation time, so a script
//! never has to know the generated task ids:
//!
//! ```json
//! {
//!   "session": { "mode": "yolo" },
//!   "steps": [
//!     { "op": "delegate", "label": "auth", "role": "backend-developer", "context": { "feature": "auth" } },
//!     { "op": "accept", "task": "auth", "report": { "status": "completed", "summary": "done", "key_facts": ["Implemented JWT auth"] } }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use maestro_core::{
    CompletionStatus, HandoffOutcome, HandoffReport, NextStep, Orchestrator, QuestionId,
    SessionConfig, TaskContext, TaskId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Overrides the configured session policy
    #[serde(default)]
    pub session: Option<SessionConfig>,

    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading script {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Parsing script {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Delegate {
        label: String,
        role: String,
        #[serde(default)]
        context: TaskContext,
    },
    Accept {
        task: String,
        report: ReportBody,
    },
    Block {
        task: String,
        reason: String,
    },
    Retry {
        task: String,
        label: String,
        #[serde(default)]
        context: Option<TaskContext>,
    },
    Resolve {
        question: String,
    },
}

/// A handoff report without its task id, which the label supplies
#[derive(Debug, Clone, Deserialize)]
pub struct ReportBody {
    pub status: CompletionStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub resolved_questions: Vec<String>,
    #[serde(default)]
    pub resolved_question_ids: Vec<QuestionId>,
    #[serde(default)]
    pub next_step: Option<NextStep>,
    #[serde(default)]
    pub key_facts: Vec<String>,
}

impl ReportBody {
    fn into_report(self, task_id: TaskId) -> HandoffReport {
        HandoffReport {
            task_id,
            status: self.status,
            summary: self.summary,
            artifacts: self.artifacts,
            decisions: self.decisions,
            open_questions: self.open_questions,
            resolved_questions: self.resolved_questions,
            resolved_question_ids: self.resolved_question_ids,
            next_step: self.next_step,
            key_facts: self.key_facts,
        }
    }
}

/// What one step did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Delegated {
        label: String,
        task: TaskId,
    },
    Accepted {
        label: String,
        outcome: HandoffOutcome,
    },
    Blocked {
        label: String,
    },
    Retried {
        label: String,
        task: TaskId,
        retry_of: TaskId,
    },
    Resolved {
        question: String,
        matched: bool,
    },
    /// The orchestrator refused the step; the replay continues
    Refused {
        step: usize,
        error: String,
    },
}

/// Run every step of `script` against `orchestrator`
///
/// Orchestrator errors are part of the replay and come back as
/// [`StepOutcome::Refused`]. Only malformed scripts (unknown or reused
/// labels) abort the run.
pub fn replay(orchestrator: &mut Orchestrator, script: &Script) -> Result<Vec<StepOutcome>> {
    let mut labels: HashMap<String, TaskId> = HashMap::new();
    let mut outcomes = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        let outcome = match step.clone() {
            Step::Delegate {
                label,
                role,
                context,
            } => {
                ensure_fresh(&labels, &label, index)?;
                match orchestrator.delegate(role, context) {
                    Ok(task) => {
                        labels.insert(label.clone(), task);
                        StepOutcome::Delegated { label, task }
                    }
                    Err(e) => refused(index, e),
                }
            }
            Step::Accept { task, report } => {
                let id = lookup(&labels, &task, index)?;
                match orchestrator.accept(id, report.into_report(id)) {
                    Ok(outcome) => StepOutcome::Accepted {
                        label: task,
                        outcome,
                    },
                    Err(e) => refused(index, e),
                }
            }
            Step::Block { task, reason } => {
                let id = lookup(&labels, &task, index)?;
                match orchestrator.block(id, reason) {
                    Ok(()) => StepOutcome::Blocked { label: task },
                    Err(e) => refused(index, e),
                }
            }
            Step::Retry {
                task,
                label,
                context,
            } => {
                let previous = lookup(&labels, &task, index)?;
                ensure_fresh(&labels, &label, index)?;
                match orchestrator.retry(previous, context) {
                    Ok(id) => {
                        labels.insert(label.clone(), id);
                        StepOutcome::Retried {
                            label,
                            task: id,
                            retry_of: previous,
                        }
                    }
                    Err(e) => refused(index, e),
                }
            }
            Step::Resolve { question } => {
                let matched = orchestrator.resolve_question(&question);
                StepOutcome::Resolved { question, matched }
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn lookup(labels: &HashMap<String, TaskId>, label: &str, index: usize) -> Result<TaskId> {
    labels
        .get(label)
        .copied()
        .with_context(|| format!("Step {}: no task labelled '{}'", index, label))
}

fn ensure_fresh(labels: &HashMap<String, TaskId>, label: &str, index: usize) -> Result<()> {
    if labels.contains_key(label) {
        anyhow::bail!("Step {}: label '{}' is already in use", index, label);
    }
    Ok(())
}

fn refused(step: usize, error: maestro_core::MaestroError) -> StepOutcome {
    tracing::debug!(step, %error, "Step refused");
    StepOutcome::Refused {
        step,
        error: error.to_string(),
    }
}
