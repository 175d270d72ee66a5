//! Workflow state store
//!
//! Accumulates key facts and open questions across one workflow session.
//!
//! - Facts are append-only: a correction is a new fact, never a deletion.
//! - Questions are keyed by `(text, owner)`; re-adding an identical question
//!   from the same role is a no-op.
//! - Resolving an unknown question is a no-op. Question matching over free
//!   text is best-effort.

use crate::types::{QuestionId, RoleId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// A key fact tagged with the role and task that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Position in the session's fact log, starting at 0
    pub seq: u64,
    pub role: RoleId,
    pub task: TaskId,
    pub text: String,
    pub recorded_at: Timestamp,
}

/// An open (or since resolved) question and the role that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub id: QuestionId,
    pub text: String,
    pub owner: RoleId,
    pub resolved: bool,
    pub raised_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// Read-only view of the state: all facts and the unresolved questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub facts: Vec<Fact>,
    pub open_questions: Vec<OpenQuestion>,
}

impl WorkflowSnapshot {
    pub fn fact_texts(&self) -> Vec<&str> {
        self.facts.iter().map(|f| f.text.as_str()).collect()
    }
}

/// Accumulated facts and questions of one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    facts: Vec<Fact>,
    questions: Vec<OpenQuestion>,
    next_question_id: u64,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append facts in order; returns how many were appended
    pub fn append_facts<I, S>(&mut self, role: &RoleId, task: TaskId, facts: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = crate::types::now();
        let before = self.facts.len();

        for text in facts {
            let seq = self.facts.len() as u64;
            self.facts.push(Fact {
                seq,
                role: role.clone(),
                task,
                text: text.into(),
                recorded_at: now,
            });
        }

        self.facts.len() - before
    }

    /// Insert an unresolved question; returns the id of the existing entry
    /// when the same role already raised identical text
    pub fn add_open_question(&mut self, question: impl Into<String>, owner: &RoleId) -> QuestionId {
        let text = question.into();

        if let Some(existing) = self
            .questions
            .iter()
            .find(|q| q.text == text && &q.owner == owner)
        {
            return existing.id;
        }

        let id = QuestionId(self.next_question_id);
        self.next_question_id += 1;
        self.questions.push(OpenQuestion {
            id,
            text,
            owner: owner.clone(),
            resolved: false,
            raised_at: crate::types::now(),
            resolved_at: None,
        });
        id
    }

    /// Mark every unresolved question with this exact text as resolved.
    /// Returns `false` (and changes nothing) when none matched.
    pub fn resolve_question(&mut self, question: &str) -> bool {
        let now = crate::types::now();
        let mut changed = false;

        for q in self
            .questions
            .iter_mut()
            .filter(|q| !q.resolved && q.text == question)
        {
            q.resolved = true;
            q.resolved_at = Some(now);
            changed = true;
        }

        changed
    }

    pub fn resolve_question_by_id(&mut self, id: QuestionId) -> bool {
        match self.questions.iter_mut().find(|q| q.id == id && !q.resolved) {
            Some(q) => {
                q.resolved = true;
                q.resolved_at = Some(crate::types::now());
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            facts: self.facts.clone(),
            open_questions: self.unresolved().cloned().collect(),
        }
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// All questions ever raised, resolved or not
    pub fn question(&self, id: QuestionId) -> Option<&OpenQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn questions(&self) -> &[OpenQuestion] {
        &self.questions
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &OpenQuestion> {
        self.questions.iter().filter(|q| !q.resolved)
    }

    pub fn has_unresolved(&self) -> bool {
        self.questions.iter().any(|q| !q.resolved)
    }

    pub fn facts_by<'a>(&'a self, role: &'a RoleId) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.iter().filter(move |f| &f.role == role)
    }
}
