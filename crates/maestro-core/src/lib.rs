//! Maestro Core - bookkeeping for multi-role agent workflows
//!
//! Maestro Core coordinates work between specialized roles (architect,
//! backend developer, tester, ...). It does not perform any of that work: it
//! hands out tasks, validates the handoff reports that close them, and keeps
//! an append-only record of what the session has learned.
//!
//! # Architecture
//!
//! 1. **Role Registry** (`role`): static catalog of roles and their report contracts
//! 2. **Task Dispatcher** (`orchestrator`): delegation, acceptance, blocking, retries
//! 3. **Handoff Reports** (`report`): structured, validated task results
//! 4. **Workflow State** (`state`): append-only facts and open questions
//! 5. **Journal** (`journal`, `storage`): persisted event log of a session
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use maestro_core::{CompletionStatus, HandoffReport, Orchestrator, ReportField, Role, RoleRegistry};
//! use maestro_core::config::SessionConfig;
//! use maestro_core::task::TaskContext;
//!
//! let backend = Role::builder("backend-developer")
//!     .responsibility("Implement API endpoints")
//!     .require(ReportField::Summary)
//!     .build()
//!     .unwrap();
//! let registry = Arc::new(RoleRegistry::from_roles([backend]).unwrap());
//!
//! let mut maestro = Orchestrator::new(registry, SessionConfig::default());
//!
//! let mut context = TaskContext::new();
//! context.insert("feature".into(), "auth".into());
//! let task = maestro.delegate("backend-developer", context).unwrap();
//!
//! let report = HandoffReport::builder(task, CompletionStatus::Completed)
//!     .summary("done")
//!     .key_fact("Implemented JWT auth")
//!     .build();
//! maestro.accept(task, report).unwrap();
//!
//! assert_eq!(maestro.snapshot().fact_texts(), vec!["Implemented JWT auth"]);
//! ```
//!
//! # Design Principles
//!
//! 1. **Atomic acceptance**: a rejected report changes neither the task nor the state
//! 2. **Append-only history**: facts are never deleted, tasks are never reopened
//! 3. **Session isolation**: each orchestrator owns its tasks, state and journal

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod journal;
pub mod orchestrator;
pub mod report;
pub mod role;
pub mod session;
pub mod state;
pub mod storage;
pub mod task;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{MaestroConfig, RoleDefinition, SessionConfig};
pub use error::{MaestroError, ReportError, Result};
pub use journal::{JournalEntry, JournalEvent, SessionId};
pub use orchestrator::{HandoffOutcome, Orchestrator, SessionArchive};
pub use report::{HandoffReport, NextStep, ReportField};
pub use role::{Role, RoleRegistry};
pub use session::SessionManager;
pub use storage::JournalStore;
pub use state::{Fact, OpenQuestion, WorkflowSnapshot, WorkflowState};
pub use task::{Task, TaskContext};
pub use types::{CompletionStatus, QuestionId, RoleId, TaskId, TaskStatus, Timestamp, WorkflowMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
