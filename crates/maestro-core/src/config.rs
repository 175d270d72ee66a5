//! Maestro configuration
//!
//! Role definitions arrive here already structured (one record per role);
//! turning mode documents into these records is the job of an external loader.

use crate::error::{MaestroError, Result};
use crate::report::ReportField;
use crate::role::{Role, RoleRegistry};
use crate::types::{CompletionStatus, WorkflowMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of active tasks a role may hold
pub const DEFAULT_MAX_ACTIVE_PER_ROLE: usize = 1;

/// Default number of A→B→A hand-backs before a cycle is reported
pub const DEFAULT_HANDBACK_LIMIT: u32 = 3;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaestroConfig {
    /// Per-session orchestration policy
    pub session: SessionConfig,

    /// Role catalog; the built-in catalog is used when empty
    pub roles: Vec<RoleDefinition>,
}

impl MaestroConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_role(mut self, role: RoleDefinition) -> Self {
        self.roles.push(role);
        self
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("toml") | None => Self::from_toml(&content),
            Some(other) => Err(MaestroError::Config(format!(
                "unsupported configuration format: .{other}"
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MaestroError::Config(e.to_string()))
    }

    /// Save configuration as TOML
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MaestroError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build the role registry described by this configuration
    pub fn registry(&self) -> Result<RoleRegistry> {
        if self.roles.is_empty() {
            tracing::debug!("No roles configured, using built-in catalog");
            return crate::catalog::builtin_registry();
        }

        let roles = self
            .roles
            .iter()
            .cloned()
            .map(RoleDefinition::into_role)
            .collect::<Result<Vec<_>>>()?;
        RoleRegistry::from_roles(roles)
    }
}

/// Per-session orchestration policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// YOLO (autonomous) or Follow (checkpointed)
    pub mode: WorkflowMode,

    /// Active tasks a single role may hold at once
    pub max_active_per_role: usize,

    /// Consecutive hand-backs between one pair of roles before a cycle is flagged
    pub handback_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: WorkflowMode::default(),
            max_active_per_role: DEFAULT_MAX_ACTIVE_PER_ROLE,
            handback_limit: DEFAULT_HANDBACK_LIMIT,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: WorkflowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_active_per_role(mut self, max: usize) -> Self {
        self.max_active_per_role = max.max(1);
        self
    }

    pub fn with_handback_limit(mut self, limit: u32) -> Self {
        self.handback_limit = limit;
        self
    }
}

/// Structured role record as found in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub id: String,

    #[serde(default)]
    pub description: String,

    pub responsibilities: Vec<String>,

    #[serde(default)]
    pub required_fields: Vec<ReportField>,

    /// All completion statuses when omitted
    #[serde(default)]
    pub permitted_statuses: Option<Vec<CompletionStatus>>,
}

impl RoleDefinition {
    pub fn into_role(self) -> Result<Role> {
        let mut builder = Role::builder(self.id)
            .description(self.description)
            .responsibilities(self.responsibilities);

        for field in self.required_fields {
            builder = builder.require(field);
        }

        if let Some(statuses) = self.permitted_statuses {
            builder = builder.permit(statuses);
        }

        builder.build()
    }
}

impl From<&Role> for RoleDefinition {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.to_string(),
            description: role.description.clone(),
            responsibilities: role.responsibilities.clone(),
            required_fields: role.required_fields.iter().copied().collect(),
            permitted_statuses: Some(role.permitted_statuses.iter().copied().collect()),
        }
    }
}
