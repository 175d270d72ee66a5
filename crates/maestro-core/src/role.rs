//! Roles and the role registry
//!
//! A [`Role`] is a named category of responsibility (Architecture Designer,
//! Backend Developer, Tester, ...) together with the contract its handoff
//! reports must satisfy. Roles are registered once at startup and are never
//! mutated afterwards; the [`RoleRegistry`] only supports insertion and lookup.
//!
//! # Examples
//!
//! ```
//! use maestro_core::role::{Role, RoleRegistry};
//! use maestro_core::report::ReportField;
//!
//! let role = Role::builder("backend-developer")
//!     .description("Implements server-side features")
//!     .responsibility("Implement API endpoints")
//!     .require(ReportField::Summary)
//!     .build()
//!     .unwrap();
//!
//! let mut registry = RoleRegistry::new();
//! registry.register(role.clone()).unwrap();
//! assert_eq!(registry.lookup(&role.id).unwrap(), &role);
//! ```

use crate::error::{MaestroError, Result};
use crate::report::ReportField;
use crate::types::{CompletionStatus, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A registered role and its reporting contract
///
/// # Invariants
///
/// - `id` is non-empty
/// - `responsibilities` is non-empty
/// - `permitted_statuses` is non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier
    pub id: RoleId,

    /// Free-text description
    pub description: String,

    /// Ordered list of responsibilities
    pub responsibilities: Vec<String>,

    /// Fields a handoff report from this role must carry
    pub required_fields: BTreeSet<ReportField>,

    /// Completion statuses this role may report
    pub permitted_statuses: BTreeSet<CompletionStatus>,
}

impl Role {
    /// Create a builder for fluent role construction
    pub fn builder(id: impl Into<RoleId>) -> RoleBuilder {
        RoleBuilder::new(id)
    }

    /// Validate the role's invariants
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(MaestroError::InvalidRole(
                "role identifier must not be empty".to_string(),
            ));
        }

        if self.responsibilities.is_empty()
            || self.responsibilities.iter().all(|r| r.trim().is_empty())
        {
            return Err(MaestroError::InvalidRole(format!(
                "role {} has no responsibilities",
                self.id
            )));
        }

        if self.permitted_statuses.is_empty() {
            return Err(MaestroError::InvalidRole(format!(
                "role {} permits no completion status",
                self.id
            )));
        }

        Ok(())
    }

    /// Whether this role may close a task with `status`
    pub fn permits(&self, status: CompletionStatus) -> bool {
        self.permitted_statuses.contains(&status)
    }

    /// Whether reports from this role must carry `field`
    pub fn requires(&self, field: ReportField) -> bool {
        self.required_fields.contains(&field)
    }
}

/// Builder for constructing roles fluently
#[derive(Debug)]
pub struct RoleBuilder {
    id: RoleId,
    description: String,
    responsibilities: Vec<String>,
    required_fields: BTreeSet<ReportField>,
    permitted_statuses: Option<BTreeSet<CompletionStatus>>,
}

impl RoleBuilder {
    fn new(id: impl Into<RoleId>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            responsibilities: Vec::new(),
            required_fields: BTreeSet::new(),
            permitted_statuses: None,
        }
    }

    /// Set the description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a responsibility
    pub fn responsibility(mut self, responsibility: impl Into<String>) -> Self {
        self.responsibilities.push(responsibility.into());
        self
    }

    /// Set all responsibilities
    pub fn responsibilities<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responsibilities = items.into_iter().map(Into::into).collect();
        self
    }

    /// Require a report field
    pub fn require(mut self, field: ReportField) -> Self {
        self.required_fields.insert(field);
        self
    }

    /// Restrict the completion statuses this role may report
    pub fn permit<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = CompletionStatus>,
    {
        self.permitted_statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Build the role
    ///
    /// # Errors
    ///
    /// Returns `Err` if validation fails.
    pub fn build(self) -> Result<Role> {
        let role = Role {
            id: self.id,
            description: self.description,
            responsibilities: self.responsibilities,
            required_fields: self.required_fields,
            permitted_statuses: self
                .permitted_statuses
                .unwrap_or_else(|| CompletionStatus::ALL.into_iter().collect()),
        };

        role.validate()?;

        Ok(role)
    }
}

/// Static catalog of known roles
///
/// Populated once at startup; read-only afterwards, so a registry can be
/// shared across sessions behind an `Arc` without locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRegistry {
    roles: BTreeMap<RoleId, Role>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already-structured role records
    pub fn from_roles<I>(roles: I) -> Result<Self>
    where
        I: IntoIterator<Item = Role>,
    {
        let mut registry = Self::new();
        for role in roles {
            registry.register(role)?;
        }
        Ok(registry)
    }

    /// Register a role
    ///
    /// # Errors
    ///
    /// - [`MaestroError::DuplicateRole`] if the identifier is already present
    /// - [`MaestroError::InvalidRole`] if the role violates its invariants
    pub fn register(&mut self, role: Role) -> Result<()> {
        role.validate()?;

        if self.roles.contains_key(&role.id) {
            return Err(MaestroError::DuplicateRole(role.id));
        }

        tracing::info!("Role registered: {}", role.id);
        self.roles.insert(role.id.clone(), role);
        Ok(())
    }

    /// Look up a role by identifier
    pub fn lookup(&self, id: &RoleId) -> Result<&Role> {
        self.roles
            .get(id)
            .ok_or_else(|| MaestroError::UnknownRole(id.clone()))
    }

    pub fn contains(&self, id: &RoleId) -> bool {
        self.roles.contains_key(id)
    }

    /// Iterate roles in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> Role {
        Role::builder("tester")
            .description("Writes and runs tests")
            .responsibility("Write unit tests")
            .responsibility("Report coverage")
            .build()
            .unwrap()
    }

    #[test]
    fn test_role_builder_defaults() {
        let role = tester();
        assert_eq!(role.id.as_str(), "tester");
        assert_eq!(role.responsibilities.len(), 2);
        assert!(role.required_fields.is_empty());
        assert_eq!(role.permitted_statuses.len(), 3);
    }

    #[test]
    fn test_role_requires_responsibilities() {
        let result = Role::builder("empty").build();
        assert!(matches!(result, Err(MaestroError::InvalidRole(_))));
    }

    #[test]
    fn test_role_requires_identifier() {
        let result = Role::builder("  ").responsibility("Anything").build();
        assert!(matches!(result, Err(MaestroError::InvalidRole(_))));
    }

    #[test]
    fn test_permit_restricts_statuses() {
        let role = Role::builder("reviewer")
            .responsibility("Review code")
            .permit([CompletionStatus::Completed])
            .build()
            .unwrap();

        assert!(role.permits(CompletionStatus::Completed));
        assert!(!role.permits(CompletionStatus::Blocked));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = RoleRegistry::new();
        registry.register(tester()).unwrap();

        assert_eq!(registry.lookup(&RoleId::new("tester")).unwrap(), &tester());
        assert!(matches!(
            registry.lookup(&RoleId::new("designer")),
            Err(MaestroError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = RoleRegistry::new();
        registry.register(tester()).unwrap();

        let err = registry.register(tester()).unwrap_err();
        assert!(matches!(err, MaestroError::DuplicateRole(id) if id.as_str() == "tester"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_roles() {
        let architect = Role::builder("architect")
            .responsibility("Design the system")
            .build()
            .unwrap();
        let registry = RoleRegistry::from_roles([tester(), architect]).unwrap();

        let ids: Vec<_> = registry.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["architect", "tester"]);
    }
}
