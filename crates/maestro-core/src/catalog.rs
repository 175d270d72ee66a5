//! Built-in role catalog
//!
//! The standard roster of specialist modes, already in structured form. The
//! orchestrator itself is not a role: it only delegates and merges.

use crate::error::Result;
use crate::report::ReportField;
use crate::role::{Role, RoleRegistry};
use crate::types::CompletionStatus;

/// Identifiers of the built-in roles
pub mod ids {
    pub const ARCHITECT: &str = "architect";
    pub const BACKEND_DEVELOPER: &str = "backend-developer";
    pub const FRONTEND_DEVELOPER: &str = "frontend-developer";
    pub const SECURITY_SPECIALIST: &str = "security-specialist";
    pub const TESTER: &str = "tester";
    pub const PLAYWRIGHT_TESTER: &str = "playwright-tester";
    pub const CODE_REVIEWER: &str = "code-reviewer";
    pub const DOCUMENTATION_WRITER: &str = "documentation-writer";
    pub const DEVOPS_ENGINEER: &str = "devops-engineer";
}

/// All built-in roles
pub fn builtin_roles() -> Result<Vec<Role>> {
    Ok(vec![
        Role::builder(ids::ARCHITECT)
            .description("Designs system structure and records architecture decisions")
            .responsibilities([
                "Analyze requirements and constraints",
                "Define components and their boundaries",
                "Record architecture decisions with rationale",
                "Identify technical risks",
            ])
            .require(ReportField::Summary)
            .require(ReportField::Decisions)
            .build()?,
        Role::builder(ids::BACKEND_DEVELOPER)
            .description("Implements server-side logic, APIs and data access")
            .responsibilities([
                "Implement API endpoints",
                "Implement data models and migrations",
                "Write unit tests for new code",
            ])
            .require(ReportField::Summary)
            .build()?,
        Role::builder(ids::FRONTEND_DEVELOPER)
            .description("Implements user interfaces and client-side state")
            .responsibilities([
                "Implement UI components",
                "Wire components to backend APIs",
                "Keep accessibility requirements",
            ])
            .require(ReportField::Summary)
            .build()?,
        Role::builder(ids::SECURITY_SPECIALIST)
            .description("Reviews designs and code for vulnerabilities")
            .responsibilities([
                "Threat-model new features",
                "Audit authentication and authorization",
                "Report findings with severity",
            ])
            .require(ReportField::Summary)
            .require(ReportField::KeyFacts)
            .build()?,
        Role::builder(ids::TESTER)
            .description("Plans and executes tests")
            .responsibilities([
                "Write test plans",
                "Write and run automated tests",
                "Report defects and coverage",
            ])
            .build()?,
        Role::builder(ids::PLAYWRIGHT_TESTER)
            .description("Writes end-to-end browser tests with Playwright")
            .responsibilities([
                "Write end-to-end scenarios",
                "Maintain page objects and fixtures",
            ])
            .build()?,
        Role::builder(ids::CODE_REVIEWER)
            .description("Reviews changes before they are merged")
            .responsibilities([
                "Review code for correctness and style",
                "Request changes or approve",
            ])
            .permit([CompletionStatus::Completed, CompletionStatus::Blocked])
            .build()?,
        Role::builder(ids::DOCUMENTATION_WRITER)
            .description("Writes user and developer documentation")
            .responsibilities(["Write guides and API references", "Keep docs in sync with code"])
            .require(ReportField::Artifacts)
            .build()?,
        Role::builder(ids::DEVOPS_ENGINEER)
            .description("Owns build, deployment and infrastructure")
            .responsibilities([
                "Maintain CI pipelines",
                "Provision environments",
                "Manage secrets and credentials",
            ])
            .build()?,
    ])
}

/// Registry holding the built-in roles
pub fn builtin_registry() -> Result<RoleRegistry> {
    RoleRegistry::from_roles(builtin_roles()?)
}
