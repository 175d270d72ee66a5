//! Property tests for the workflow invariants

use std::sync::Arc;

use maestro_core::{
    CompletionStatus, HandoffReport, MaestroError, Orchestrator, ReportField, Role, RoleId,
    RoleRegistry, SessionConfig, TaskContext, TaskStatus, WorkflowState,
};
use proptest::prelude::*;

fn registry() -> Arc<RoleRegistry> {
    let backend = Role::builder("backend-developer")
        .responsibility("Implement API endpoints")
        .require(ReportField::Summary)
        .build()
        .unwrap();
    let reviewer = Role::builder("code-reviewer")
        .responsibility("Review changes")
        .permit([CompletionStatus::Completed, CompletionStatus::Blocked])
        .build()
        .unwrap();
    Arc::new(RoleRegistry::from_roles([backend, reviewer]).unwrap())
}

fn completion_status() -> impl Strategy<Value = CompletionStatus> {
    prop_oneof![
        Just(CompletionStatus::Completed),
        Just(CompletionStatus::PartiallyCompleted),
        Just(CompletionStatus::Blocked),
    ]
}

/// Ways a report for `backend-developer` can be malformed
#[derive(Debug, Clone)]
enum Defect {
    MissingSummary,
    EmptyArtifact,
    UnknownNextRole(String),
    WrongTask,
}

fn defect() -> impl Strategy<Value = Defect> {
    prop_oneof![
        Just(Defect::MissingSummary),
        Just(Defect::EmptyArtifact),
        "[a-z]{3,10}-ghost".prop_map(Defect::UnknownNextRole),
        Just(Defect::WrongTask),
    ]
}

proptest! {
    #[test]
    fn facts_grow_by_report_key_facts(
        rounds in prop::collection::vec(
            (completion_status(), prop::collection::vec("[a-zA-Z ]{1,24}", 0..5)),
            1..6,
        )
    ) {
        let mut maestro = Orchestrator::new(registry(), SessionConfig::default());

        for (status, key_facts) in rounds {
            let before = maestro.snapshot().facts.len();
            let id = maestro.delegate("backend-developer", TaskContext::new()).unwrap();

            let mut builder = HandoffReport::builder(id, status).summary("round");
            for fact in &key_facts {
                builder = builder.key_fact(fact.clone());
            }
            let outcome = maestro.accept(id, builder.build()).unwrap();

            prop_assert_eq!(outcome.accepted_facts.len(), key_facts.len());
            prop_assert_eq!(maestro.snapshot().facts.len(), before + key_facts.len());
        }
    }

    #[test]
    fn rejected_report_leaves_snapshot_identical(
        defect in defect(),
        facts in prop::collection::vec("[a-z]{1,12}", 1..4),
        question in "[a-z ]{1,20}\\?",
    ) {
        let mut maestro = Orchestrator::new(registry(), SessionConfig::default());

        // Seed some prior state
        let seed = maestro.delegate("backend-developer", TaskContext::new()).unwrap();
        maestro
            .accept(
                seed,
                HandoffReport::builder(seed, CompletionStatus::Completed)
                    .summary("seed")
                    .key_fact("Seeded fact")
                    .open_question("Seeded question?")
                    .build(),
            )
            .unwrap();

        let id = maestro.delegate("backend-developer", TaskContext::new()).unwrap();
        let before = maestro.snapshot();
        let before_bytes = serde_json::to_vec(&before).unwrap();

        let mut builder = HandoffReport::builder(id, CompletionStatus::Completed)
            .summary("looks fine")
            .open_question(question)
            .resolves("Seeded question?");
        for fact in facts {
            builder = builder.key_fact(fact);
        }
        let report = match defect {
            Defect::MissingSummary => builder.summary("").build(),
            Defect::EmptyArtifact => builder.artifact("").build(),
            Defect::UnknownNextRole(role) => builder.next_step(role.as_str(), "continue").build(),
            Defect::WrongTask => {
                let mut report = builder.build();
                report.task_id = seed;
                report
            }
        };

        let result = maestro.accept(id, report);
        let is_invalid_report = matches!(result, Err(MaestroError::InvalidReport { .. }));
        prop_assert!(is_invalid_report);

        let after = maestro.snapshot();
        prop_assert_eq!(serde_json::to_vec(&after).unwrap(), before_bytes);
        prop_assert_eq!(after, before);
        prop_assert_eq!(maestro.task(id).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn resolving_twice_equals_resolving_once(
        questions in prop::collection::vec("[a-z ]{1,16}", 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let owner = RoleId::new("tester");
        let mut once = WorkflowState::new();
        for q in &questions {
            once.add_open_question(q.clone(), &owner);
        }
        let mut twice = once.clone();

        let target = pick.get(&questions);
        once.resolve_question(target);
        twice.resolve_question(target);
        let second = twice.resolve_question(target);

        prop_assert!(!second);
        prop_assert_eq!(once.snapshot().open_questions.len(), twice.snapshot().open_questions.len());
        let once_ids: Vec<_> = once.unresolved().map(|q| q.id).collect();
        let twice_ids: Vec<_> = twice.unresolved().map(|q| q.id).collect();
        prop_assert_eq!(once_ids, twice_ids);
    }

    #[test]
    fn completed_task_path_is_fixed(extra in prop::collection::vec(completion_status(), 0..4)) {
        let mut maestro = Orchestrator::new(registry(), SessionConfig::default());
        let id = maestro.delegate("code-reviewer", TaskContext::new()).unwrap();
        maestro
            .accept(id, HandoffReport::builder(id, CompletionStatus::Completed).build())
            .unwrap();

        // Later reports for the same task are all refused
        for status in extra {
            let report = HandoffReport::builder(id, status).build();
            prop_assert!(maestro.accept(id, report).is_err());
        }
        prop_assert!(maestro.block(id, "late").is_err());
        prop_assert!(maestro.retry(id, None).is_err());

        prop_assert_eq!(
            maestro.task(id).unwrap().status_path(),
            vec![TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed]
        );
    }
}

fn report_field() -> impl Strategy<Value = ReportField> {
    prop_oneof![
        Just(ReportField::Summary),
        Just(ReportField::Artifacts),
        Just(ReportField::Decisions),
        Just(ReportField::OpenQuestions),
        Just(ReportField::NextStep),
        Just(ReportField::KeyFacts),
    ]
}

fn role_with_id(id: String) -> impl Strategy<Value = Role> {
    (
        "[A-Za-z ]{0,30}",
        prop::collection::vec("[A-Za-z][A-Za-z ]{0,29}", 1..4),
        prop::collection::btree_set(report_field(), 0..3),
        prop::collection::btree_set(completion_status(), 1..3),
    )
        .prop_map(move |(description, responsibilities, fields, statuses)| {
            let mut builder = Role::builder(id.as_str())
                .description(description)
                .responsibilities(responsibilities)
                .permit(statuses);
            for field in fields {
                builder = builder.require(field);
            }
            builder.build().unwrap()
        })
}

fn role_set() -> impl Strategy<Value = Vec<Role>> {
    prop::collection::btree_set("[a-z]{3,12}", 1..8).prop_flat_map(|ids| {
        ids.into_iter()
            .map(role_with_id)
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn lookup_returns_registered_role(roles in role_set(), missing in "[a-z]{3,12}-x") {
        let registry = RoleRegistry::from_roles(roles.clone()).unwrap();
        prop_assert_eq!(registry.len(), roles.len());

        for role in &roles {
            prop_assert_eq!(registry.lookup(&role.id).unwrap(), role);
        }

        let unknown = registry.lookup(&RoleId::new(missing));
        prop_assert!(matches!(unknown, Err(MaestroError::UnknownRole(_))));
    }
}
