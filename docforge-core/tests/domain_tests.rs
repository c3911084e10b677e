use docforge_core::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

// ===== TaskKey Tests =====

#[test]
fn test_task_key_display_and_borrow() {
    let key = TaskKey::new("risk_register");
    assert_eq!(key.to_string(), "risk_register");
    assert_eq!(key.as_str(), "risk_register");

    let mut map = std::collections::HashMap::new();
    map.insert(key.clone(), 1);
    assert_eq!(map.get("risk_register"), Some(&1));
}

#[test]
fn test_task_key_empty_detection() {
    assert!(TaskKey::new("").is_empty());
    assert!(TaskKey::new("   ").is_empty());
    assert!(!TaskKey::new("charter").is_empty());
}

// ===== Priority Tests =====

#[test]
fn test_priority_default_is_unspecified_sentinel() {
    assert_eq!(Priority::default(), Priority::UNSPECIFIED);
    assert_eq!(Priority::UNSPECIFIED.value(), 999);
    assert!(Priority::default().is_unspecified());
}

#[test]
fn test_priority_ordering() {
    assert!(Priority::HIGHEST < Priority::new(1));
    assert!(Priority::new(10) < Priority::UNSPECIFIED);
}

// ===== DocumentCategory Tests =====

#[rstest]
#[case("initiation", DocumentCategory::Initiation)]
#[case("Planning", DocumentCategory::Planning)]
#[case(" execution ", DocumentCategory::Execution)]
#[case("monitoring", DocumentCategory::Monitoring)]
#[case("CLOSURE", DocumentCategory::Closure)]
#[case("governance", DocumentCategory::Custom("governance".to_string()))]
fn test_category_parsing(#[case] raw: &str, #[case] expected: DocumentCategory) {
    assert_eq!(DocumentCategory::from(raw), expected);
}

#[test]
fn test_category_serializes_as_plain_string() {
    let json = serde_json::to_string(&DocumentCategory::Planning).unwrap();
    assert_eq!(json, "\"planning\"");

    let custom: DocumentCategory = serde_json::from_str("\"audit\"").unwrap();
    assert_eq!(custom, DocumentCategory::Custom("audit".to_string()));
}

// ===== GenerationTask Tests =====

#[test]
fn test_generation_task_builder() {
    let task = GenerationTask::new("scope_statement", DocumentCategory::Planning)
        .with_priority(3)
        .with_dependencies(["project_charter", "stakeholder_register"]);

    assert_eq!(task.title, "Scope Statement");
    assert_eq!(task.priority, Priority::new(3));
    assert_eq!(task.dependencies.len(), 2);
    assert!(task.depends_on(&TaskKey::new("project_charter")));
    assert!(!task.is_external());
}

#[test]
fn test_generation_task_defaults_to_unspecified_priority() {
    let task = GenerationTask::new("lessons_learned", DocumentCategory::Closure);
    assert_eq!(task.priority, Priority::UNSPECIFIED);
    assert!(task.dependencies.is_empty());
}

#[rstest]
#[case("project_charter", "Project Charter")]
#[case("work-breakdown-structure", "Work Breakdown Structure")]
#[case("raci", "Raci")]
#[case("", "")]
fn test_title_from_key(#[case] key: &str, #[case] expected: &str) {
    assert_eq!(title_from_key(key), expected);
}

// ===== GenerationRun Tests =====

fn artifact(key: &str) -> Artifact {
    Artifact {
        key: TaskKey::new(key),
        title: title_from_key(key),
        content: format!("# {}", key),
    }
}

#[test]
fn test_generation_run_counts_and_artifacts() {
    let results = vec![
        TaskResult::succeeded(artifact("project_charter"), 1, 20),
        TaskResult::failed(
            TaskKey::new("risk_register"),
            TaskError::new(TaskErrorKind::ContentGeneration, "backend down"),
            3,
            40,
        ),
        TaskResult::skipped(
            TaskKey::new("risk_response_plan"),
            TaskError::new(TaskErrorKind::DependencyFailed, "risk_register failed"),
        ),
        TaskResult::succeeded(artifact("scope_statement"), 2, 10),
    ];

    let run = GenerationRun::new(RunId::new(), results, chrono::Utc::now(), 70, false);

    assert_eq!(run.succeeded_count, 2);
    assert_eq!(run.failed_count, 1);
    assert_eq!(run.skipped_count, 1);
    assert_eq!(run.total_tasks(), 4);
    assert_eq!(run.artifacts.len(), 2);
    assert_eq!(run.artifacts[0].key.as_str(), "project_charter");
    assert_eq!(run.artifacts[1].key.as_str(), "scope_statement");
    assert_eq!(run.errors().len(), 2);
    assert_eq!(run.status_of("risk_register"), Some(TaskStatus::Failed));
    assert!(!run.is_complete_success());
    assert_eq!(run.compliance, ComplianceOutcome::NotRequested);
}

#[test]
fn test_generation_run_empty_is_success() {
    let run = GenerationRun::new(RunId::new(), vec![], chrono::Utc::now(), 0, false);
    assert!(run.is_complete_success());
    assert!(run.artifacts.is_empty());
}

// ===== ComplianceReport Tests =====

#[test]
fn test_compliance_report_summary_mentions_every_document() {
    let report = ComplianceReport {
        standard: "pm-baseline".to_string(),
        documents: vec![
            ComplianceScore {
                key: TaskKey::new("project_charter"),
                title: "Project Charter".to_string(),
                score: 97.0,
                status: ComplianceStatus::Compliant,
                breakdown: ScoreBreakdown::default(),
                issues: vec![],
            },
            ComplianceScore {
                key: TaskKey::new("risk_register"),
                title: "Risk Register".to_string(),
                score: 55.0,
                status: ComplianceStatus::NonCompliant,
                breakdown: ScoreBreakdown::default(),
                issues: vec![ComplianceIssue::new(
                    IssueCategory::Structure,
                    Severity::High,
                    "Missing section 'Risk Owners'",
                    "Add a 'Risk Owners' section",
                )],
            },
        ],
        overall_score: 76.0,
        consistency: ConsistencyReport::default(),
        generated_at: chrono::Utc::now(),
    };

    let summary = report.summary();
    assert!(summary.contains("pm-baseline"));
    assert!(summary.contains("Project Charter [project_charter]: 97.0 (compliant)"));
    assert!(summary.contains("HIGH structure: Missing section 'Risk Owners'"));
    assert_eq!(report.count_by_status(ComplianceStatus::NonCompliant), 1);
    assert_eq!(
        report.document("risk_register").and_then(|d| d.highest_severity()),
        Some(Severity::High)
    );
}

#[test]
fn test_severity_ordering() {
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::High < Severity::Critical);
}
