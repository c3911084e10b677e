use docforge_core::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_task_status_wire_format() {
    assert_eq!(serde_json::to_value(TaskStatus::Succeeded).unwrap(), json!("succeeded"));
    assert_eq!(serde_json::to_value(TaskStatus::Skipped).unwrap(), json!("skipped"));
}

#[test]
fn test_compliance_status_and_severity_wire_format() {
    assert_eq!(
        serde_json::to_value(ComplianceStatus::PartiallyCompliant).unwrap(),
        json!("partially_compliant")
    );
    assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), json!("CRITICAL"));
}

#[test]
fn test_compliance_outcome_is_tagged() {
    let outcome = ComplianceOutcome::Unavailable {
        reason: "standard failed to load".to_string(),
    };
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        value,
        json!({"state": "unavailable", "reason": "standard failed to load"})
    );

    let not_requested = serde_json::to_value(ComplianceOutcome::NotRequested).unwrap();
    assert_eq!(not_requested, json!({"state": "not_requested"}));
}

#[test]
fn test_task_result_serialization_omits_nothing() {
    let result = TaskResult::failed(
        TaskKey::new("cost_baseline"),
        TaskError::new(TaskErrorKind::Timeout, "timed out after 30s"),
        3,
        1500,
    );

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["key"], json!("cost_baseline"));
    assert_eq!(value["status"], json!("failed"));
    assert_eq!(value["artifact"], serde_json::Value::Null);
    assert_eq!(value["error"]["kind"], json!("timeout"));
    assert_eq!(value["attempts"], json!(3));
    assert_eq!(value["duration_ms"], json!(1500));
}

#[test]
fn test_project_context_metadata_defaults_when_absent() {
    let context: ProjectContext = serde_json::from_value(json!({
        "project_id": "PRJ-042",
        "project_name": "Warehouse Automation",
        "organization": null,
        "stakeholders": ["Dana Whitfield"]
    }))
    .unwrap();

    assert_eq!(context.project_id, "PRJ-042");
    assert!(context.metadata.is_empty());
    assert_eq!(context.stakeholders, vec!["Dana Whitfield".to_string()]);
}

#[test]
fn test_generation_task_round_trip_keeps_processor_ref() {
    let task = GenerationTask::new("vendor_assessment", DocumentCategory::from("procurement"))
        .with_priority(40)
        .with_dependencies(["procurement_plan"])
        .with_processor(ProcessorRef::new("plugins/vendor", "VendorAssessment"));

    let json = serde_json::to_string(&task).unwrap();
    let back: GenerationTask = serde_json::from_str(&json).unwrap();

    assert_eq!(back, task);
    assert_eq!(
        back.processor.map(|p| p.to_string()),
        Some("plugins/vendor::VendorAssessment".to_string())
    );
}
