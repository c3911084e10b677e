mod common;

use common::{context, EchoSectionsGenerator};
use docforge_compliance::ComplianceStandard;
use docforge_core::{ProcessorInput, TaskKey};
use docforge_workflow::{builtin_document, ModuleTable, ProcessorRegistry, TaskCatalog, BUILTIN_DOCUMENTS};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

// ===== Built-in Document Tests =====

#[test]
fn test_every_builtin_document_has_baseline_requirements() {
    let standard = ComplianceStandard::pm_baseline();

    for document in BUILTIN_DOCUMENTS {
        let key = TaskKey::new(document.key);
        assert!(standard.covers(&key), "{} has no baseline requirements", document.key);
        assert!(!standard.requirements_for(&key).sections.is_empty());
    }
}

#[test]
fn test_builtin_catalog_mirrors_definitions() {
    let catalog = TaskCatalog::builtin().unwrap();

    for (task, document) in catalog.tasks().iter().zip(BUILTIN_DOCUMENTS) {
        assert_eq!(task.key.as_str(), document.key);
        assert_eq!(task.title, document.title);
        assert_eq!(task.dependencies.len(), document.dependencies.len());
        assert!(!task.is_external());
    }
}

#[test]
fn test_builtin_document_lookup() {
    assert_eq!(builtin_document("risk_register").unwrap().title, "Risk Register");
    assert!(builtin_document("gantt_chart").is_none());
}

// ===== Template Processor Tests =====

#[tokio::test]
async fn test_builtin_processor_produces_every_required_section() {
    let registry = ProcessorRegistry::with_builtin_processors(Arc::new(ModuleTable::new()));
    let catalog = TaskCatalog::builtin().unwrap();
    let task = catalog.get("risk_register").unwrap();
    let context = context();
    let upstream = HashMap::new();
    let generator = EchoSectionsGenerator::default();

    let binding = registry.resolve(&task.key).unwrap();
    let document = binding
        .processor
        .produce(ProcessorInput {
            task,
            context: &context,
            upstream: &upstream,
            generator: &generator,
        })
        .await
        .unwrap();

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert!(document.content.starts_with("# Risk Register\n"));
    assert!(document.content.contains("Project ID: PRJ-42"));
    assert!(document.content.contains("Project: Billing Revamp"));
    let standard = ComplianceStandard::pm_baseline();
    let required = &standard
        .requirements_for(&task.key)
        .sections;
    for section in required {
        assert!(
            document.content.contains(&format!("## {}", section)),
            "missing section {}",
            section
        );
    }
}
