//! Built-in document set and the processors that produce it.

pub mod template;

pub use template::*;

use docforge_compliance::ComplianceStandard;
use docforge_core::{DocumentCategory, GenerationTask, Priority, Processor, TaskKey};
use std::sync::Arc;

use crate::registry::ProcessorRegistry;

/// Static definition of one built-in document type.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinDocument {
    pub key: &'static str,
    pub title: &'static str,
    pub category: BuiltinCategory,
    pub priority: Option<u32>,
    pub dependencies: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCategory {
    Initiation,
    Planning,
    Monitoring,
    Closure,
}

impl From<BuiltinCategory> for DocumentCategory {
    fn from(category: BuiltinCategory) -> Self {
        match category {
            BuiltinCategory::Initiation => DocumentCategory::Initiation,
            BuiltinCategory::Planning => DocumentCategory::Planning,
            BuiltinCategory::Monitoring => DocumentCategory::Monitoring,
            BuiltinCategory::Closure => DocumentCategory::Closure,
        }
    }
}

impl BuiltinDocument {
    pub fn to_task(&self) -> GenerationTask {
        GenerationTask {
            key: TaskKey::new(self.key),
            title: self.title.to_string(),
            category: self.category.into(),
            priority: self.priority.map(Priority::new).unwrap_or_default(),
            dependencies: self.dependencies.iter().map(|d| TaskKey::new(*d)).collect(),
            processor: None,
        }
    }
}

pub const BUILTIN_DOCUMENTS: &[BuiltinDocument] = &[
    BuiltinDocument {
        key: "business_case",
        title: "Business Case",
        category: BuiltinCategory::Initiation,
        priority: Some(1),
        dependencies: &[],
    },
    BuiltinDocument {
        key: "project_charter",
        title: "Project Charter",
        category: BuiltinCategory::Initiation,
        priority: Some(1),
        dependencies: &[],
    },
    BuiltinDocument {
        key: "stakeholder_register",
        title: "Stakeholder Register",
        category: BuiltinCategory::Initiation,
        priority: Some(2),
        dependencies: &["project_charter"],
    },
    BuiltinDocument {
        key: "scope_statement",
        title: "Scope Statement",
        category: BuiltinCategory::Planning,
        priority: Some(10),
        dependencies: &["project_charter"],
    },
    BuiltinDocument {
        key: "work_breakdown_structure",
        title: "Work Breakdown Structure",
        category: BuiltinCategory::Planning,
        priority: Some(11),
        dependencies: &["scope_statement"],
    },
    BuiltinDocument {
        key: "project_schedule",
        title: "Project Schedule",
        category: BuiltinCategory::Planning,
        priority: Some(12),
        dependencies: &["work_breakdown_structure"],
    },
    BuiltinDocument {
        key: "cost_baseline",
        title: "Cost Baseline",
        category: BuiltinCategory::Planning,
        priority: Some(13),
        dependencies: &["work_breakdown_structure"],
    },
    BuiltinDocument {
        key: "risk_register",
        title: "Risk Register",
        category: BuiltinCategory::Planning,
        priority: Some(14),
        dependencies: &["scope_statement", "stakeholder_register"],
    },
    BuiltinDocument {
        key: "quality_management_plan",
        title: "Quality Management Plan",
        category: BuiltinCategory::Planning,
        priority: Some(20),
        dependencies: &["scope_statement"],
    },
    BuiltinDocument {
        key: "communications_plan",
        title: "Communications Plan",
        category: BuiltinCategory::Planning,
        priority: Some(20),
        dependencies: &["stakeholder_register"],
    },
    BuiltinDocument {
        key: "procurement_plan",
        title: "Procurement Plan",
        category: BuiltinCategory::Planning,
        priority: None,
        dependencies: &["cost_baseline"],
    },
    BuiltinDocument {
        key: "status_report",
        title: "Status Report",
        category: BuiltinCategory::Monitoring,
        priority: Some(30),
        dependencies: &["project_schedule", "cost_baseline", "risk_register"],
    },
    BuiltinDocument {
        key: "change_log",
        title: "Change Log",
        category: BuiltinCategory::Monitoring,
        priority: Some(31),
        dependencies: &["scope_statement"],
    },
    BuiltinDocument {
        key: "lessons_learned",
        title: "Lessons Learned",
        category: BuiltinCategory::Closure,
        priority: None,
        dependencies: &["status_report"],
    },
    BuiltinDocument {
        key: "closure_report",
        title: "Closure Report",
        category: BuiltinCategory::Closure,
        priority: Some(40),
        dependencies: &["status_report", "lessons_learned"],
    },
];

pub fn builtin_tasks() -> Vec<GenerationTask> {
    BUILTIN_DOCUMENTS.iter().map(BuiltinDocument::to_task).collect()
}

pub fn builtin_document(key: &str) -> Option<&'static BuiltinDocument> {
    BUILTIN_DOCUMENTS.iter().find(|doc| doc.key == key)
}

/// Registers a [`TemplateProcessor`] constructor for every built-in document.
///
/// Each processor asks for exactly the sections the PM baseline requires of
/// its document.
pub fn register_builtin_processors(registry: &mut ProcessorRegistry) {
    let standard = ComplianceStandard::pm_baseline();
    for document in BUILTIN_DOCUMENTS {
        let sections = standard
            .requirements_for(&TaskKey::new(document.key))
            .sections
            .clone();
        registry.register_builtin(document.key, move || {
            Ok(Arc::new(TemplateProcessor::new(sections.clone())) as Arc<dyn Processor>)
        });
    }
}
