use docforge_core::TaskKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a single document type must contain to be compliant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentRequirements {
    /// Headings that must be present.
    pub sections: Vec<String>,
    /// Vocabulary the document is expected to use.
    pub terminology: Vec<String>,
    /// Fields or elements the document must mention.
    pub checklist: Vec<String>,
}

impl DocumentRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    pub fn terminology<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminology = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn checklist<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checklist = elements.into_iter().map(Into::into).collect();
        self
    }
}

/// Named set of per-document requirements with a generic fallback for
/// document types the standard does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStandard {
    pub name: String,
    #[serde(default)]
    pub documents: HashMap<TaskKey, DocumentRequirements>,
    #[serde(default = "default_fallback")]
    pub fallback: DocumentRequirements,
}

fn default_fallback() -> DocumentRequirements {
    DocumentRequirements::new().sections(["Overview"])
}

impl ComplianceStandard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: HashMap::new(),
            fallback: default_fallback(),
        }
    }

    pub fn with_document(mut self, key: impl Into<TaskKey>, requirements: DocumentRequirements) -> Self {
        self.documents.insert(key.into(), requirements);
        self
    }

    pub fn with_fallback(mut self, fallback: DocumentRequirements) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn requirements_for(&self, key: &TaskKey) -> &DocumentRequirements {
        self.documents.get(key).unwrap_or(&self.fallback)
    }

    pub fn covers(&self, key: &TaskKey) -> bool {
        self.documents.contains_key(key)
    }

    /// Project-management baseline covering the built-in document set.
    pub fn pm_baseline() -> Self {
        PM_BASELINE.iter().fold(
            Self::new("PM baseline"),
            |standard, (key, sections, terms, checklist)| {
                standard.with_document(
                    *key,
                    DocumentRequirements::new()
                        .sections(sections.iter().copied())
                        .terminology(terms.iter().copied())
                        .checklist(checklist.iter().copied()),
                )
            },
        )
    }
}

impl Default for ComplianceStandard {
    fn default() -> Self {
        Self::pm_baseline()
    }
}

type Row = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

// key, sections, terminology, checklist
const PM_BASELINE: &[Row] = &[
    (
        "business_case",
        &["Overview", "Problem Statement", "Options", "Benefits", "Costs", "Recommendation"],
        &["business need", "return on investment", "sponsor"],
        &["Project ID", "Project"],
    ),
    (
        "project_charter",
        &["Overview", "Objectives", "Scope", "Stakeholders", "Milestones", "Budget", "Approval"],
        &["project sponsor", "project manager", "success criteria"],
        &["Project ID", "Project", "Sponsor"],
    ),
    (
        "stakeholder_register",
        &["Overview", "Stakeholders", "Roles", "Engagement Strategy"],
        &["influence", "interest", "engagement"],
        &["Project ID", "Project"],
    ),
    (
        "scope_statement",
        &["Overview", "Deliverables", "Exclusions", "Acceptance Criteria", "Assumptions", "Constraints"],
        &["deliverable", "acceptance criteria", "out of scope"],
        &["Project ID", "Project"],
    ),
    (
        "work_breakdown_structure",
        &["Overview", "Work Packages", "WBS Dictionary"],
        &["work package", "deliverable", "decomposition"],
        &["Project ID", "Project"],
    ),
    (
        "project_schedule",
        &["Overview", "Milestones", "Activities", "Critical Path"],
        &["milestone", "critical path", "duration"],
        &["Project ID", "Project"],
    ),
    (
        "cost_baseline",
        &["Overview", "Cost Estimates", "Contingency Reserve", "Funding Requirements"],
        &["cost baseline", "contingency", "estimate"],
        &["Project ID", "Project"],
    ),
    (
        "risk_register",
        &["Overview", "Identified Risks", "Risk Owners", "Response Strategies"],
        &["probability", "impact", "mitigation"],
        &["Project ID", "Project", "Risk Owner"],
    ),
    (
        "quality_management_plan",
        &["Overview", "Quality Standards", "Quality Assurance", "Quality Control"],
        &["quality assurance", "quality control", "metric"],
        &["Project ID", "Project"],
    ),
    (
        "communications_plan",
        &["Overview", "Stakeholders", "Communication Channels", "Frequency"],
        &["audience", "channel", "frequency"],
        &["Project ID", "Project"],
    ),
    (
        "procurement_plan",
        &["Overview", "Procurement Items", "Contract Types", "Vendor Selection"],
        &["vendor", "contract", "procurement"],
        &["Project ID", "Project"],
    ),
    (
        "status_report",
        &["Overview", "Progress", "Schedule Variance", "Cost Variance", "Issues"],
        &["variance", "progress", "forecast"],
        &["Project ID", "Project", "Reporting Period"],
    ),
    (
        "change_log",
        &["Overview", "Change Requests", "Decisions"],
        &["change request", "approval", "impact"],
        &["Project ID", "Project"],
    ),
    (
        "lessons_learned",
        &["Overview", "What Went Well", "What Could Improve", "Recommendations"],
        &["lesson", "recommendation", "root cause"],
        &["Project ID", "Project"],
    ),
    (
        "closure_report",
        &["Overview", "Deliverables", "Final Budget", "Sign-off"],
        &["acceptance", "handover", "final"],
        &["Project ID", "Project", "Sign-off"],
    ),
];
