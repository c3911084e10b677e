use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

use super::ids::TaskKey;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::PartiallyCompliant => "partially compliant",
            ComplianceStatus::NonCompliant => "non-compliant",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Structure,
    Terminology,
    Checklist,
    Content,
    Consistency,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueCategory::Structure => "structure",
            IssueCategory::Terminology => "terminology",
            IssueCategory::Checklist => "checklist",
            IssueCategory::Content => "content",
            IssueCategory::Consistency => "consistency",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceIssue {
    pub category: IssueCategory,
    pub severity: Severity,
    pub description: String,
    pub remediation: String,
    /// Documents the issue refers to; two entries for a consistency mismatch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<TaskKey>,
}

impl ComplianceIssue {
    pub fn new(
        category: IssueCategory,
        severity: Severity,
        description: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            description: description.into(),
            remediation: remediation.into(),
            documents: vec![],
        }
    }

    pub fn for_documents<I>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = TaskKey>,
    {
        self.documents = documents.into_iter().collect();
        self
    }
}

/// Component scores, each in 0..=100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub structure: f64,
    pub terminology: f64,
    pub checklist: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceScore {
    pub key: TaskKey,
    pub title: String,
    pub score: f64,
    pub status: ComplianceStatus,
    pub breakdown: ScoreBreakdown,
    pub issues: Vec<ComplianceIssue>,
}

impl ComplianceScore {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyReport {
    pub consistency_score: f64,
    pub compared_pairs: usize,
    pub issues: Vec<ComplianceIssue>,
}

impl Default for ConsistencyReport {
    fn default() -> Self {
        Self {
            consistency_score: 100.0,
            compared_pairs: 0,
            issues: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceReport {
    pub standard: String,
    pub documents: Vec<ComplianceScore>,
    pub overall_score: f64,
    pub consistency: ConsistencyReport,
    pub generated_at: DateTime<Utc>,
}

impl ComplianceReport {
    pub fn document(&self, key: &str) -> Option<&ComplianceScore> {
        self.documents.iter().find(|d| d.key.as_str() == key)
    }

    pub fn count_by_status(&self, status: ComplianceStatus) -> usize {
        self.documents.iter().filter(|d| d.status == status).count()
    }

    /// Human-readable rendering of the same data the JSON form carries.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Compliance report ({})", self.standard);
        let _ = writeln!(
            out,
            "Overall score: {:.1} | Consistency: {:.1} | Documents: {} ({} compliant, {} partial, {} non-compliant)",
            self.overall_score,
            self.consistency.consistency_score,
            self.documents.len(),
            self.count_by_status(ComplianceStatus::Compliant),
            self.count_by_status(ComplianceStatus::PartiallyCompliant),
            self.count_by_status(ComplianceStatus::NonCompliant),
        );

        for doc in &self.documents {
            let _ = writeln!(
                out,
                "- {} [{}]: {:.1} ({})",
                doc.title, doc.key, doc.score, doc.status
            );
            for issue in &doc.issues {
                let _ = writeln!(
                    out,
                    "    {} {}: {} -> {}",
                    issue.severity, issue.category, issue.description, issue.remediation
                );
            }
        }

        if !self.consistency.issues.is_empty() {
            let _ = writeln!(out, "Cross-document issues:");
            for issue in &self.consistency.issues {
                let _ = writeln!(
                    out,
                    "    {} {}: {} -> {}",
                    issue.severity, issue.category, issue.description, issue.remediation
                );
            }
        }

        out
    }
}
