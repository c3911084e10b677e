use docforge_core::{
    Artifact, ComplianceIssue, ConsistencyReport, IssueCategory, ProjectContext, Severity, TaskKey,
};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::Result;
use crate::scorer::mentions;

/// Recurring entities extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Mentions {
    project_id: Option<String>,
    project_name: Option<String>,
    stakeholders: BTreeSet<String>,
}

/// Compares recurring entities across the produced document set.
///
/// Each pair of documents that both state a project identifier or project
/// name is compared; a pair is consistent when every entity both state
/// agrees. Stakeholder coverage is reported as issues only.
#[derive(Debug, Clone)]
pub struct ConsistencyChecker {
    project_id: Regex,
    project_name: Regex,
}

impl ConsistencyChecker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            project_id: Regex::new(r"(?im)^\W*project\s+id\W*:\s*\**\s*([A-Za-z0-9][A-Za-z0-9._/-]*)")?,
            project_name: Regex::new(r"(?im)^\W*project(?:\s+name)?\W*:\s*\**\s*(.+?)\s*\**\s*$")?,
        })
    }

    pub fn check(&self, artifacts: &[Artifact], context: &ProjectContext) -> Result<ConsistencyReport> {
        let extracted = artifacts
            .iter()
            .map(|artifact| self.extract(artifact, context))
            .collect::<Result<Vec<_>>>()?;

        let mut issues = Vec::new();
        let mut compared_pairs = 0usize;
        let mut consistent_pairs = 0usize;

        for (i, left) in extracted.iter().enumerate() {
            for (j, right) in extracted.iter().enumerate().skip(i + 1) {
                let (a, b) = (&artifacts[i].key, &artifacts[j].key);
                let mut compared = false;
                let mut consistent = true;

                if let (Some(x), Some(y)) = (&left.project_id, &right.project_id) {
                    compared = true;
                    if x != y {
                        consistent = false;
                        issues.push(
                            ComplianceIssue::new(
                                IssueCategory::Consistency,
                                Severity::High,
                                format!("project ID '{}' in {} differs from '{}' in {}", x, a, y, b),
                                format!("Use project ID '{}' in every document", context.project_id),
                            )
                            .for_documents([a.clone(), b.clone()]),
                        );
                    }
                }

                if let (Some(x), Some(y)) = (&left.project_name, &right.project_name) {
                    compared = true;
                    if !x.eq_ignore_ascii_case(y) {
                        consistent = false;
                        issues.push(
                            ComplianceIssue::new(
                                IssueCategory::Consistency,
                                Severity::Medium,
                                format!("project name '{}' in {} differs from '{}' in {}", x, a, y, b),
                                format!("Refer to the project as '{}' throughout", context.project_name),
                            )
                            .for_documents([a.clone(), b.clone()]),
                        );
                    }
                }

                if compared {
                    compared_pairs += 1;
                    if consistent {
                        consistent_pairs += 1;
                    }
                }
            }
        }

        issues.extend(stakeholder_gaps(artifacts, &extracted));

        let consistency_score = if compared_pairs == 0 {
            100.0
        } else {
            (10_000.0 * consistent_pairs as f64 / compared_pairs as f64).round() / 100.0
        };
        debug!(compared_pairs, consistent_pairs, issues = issues.len(), "Consistency check complete");

        Ok(ConsistencyReport {
            consistency_score,
            compared_pairs,
            issues,
        })
    }

    fn extract(&self, artifact: &Artifact, context: &ProjectContext) -> Result<Mentions> {
        let capture = |pattern: &Regex| {
            pattern
                .captures(&artifact.content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut stakeholders = BTreeSet::new();
        for name in &context.stakeholders {
            if !name.trim().is_empty() && mentions(&artifact.content, name)? {
                stakeholders.insert(name.clone());
            }
        }

        Ok(Mentions {
            project_id: capture(&self.project_id),
            project_name: capture(&self.project_name),
            stakeholders,
        })
    }
}

/// A stakeholder named in some documents but absent from another document
/// that names stakeholders.
fn stakeholder_gaps(artifacts: &[Artifact], extracted: &[Mentions]) -> Vec<ComplianceIssue> {
    let named: BTreeSet<&String> = extracted.iter().flat_map(|m| m.stakeholders.iter()).collect();

    named
        .into_iter()
        .filter_map(|stakeholder| {
            let missing: Vec<TaskKey> = extracted
                .iter()
                .zip(artifacts)
                .filter(|(m, _)| !m.stakeholders.is_empty() && !m.stakeholders.contains(stakeholder))
                .map(|(_, artifact)| artifact.key.clone())
                .collect();
            if missing.is_empty() {
                return None;
            }
            let listed = missing.iter().map(TaskKey::as_str).collect::<Vec<_>>().join(", ");
            Some(
                ComplianceIssue::new(
                    IssueCategory::Consistency,
                    Severity::Medium,
                    format!("stakeholder '{}' is not named in {}", stakeholder, listed),
                    format!("Reference '{}' wherever stakeholders are listed", stakeholder),
                )
                .for_documents(missing),
            )
        })
        .collect()
}
