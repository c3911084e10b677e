use docforge_core::{
    Artifact, ComplianceIssue, ComplianceScore, ComplianceStatus, IssueCategory, ScoreBreakdown,
    Severity,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, Result};
use crate::standard::DocumentRequirements;

/// Structural coverage below this fraction caps the score under the
/// partial-compliance threshold.
const STRUCTURE_FLOOR: f64 = 0.5;

/// Relative weight of each scoring component.
///
/// Defaults: structure 0.5, terminology 0.2, checklist 0.3.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub structure: f64,
    pub terminology: f64,
    pub checklist: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            structure: 0.5,
            terminology: 0.2,
            checklist: 0.3,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let parts = [self.structure, self.terminology, self.checklist];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ComplianceError::InvalidWeights(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(ComplianceError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn total(&self) -> f64 {
        self.structure + self.terminology + self.checklist
    }
}

/// Score boundaries between compliance statuses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub compliant: f64,
    pub partial: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            compliant: 95.0,
            partial: 70.0,
        }
    }
}

impl StatusThresholds {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.compliant) || !in_range(self.partial) || self.partial > self.compliant {
            return Err(ComplianceError::InvalidThresholds(format!(
                "expected 0 <= partial ({}) <= compliant ({}) <= 100",
                self.partial, self.compliant
            )));
        }
        Ok(())
    }

    pub fn status_for(&self, score: f64) -> ComplianceStatus {
        if score >= self.compliant {
            ComplianceStatus::Compliant
        } else if score >= self.partial {
            ComplianceStatus::PartiallyCompliant
        } else {
            ComplianceStatus::NonCompliant
        }
    }
}

/// Scores one document against its requirements.
#[derive(Debug, Clone, Default)]
pub struct DocumentScorer {
    weights: ScoringWeights,
    thresholds: StatusThresholds,
}

impl DocumentScorer {
    pub fn new(weights: ScoringWeights, thresholds: StatusThresholds) -> Result<Self> {
        weights.validate()?;
        thresholds.validate()?;
        Ok(Self {
            weights,
            thresholds,
        })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &StatusThresholds {
        &self.thresholds
    }

    pub fn score(&self, artifact: &Artifact, requirements: &DocumentRequirements) -> Result<ComplianceScore> {
        if artifact.content.trim().is_empty() {
            return Ok(ComplianceScore {
                key: artifact.key.clone(),
                title: artifact.title.clone(),
                score: 0.0,
                status: ComplianceStatus::NonCompliant,
                breakdown: ScoreBreakdown::default(),
                issues: vec![ComplianceIssue::new(
                    IssueCategory::Content,
                    Severity::Critical,
                    "document is empty",
                    "Regenerate the document",
                )],
            });
        }

        let mut issues = Vec::new();
        let headings = headings(&artifact.content);

        let structure = coverage(&requirements.sections, |section| {
            let present = headings.iter().any(|h| names_section(h, section));
            if !present {
                issues.push(ComplianceIssue::new(
                    IssueCategory::Structure,
                    Severity::High,
                    format!("missing required section '{}'", section),
                    format!("Add a '## {}' section", section),
                ));
            }
            Ok(present)
        })?;

        let terminology = coverage(&requirements.terminology, |term| {
            let present = mentions(&artifact.content, term)?;
            if !present {
                issues.push(ComplianceIssue::new(
                    IssueCategory::Terminology,
                    Severity::Low,
                    format!("expected term '{}' is not used", term),
                    format!("Use the standard term '{}' where it applies", term),
                ));
            }
            Ok(present)
        })?;

        let checklist = coverage(&requirements.checklist, |element| {
            let present = mentions(&artifact.content, element)?;
            if !present {
                issues.push(ComplianceIssue::new(
                    IssueCategory::Checklist,
                    Severity::Medium,
                    format!("checklist element '{}' is missing", element),
                    format!("State the {} explicitly", element),
                ));
            }
            Ok(present)
        })?;

        let weighted = self.weights.structure * structure
            + self.weights.terminology * terminology
            + self.weights.checklist * checklist;
        let mut score = round2(100.0 * weighted / self.weights.total());
        if structure < STRUCTURE_FLOOR {
            score = score.min((self.thresholds.partial - 1.0).max(0.0));
        }

        Ok(ComplianceScore {
            key: artifact.key.clone(),
            title: artifact.title.clone(),
            score,
            status: self.thresholds.status_for(score),
            breakdown: ScoreBreakdown {
                structure: round2(structure * 100.0),
                terminology: round2(terminology * 100.0),
                checklist: round2(checklist * 100.0),
            },
            issues,
        })
    }
}

/// Fraction of `required` items for which `present` holds; 1.0 when nothing
/// is required.
fn coverage<F>(required: &[String], mut present: F) -> Result<f64>
where
    F: FnMut(&str) -> Result<bool>,
{
    if required.is_empty() {
        return Ok(1.0);
    }
    let mut found = 0usize;
    for item in required {
        if present(item)? {
            found += 1;
        }
    }
    Ok(found as f64 / required.len() as f64)
}

/// Lower-cased text of every Markdown ATX heading.
pub(crate) fn headings(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let level = line.chars().take_while(|&c| c == '#').count();
            if level == 0 || level > 6 {
                return None;
            }
            let rest = &line[level..];
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return None;
            }
            Some(rest.trim().trim_end_matches('#').trim().to_lowercase())
        })
        .collect()
}

/// Whether a lower-cased heading introduces `section`: after any leading
/// numbering, the heading must begin with the section name as whole words.
fn names_section(heading: &str, section: &str) -> bool {
    let needle = section.trim().to_lowercase();
    let text = heading
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' || c.is_whitespace());
    match text.strip_prefix(needle.as_str()) {
        Some(rest) => !rest.starts_with(char::is_alphanumeric),
        None => false,
    }
}

/// Case-insensitive whole-word match.
pub(crate) fn mentions(content: &str, phrase: &str) -> Result<bool> {
    let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase.trim())))?;
    Ok(pattern.is_match(content))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
