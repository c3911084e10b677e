use chrono::Utc;
use docforge_core::{ComplianceReport, ComplianceScore, ConsistencyReport};

use crate::error::Result;

/// Assembles per-document scores and the consistency result into a report.
pub fn build_report(
    standard: &str,
    documents: Vec<ComplianceScore>,
    consistency: ConsistencyReport,
) -> ComplianceReport {
    let overall_score = if documents.is_empty() {
        0.0
    } else {
        let total: f64 = documents.iter().map(|d| d.score).sum();
        (total / documents.len() as f64 * 100.0).round() / 100.0
    };

    ComplianceReport {
        standard: standard.to_string(),
        documents,
        overall_score,
        consistency,
        generated_at: Utc::now(),
    }
}

/// Machine-readable form of the report.
pub fn to_json(report: &ComplianceReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn from_json(raw: &str) -> Result<ComplianceReport> {
    Ok(serde_json::from_str(raw)?)
}
