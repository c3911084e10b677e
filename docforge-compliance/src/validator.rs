use docforge_core::{Artifact, ComplianceReport, ProjectContext};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::consistency::ConsistencyChecker;
use crate::error::{ComplianceError, Result};
use crate::report::build_report;
use crate::scorer::{DocumentScorer, ScoringWeights, StatusThresholds};
use crate::standard::ComplianceStandard;

/// Post-generation assessment of a document set.
pub trait ComplianceCheck: Send + Sync {
    fn assess(&self, artifacts: &[Artifact], context: &ProjectContext) -> Result<ComplianceReport>;
}

/// Deserializable validator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceSettings {
    pub weights: ScoringWeights,
    pub thresholds: StatusThresholds,
    /// Replaces the built-in baseline when present.
    pub standard: Option<ComplianceStandard>,
}

#[derive(Debug, Clone)]
pub struct ComplianceValidator {
    standard: ComplianceStandard,
    scorer: DocumentScorer,
    consistency: ConsistencyChecker,
}

impl ComplianceValidator {
    pub fn new(standard: ComplianceStandard, scorer: DocumentScorer) -> Result<Self> {
        Ok(Self {
            standard,
            scorer,
            consistency: ConsistencyChecker::new()?,
        })
    }

    /// Baseline standard with default weights and thresholds.
    pub fn pm_baseline() -> Result<Self> {
        Self::new(ComplianceStandard::pm_baseline(), DocumentScorer::default())
    }

    pub fn from_settings(settings: &ComplianceSettings) -> Result<Self> {
        let standard = settings
            .standard
            .clone()
            .unwrap_or_else(ComplianceStandard::pm_baseline);
        let scorer = DocumentScorer::new(settings.weights, settings.thresholds)?;
        Self::new(standard, scorer)
    }

    pub fn standard(&self) -> &ComplianceStandard {
        &self.standard
    }

    #[instrument(skip_all, fields(documents = artifacts.len()))]
    pub fn validate(&self, artifacts: &[Artifact], context: &ProjectContext) -> Result<ComplianceReport> {
        if artifacts.is_empty() {
            return Err(ComplianceError::NoDocuments);
        }

        let documents = artifacts
            .iter()
            .map(|artifact| {
                self.scorer
                    .score(artifact, self.standard.requirements_for(&artifact.key))
            })
            .collect::<Result<Vec<_>>>()?;
        let consistency = self.consistency.check(artifacts, context)?;

        let report = build_report(&self.standard.name, documents, consistency);
        info!(
            overall_score = report.overall_score,
            consistency_score = report.consistency.consistency_score,
            "Compliance assessment complete"
        );
        Ok(report)
    }
}

impl ComplianceCheck for ComplianceValidator {
    fn assess(&self, artifacts: &[Artifact], context: &ProjectContext) -> Result<ComplianceReport> {
        self.validate(artifacts, context)
    }
}
