use config::{Config as ConfigLoader, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use docforge_compliance::{ComplianceError, ComplianceSettings, ComplianceValidator};
use docforge_core::{ConfigurationError, OrchestratorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::catalog::{ExternalMapping, TaskCatalog};
use crate::options::GenerationOptions;

const ENV_PREFIX: &str = "DOCFORGE";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] OrchestratorError),

    #[error(transparent)]
    Catalog(#[from] ConfigurationError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),
}

/// Process-level settings: run defaults, compliance scoring and the location
/// of the external task mapping.
///
/// Sources, later ones overriding earlier: `config/default`, `config/local`
/// (any format the `config` crate understands, both optional), then
/// environment variables such as `DOCFORGE_GENERATION__MAX_CONCURRENCY=8`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub generation: GenerationOptions,
    pub compliance: ComplianceSettings,
    pub external_tasks_path: Option<PathBuf>,
}

impl OrchestratorSettings {
    pub fn load() -> Result<Self, SettingsError> {
        Self::from_builder(
            ConfigLoader::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false)),
        )
    }

    /// Loads `path` (required) with environment overrides on top.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::from_builder(ConfigLoader::builder().add_source(File::from(path.as_ref())))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.generation.validated()?;
        info!(
            max_concurrency = settings.generation.max_concurrency,
            external_tasks = ?settings.external_tasks_path,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Built-in tasks merged with the external mapping, when one is configured.
    pub fn catalog(&self) -> Result<TaskCatalog, SettingsError> {
        let mut builder = TaskCatalog::builder().with_builtin();
        if let Some(path) = &self.external_tasks_path {
            builder = builder.external(&ExternalMapping::from_path(path)?);
        }
        Ok(builder.build()?)
    }

    pub fn compliance_validator(&self) -> Result<ComplianceValidator, SettingsError> {
        Ok(ComplianceValidator::from_settings(&self.compliance)?)
    }
}
