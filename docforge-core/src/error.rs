use std::time::Duration;
use thiserror::Error;

use crate::domain::{TaskError, TaskErrorKind, TaskKey};

// ===== Configuration =====

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigViolation {
    #[error("task key must not be empty")]
    EmptyKey,

    #[error("duplicate task key '{key}'")]
    DuplicateKey { key: String },

    #[error("task '{key}': entry must be an object")]
    NotAnObject { key: String },

    #[error("task '{key}': missing required field '{field}'")]
    MissingField { key: String, field: &'static str },

    #[error("task '{key}': field '{field}' must be {expected}")]
    InvalidType {
        key: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("task '{key}' depends on unknown task '{dependency}'")]
    UnknownDependency { key: String, dependency: String },

    #[error("task '{key}' depends on itself")]
    SelfDependency { key: String },

    #[error("external mapping must be a JSON object keyed by task")]
    MappingNotAnObject,

    #[error("external mapping is not valid JSON: {reason}")]
    Malformed { reason: String },
}

/// Every violation found while assembling a catalog, reported together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid task configuration {}", describe_violations(.violations))]
pub struct ConfigurationError {
    pub violations: Vec<ConfigViolation>,
}

impl ConfigurationError {
    pub fn new(violations: Vec<ConfigViolation>) -> Self {
        Self { violations }
    }
}

fn describe_violations(violations: &[ConfigViolation]) -> String {
    let listed = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("({} violation(s)): {}", violations.len(), listed)
}

// ===== Run-fatal errors =====

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("dependency cycle detected among tasks: {}", join_keys(.keys))]
    CycleDetected { keys: Vec<TaskKey> },

    #[error("unknown task: {0}")]
    UnknownTask(TaskKey),

    #[error("invalid generation options: {0}")]
    InvalidOptions(String),
}

fn join_keys(keys: &[TaskKey]) -> String {
    keys.iter().map(TaskKey::as_str).collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

// ===== Task-scoped errors =====

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("no processor registered for task '{0}'")]
    NotFound(TaskKey),

    #[error("failed to load processor for task '{key}' from {location}::{symbol}: {reason}")]
    Load {
        key: TaskKey,
        location: String,
        symbol: String,
        reason: String,
    },

    #[error("processor factory for task '{key}' failed: {reason}")]
    Instantiation { key: TaskKey, reason: String },
}

impl ProcessorError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            ProcessorError::NotFound(_) => TaskErrorKind::ProcessorNotFound,
            ProcessorError::Load { .. } => TaskErrorKind::ProcessorLoad,
            ProcessorError::Instantiation { .. } => TaskErrorKind::ProcessorInstantiation,
        }
    }
}

impl From<&ProcessorError> for TaskError {
    fn from(err: &ProcessorError) -> Self {
        TaskError::new(err.kind(), err.to_string())
    }
}

/// Failure reported by a processor or the content-generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("transient content generation failure: {0}")]
    Transient(String),

    #[error("permanent content generation failure: {0}")]
    Permanent(String),

    #[error("content generation timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    pub fn transient(message: impl Into<String>) -> Self {
        GenerationError::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        GenerationError::Permanent(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Transient(_) | GenerationError::Timeout(_))
    }
}

impl From<&GenerationError> for TaskError {
    fn from(err: &GenerationError) -> Self {
        let kind = match err {
            GenerationError::Timeout(_) => TaskErrorKind::Timeout,
            _ => TaskErrorKind::ContentGeneration,
        };
        TaskError::new(kind, err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to persist document '{key}': {message}")]
pub struct PersistenceError {
    pub key: TaskKey,
    pub message: String,
}

impl PersistenceError {
    pub fn new(key: TaskKey, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl From<&PersistenceError> for TaskError {
    fn from(err: &PersistenceError) -> Self {
        TaskError::new(TaskErrorKind::Persistence, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_lists_every_violation() {
        let err = ConfigurationError::new(vec![
            ConfigViolation::DuplicateKey {
                key: "risk_register".to_string(),
            },
            ConfigViolation::MissingField {
                key: "custom".to_string(),
                field: "symbol",
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("2 violation(s)"));
        assert!(message.contains("duplicate task key 'risk_register'"));
        assert!(message.contains("missing required field 'symbol'"));
    }

    #[test]
    fn test_only_transient_and_timeout_are_retryable() {
        assert!(GenerationError::transient("rate limited").is_retryable());
        assert!(GenerationError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!GenerationError::permanent("bad prompt").is_retryable());
    }

    #[test]
    fn test_cycle_error_names_participants() {
        let err = OrchestratorError::CycleDetected {
            keys: vec![TaskKey::new("a"), TaskKey::new("b")],
        };
        assert_eq!(err.to_string(), "dependency cycle detected among tasks: a, b");
    }
}
