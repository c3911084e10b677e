use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::compliance::ComplianceReport;
use super::ids::{RunId, TaskKey};

// ===== Artifacts =====

/// Title and body produced for one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub key: TaskKey,
    pub title: String,
    pub content: String,
}

impl Artifact {
    pub fn from_document(key: TaskKey, document: Document) -> Self {
        Self {
            key,
            title: document.title,
            content: document.content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRef {
    pub key: TaskKey,
    pub title: String,
}

// ===== Task Status =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_successful(&self) -> bool {
        matches!(self, TaskStatus::Succeeded)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    ProcessorNotFound,
    ProcessorLoad,
    ProcessorInstantiation,
    ContentGeneration,
    Timeout,
    Persistence,
    DependencyFailed,
    Halted,
    Cancelled,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskErrorKind::ProcessorNotFound => "processor_not_found",
            TaskErrorKind::ProcessorLoad => "processor_load",
            TaskErrorKind::ProcessorInstantiation => "processor_instantiation",
            TaskErrorKind::ContentGeneration => "content_generation",
            TaskErrorKind::Timeout => "timeout",
            TaskErrorKind::Persistence => "persistence",
            TaskErrorKind::DependencyFailed => "dependency_failed",
            TaskErrorKind::Halted => "halted",
            TaskErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

// ===== Task Result =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskResult {
    pub key: TaskKey,
    pub status: TaskStatus,
    pub artifact: Option<Artifact>,
    pub error: Option<TaskError>,
    pub attempts: u32,
    pub duration_ms: u64,
}

impl TaskResult {
    pub fn succeeded(artifact: Artifact, attempts: u32, duration_ms: u64) -> Self {
        Self {
            key: artifact.key.clone(),
            status: TaskStatus::Succeeded,
            artifact: Some(artifact),
            error: None,
            attempts,
            duration_ms,
        }
    }

    pub fn failed(key: TaskKey, error: TaskError, attempts: u32, duration_ms: u64) -> Self {
        Self {
            key,
            status: TaskStatus::Failed,
            artifact: None,
            error: Some(error),
            attempts,
            duration_ms,
        }
    }

    pub fn skipped(key: TaskKey, error: TaskError) -> Self {
        Self {
            key,
            status: TaskStatus::Skipped,
            artifact: None,
            error: Some(error),
            attempts: 0,
            duration_ms: 0,
        }
    }
}

// ===== Compliance Outcome =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ComplianceOutcome {
    NotRequested,
    Available { report: ComplianceReport },
    Unavailable { reason: String },
}

impl ComplianceOutcome {
    pub fn report(&self) -> Option<&ComplianceReport> {
        match self {
            ComplianceOutcome::Available { report } => Some(report),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ComplianceOutcome::Unavailable { .. })
    }
}

impl Default for ComplianceOutcome {
    fn default() -> Self {
        ComplianceOutcome::NotRequested
    }
}

// ===== Generation Run =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRun {
    pub id: RunId,
    /// Per-task results in the order the tasks reached a terminal state.
    pub results: Vec<TaskResult>,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub total_duration_ms: u64,
    pub artifacts: Vec<ArtifactRef>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub cancelled: bool,
    pub compliance: ComplianceOutcome,
}

impl GenerationRun {
    pub fn new(
        id: RunId,
        results: Vec<TaskResult>,
        started_at: DateTime<Utc>,
        total_duration_ms: u64,
        cancelled: bool,
    ) -> Self {
        let count = |status: TaskStatus| results.iter().filter(|r| r.status == status).count();
        let succeeded_count = count(TaskStatus::Succeeded);
        let failed_count = count(TaskStatus::Failed);
        let skipped_count = count(TaskStatus::Skipped);

        let artifacts = results
            .iter()
            .filter_map(|r| r.artifact.as_ref())
            .map(|a| ArtifactRef {
                key: a.key.clone(),
                title: a.title.clone(),
            })
            .collect();

        Self {
            id,
            results,
            succeeded_count,
            failed_count,
            skipped_count,
            total_duration_ms,
            artifacts,
            started_at,
            completed_at: Utc::now(),
            cancelled,
            compliance: ComplianceOutcome::NotRequested,
        }
    }

    pub fn result(&self, key: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.key.as_str() == key)
    }

    pub fn status_of(&self, key: &str) -> Option<TaskStatus> {
        self.result(key).map(|r| r.status)
    }

    /// Every failed or skipped task with its error, in result order.
    pub fn errors(&self) -> Vec<(&TaskKey, &TaskError)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (&r.key, e)))
            .collect()
    }

    pub fn produced_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.results.iter().filter_map(|r| r.artifact.as_ref())
    }

    pub fn total_tasks(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete_success(&self) -> bool {
        !self.cancelled && self.failed_count == 0 && self.skipped_count == 0
    }
}
