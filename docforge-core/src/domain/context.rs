use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ids::TaskKey;
use super::result::Artifact;
use super::task::GenerationTask;
use crate::traits::ContentGenerator;

/// Shared, read-only description of the project every document is about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectContext {
    pub project_id: String,
    pub project_name: String,
    pub organization: Option<String>,
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProjectContext {
    pub fn new(project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            organization: None,
            stakeholders: vec![],
            metadata: HashMap::new(),
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_stakeholders<I, S>(mut self, stakeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stakeholders = stakeholders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A single call to the content-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub task_key: TaskKey,
    pub project_id: String,
    pub prompt: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Everything a processor sees when producing one document.
#[derive(Clone, Copy)]
pub struct ProcessorInput<'a> {
    pub task: &'a GenerationTask,
    pub context: &'a ProjectContext,
    /// Artifacts already produced by this task's dependencies. Dependencies
    /// that were filtered out of the run are absent.
    pub upstream: &'a HashMap<TaskKey, Artifact>,
    pub generator: &'a dyn ContentGenerator,
}

impl std::fmt::Debug for ProcessorInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorInput")
            .field("task", &self.task.key)
            .field("project_id", &self.context.project_id)
            .field("upstream", &self.upstream.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<'a> ProcessorInput<'a> {
    pub fn upstream_artifact(&self, key: &str) -> Option<&'a Artifact> {
        self.upstream.get(key)
    }

    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            task_key: self.task.key.clone(),
            project_id: self.context.project_id.clone(),
            prompt: prompt.into(),
            metadata: self.context.metadata.clone(),
        }
    }
}
