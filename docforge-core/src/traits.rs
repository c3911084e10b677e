use async_trait::async_trait;

use crate::domain::{Artifact, Document, GenerationRequest, ProcessorInput, TaskKey};
use crate::error::{GenerationError, PersistenceError};

/// Language-model backend that turns a prompt into text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Destination for successfully produced documents.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(&self, key: &TaskKey, artifact: &Artifact) -> Result<(), PersistenceError>;
}

/// Content-producing unit for a single task key.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn produce<'a>(&self, input: ProcessorInput<'a>) -> Result<Document, GenerationError>;
}
