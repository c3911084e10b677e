use docforge_compliance::ComplianceCheck;
use docforge_core::{
    Artifact, ComplianceOutcome, ContentGenerator, GenerationRun, PersistenceSink,
    ProjectContext, Result, TaskKey,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::TaskCatalog;
use crate::executor::{ExecutionEngine, ExecutionPlan, TaskEvent};
use crate::options::GenerationOptions;
use crate::registry::ProcessorRegistry;

/// Entry point for document generation runs.
///
/// Owns the validated catalog and the execution engine; the processor
/// registry (and its resolution cache) lives as long as the orchestrator and
/// is shared by every run.
pub struct Orchestrator {
    catalog: TaskCatalog,
    engine: ExecutionEngine,
    compliance: Option<Arc<dyn ComplianceCheck>>,
}

impl Orchestrator {
    /// Binds the catalog's externally configured tasks into `registry`.
    pub fn new(
        catalog: TaskCatalog,
        mut registry: ProcessorRegistry,
        generator: Arc<dyn ContentGenerator>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        registry.configure_external(&catalog);
        Self {
            catalog,
            engine: ExecutionEngine::new(Arc::new(registry), generator, sink),
            compliance: None,
        }
    }

    pub fn with_compliance(mut self, check: Arc<dyn ComplianceCheck>) -> Self {
        self.compliance = Some(check);
        self
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        self.engine.registry()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.engine.subscribe()
    }

    /// The order `generate_all` would follow for these options.
    pub fn execution_order(&self, options: &GenerationOptions) -> Result<Vec<TaskKey>> {
        options.validated()?;
        let plan = ExecutionPlan::new(self.catalog.select(&options.category_filter()))?;
        Ok(plan.dag().execution_order().into_iter().cloned().collect())
    }

    pub async fn generate_all(
        &self,
        context: &ProjectContext,
        options: &GenerationOptions,
    ) -> Result<GenerationRun> {
        self.generate_all_with_cancellation(context, options, &CancellationToken::new())
            .await
    }

    pub async fn generate_all_with_cancellation(
        &self,
        context: &ProjectContext,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<GenerationRun> {
        options.validated()?;
        let plan = ExecutionPlan::new(self.catalog.select(&options.category_filter()))?;
        Ok(self.run_plan(&plan, context, options, cancel).await)
    }

    /// Generates exactly one document. Its dependencies are not generated;
    /// their artifacts are simply absent from the processor input.
    pub async fn generate_one(
        &self,
        context: &ProjectContext,
        key: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationRun> {
        options.validated()?;
        let plan = ExecutionPlan::new(self.catalog.subset([key])?)?;
        Ok(self
            .run_plan(&plan, context, options, &CancellationToken::new())
            .await)
    }

    async fn run_plan(
        &self,
        plan: &ExecutionPlan,
        context: &ProjectContext,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> GenerationRun {
        let mut run = self.engine.execute(plan, context, options, cancel).await;
        if options.run_compliance {
            run.compliance = self.assess(&run, context).await;
        }
        run
    }

    /// Runs the compliance check on the blocking pool; an error or a panic in
    /// the check degrades to `Unavailable` and never affects the run results.
    async fn assess(&self, run: &GenerationRun, context: &ProjectContext) -> ComplianceOutcome {
        let Some(check) = self.compliance.clone() else {
            return ComplianceOutcome::NotRequested;
        };

        let artifacts: Vec<Artifact> = run.produced_artifacts().cloned().collect();
        let context = context.clone();
        let assessed =
            tokio::task::spawn_blocking(move || check.assess(&artifacts, &context)).await;

        match assessed {
            Ok(Ok(report)) => {
                info!(run_id = %run.id, overall_score = report.overall_score, "Compliance report attached");
                ComplianceOutcome::Available { report }
            }
            Ok(Err(err)) => {
                warn!(run_id = %run.id, error = %err, "Compliance assessment unavailable");
                ComplianceOutcome::Unavailable {
                    reason: err.to_string(),
                }
            }
            Err(join_err) => {
                warn!(run_id = %run.id, error = %join_err, "Compliance check aborted");
                ComplianceOutcome::Unavailable {
                    reason: format!("compliance check aborted: {}", join_err),
                }
            }
        }
    }
}
