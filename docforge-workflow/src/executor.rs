//! Batch-parallel execution of a scheduled task set.
//!
//! The engine repeatedly derives the live ready set from the dependency
//! graph, runs up to `max_concurrency` ready tasks concurrently, waits for
//! the whole batch, and records each result before deriving the next batch.

use chrono::Utc;
use docforge_core::{
    Artifact, ContentGenerator, GenerationError, GenerationRun, GenerationTask,
    OrchestratorError, PersistenceError, PersistenceSink, Processor, ProcessorInput,
    ProjectContext, RunId, TaskError, TaskErrorKind, TaskKey, TaskResult, TaskStatus,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::catalog::TaskCatalog;
use crate::dag::TaskDAG;
use crate::options::GenerationOptions;
use crate::rate_limit::RateLimitedGenerator;
use crate::registry::ProcessorRegistry;
use crate::retry::{retry_with, ExponentialBackoff};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle notification for one task of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub run_id: RunId,
    pub key: TaskKey,
    pub stage: TaskStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    Started,
    Succeeded,
    Failed,
    Skipped,
}

impl From<TaskStatus> for TaskStage {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Succeeded => TaskStage::Succeeded,
            TaskStatus::Failed => TaskStage::Failed,
            TaskStatus::Skipped => TaskStage::Skipped,
        }
    }
}

/// A validated catalog together with its dependency graph.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    catalog: TaskCatalog,
    dag: TaskDAG,
}

impl ExecutionPlan {
    pub fn new(catalog: TaskCatalog) -> Result<Self, OrchestratorError> {
        let dag = TaskDAG::from_catalog(&catalog)?;
        Ok(Self { catalog, dag })
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn dag(&self) -> &TaskDAG {
        &self.dag
    }
}

/// Per-run state shared read-only by every task of a batch.
struct RunScope<'a> {
    run_id: RunId,
    context: &'a ProjectContext,
    artifacts: &'a HashMap<TaskKey, Artifact>,
    generator: &'a dyn ContentGenerator,
    retry: &'a ExponentialBackoff,
    persistence: &'a ExponentialBackoff,
    cancel: &'a CancellationToken,
}

pub struct ExecutionEngine {
    registry: Arc<ProcessorRegistry>,
    generator: Arc<dyn ContentGenerator>,
    sink: Arc<dyn PersistenceSink>,
    events: broadcast::Sender<TaskEvent>,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<ProcessorRegistry>,
        generator: Arc<dyn ContentGenerator>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            registry,
            generator,
            sink,
            events,
        }
    }

    /// Receives task lifecycle events for every subsequent run.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    fn emit(&self, run_id: RunId, key: &TaskKey, stage: TaskStage) {
        // No receivers is fine.
        let _ = self.events.send(TaskEvent {
            run_id,
            key: key.clone(),
            stage,
        });
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        context: &ProjectContext,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> GenerationRun {
        let run_id = RunId::new();
        let span = info_span!("generation_run", %run_id, tasks = plan.dag().len());
        self.execute_run(run_id, plan, context, options, cancel)
            .instrument(span)
            .await
    }

    async fn execute_run(
        &self,
        run_id: RunId,
        plan: &ExecutionPlan,
        context: &ProjectContext,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> GenerationRun {
        let started_at = Utc::now();
        let clock = Instant::now();
        let dag = plan.dag();
        let catalog = plan.catalog();

        let generator: Arc<dyn ContentGenerator> = Arc::new(
            RateLimitedGenerator::new(self.generator.clone(), options.inter_call_delay())
                .with_call_timeout(options.task_timeout()),
        );
        let retry = options.retry_policy();
        let persistence = options.persistence_policy();
        let batch_size = options.max_concurrency.max(1);

        info!(
            project_id = %context.project_id,
            max_concurrency = batch_size,
            continue_on_error = options.continue_on_error,
            "Starting generation run"
        );

        let mut terminal: HashSet<TaskKey> = HashSet::with_capacity(dag.len());
        let mut results: Vec<TaskResult> = Vec::with_capacity(dag.len());
        let mut artifacts: HashMap<TaskKey, Artifact> = HashMap::new();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                let error = TaskError::new(TaskErrorKind::Cancelled, "run cancelled");
                self.skip_remaining(run_id, dag, &mut terminal, &mut results, &error);
                warn!("Generation run cancelled");
                break;
            }

            let batch: Vec<&GenerationTask> = dag
                .ready(&terminal)
                .into_iter()
                .take(batch_size)
                .filter_map(|key| catalog.get(key.as_str()))
                .collect();
            if batch.is_empty() {
                break;
            }
            debug!(
                batch = ?batch.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
                "Dispatching batch"
            );

            let outcomes = {
                let scope = RunScope {
                    run_id,
                    context,
                    artifacts: &artifacts,
                    generator: generator.as_ref(),
                    retry: &retry,
                    persistence: &persistence,
                    cancel,
                };
                join_all(batch.iter().map(|task| self.run_task(&scope, task))).await
            };

            let mut halted_by: Option<TaskKey> = None;
            for result in outcomes {
                terminal.insert(result.key.clone());
                if let Some(artifact) = result.artifact.as_ref() {
                    artifacts.insert(result.key.clone(), artifact.clone());
                }
                if result.error.as_ref().map(|e| e.kind) == Some(TaskErrorKind::Cancelled) {
                    cancelled = true;
                }
                let failed_key = (result.status == TaskStatus::Failed).then(|| result.key.clone());
                results.push(result);

                let Some(failed_key) = failed_key else {
                    continue;
                };
                if options.continue_on_error {
                    self.skip_dependents(run_id, dag, &failed_key, &mut terminal, &mut results);
                } else if halted_by.is_none() {
                    halted_by = Some(failed_key);
                }
            }

            if let Some(root) = halted_by {
                let error = TaskError::new(
                    TaskErrorKind::Halted,
                    format!("run halted after failure of {}", root),
                );
                self.skip_remaining(run_id, dag, &mut terminal, &mut results, &error);
                warn!(failed = %root, "Halting generation run after task failure");
                break;
            }
        }

        let total_duration_ms = clock.elapsed().as_millis() as u64;
        let run = GenerationRun::new(run_id, results, started_at, total_duration_ms, cancelled);
        info!(
            succeeded = run.succeeded_count,
            failed = run.failed_count,
            skipped = run.skipped_count,
            duration_ms = run.total_duration_ms,
            "Generation run finished"
        );
        run
    }

    async fn run_task(&self, scope: &RunScope<'_>, task: &GenerationTask) -> TaskResult {
        let span = info_span!("task", key = %task.key);
        self.run_task_inner(scope, task).instrument(span).await
    }

    async fn run_task_inner(&self, scope: &RunScope<'_>, task: &GenerationTask) -> TaskResult {
        if scope.cancel.is_cancelled() {
            self.emit(scope.run_id, &task.key, TaskStage::Skipped);
            return TaskResult::skipped(
                task.key.clone(),
                TaskError::new(TaskErrorKind::Cancelled, "run cancelled before task started"),
            );
        }

        self.emit(scope.run_id, &task.key, TaskStage::Started);
        let started = Instant::now();
        let result = self.produce_and_persist(scope, task, started).await;
        self.emit(scope.run_id, &task.key, result.status.into());
        result
    }

    async fn produce_and_persist(
        &self,
        scope: &RunScope<'_>,
        task: &GenerationTask,
        started: Instant,
    ) -> TaskResult {
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let binding = match self.registry.resolve(&task.key) {
            Ok(binding) => binding,
            Err(err) => {
                warn!(error = %err, "Processor resolution failed");
                return TaskResult::failed(task.key.clone(), TaskError::from(&err), 0, elapsed_ms());
            }
        };

        let upstream: HashMap<TaskKey, Artifact> = task
            .dependencies
            .iter()
            .filter_map(|dep| scope.artifacts.get(dep).map(|a| (dep.clone(), a.clone())))
            .collect();

        let processor: &dyn Processor = binding.processor.as_ref();
        let input = ProcessorInput {
            task,
            context: scope.context,
            upstream: &upstream,
            generator: scope.generator,
        };

        // Generator calls carry their own timeout; queueing for a rate-limit
        // slot does not count against it.
        let produced = retry_with(scope.retry, GenerationError::is_retryable, move || {
            processor.produce(input)
        })
        .await;
        let attempts = produced.attempts;

        let document = match produced.result {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, attempts, "Content generation failed");
                return TaskResult::failed(task.key.clone(), TaskError::from(&err), attempts, elapsed_ms());
            }
        };

        let artifact = Artifact::from_document(task.key.clone(), document);
        let sink = self.sink.as_ref();
        let key = &task.key;
        let pending = &artifact;
        let saved = retry_with(
            scope.persistence,
            |_: &PersistenceError| true,
            move || sink.save(key, pending),
        )
        .await;

        if let Err(err) = saved.result {
            warn!(error = %err, attempts = saved.attempts, "Persisting document failed");
            return TaskResult::failed(task.key.clone(), TaskError::from(&err), attempts, elapsed_ms());
        }

        debug!(attempts, "Task succeeded");
        TaskResult::succeeded(artifact, attempts, elapsed_ms())
    }

    fn skip_dependents(
        &self,
        run_id: RunId,
        dag: &TaskDAG,
        root: &TaskKey,
        terminal: &mut HashSet<TaskKey>,
        results: &mut Vec<TaskResult>,
    ) {
        for dependent in dag.transitive_dependents(root.as_str()) {
            if !terminal.insert(dependent.clone()) {
                continue;
            }
            debug!(task = %dependent, failed = %root, "Skipping dependent of failed task");
            self.emit(run_id, dependent, TaskStage::Skipped);
            results.push(TaskResult::skipped(
                dependent.clone(),
                TaskError::new(
                    TaskErrorKind::DependencyFailed,
                    format!("skipped because upstream task {} failed", root),
                ),
            ));
        }
    }

    fn skip_remaining(
        &self,
        run_id: RunId,
        dag: &TaskDAG,
        terminal: &mut HashSet<TaskKey>,
        results: &mut Vec<TaskResult>,
        error: &TaskError,
    ) {
        for key in dag.execution_order() {
            if terminal.insert(key.clone()) {
                self.emit(run_id, key, TaskStage::Skipped);
                results.push(TaskResult::skipped(key.clone(), error.clone()));
            }
        }
    }
}
