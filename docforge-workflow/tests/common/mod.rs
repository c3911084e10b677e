#![allow(dead_code)]

use async_trait::async_trait;
use docforge_core::{
    Artifact, ContentGenerator, Document, GenerationError, GenerationRequest, GenerationTask,
    PersistenceError, PersistenceSink, Processor, ProcessorInput, ProjectContext, TaskKey,
};
use docforge_workflow::{
    GenerationOptions, ModuleTable, Orchestrator, ProcessorRegistry, TaskCatalog, TemplateProcessor,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Processor whose behaviour is scripted per test: fail a number of times,
/// take a while, record when it started.
pub struct ScriptedProcessor {
    failures: AtomicU32,
    error: GenerationError,
    delay: Duration,
    calls: AtomicU32,
    log: Option<Arc<Mutex<Vec<String>>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedProcessor {
    pub fn ok() -> Self {
        Self {
            failures: AtomicU32::new(0),
            error: GenerationError::transient("scripted failure"),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            log: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(times: u32, error: GenerationError) -> Self {
        let processor = Self::ok();
        processor.failures.store(times, Ordering::SeqCst);
        Self { error, ..processor }
    }

    pub fn always_failing(error: GenerationError) -> Self {
        Self::failing(u32::MAX, error)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }

    /// Shares concurrency counters so several processors report one peak.
    pub fn with_gauge(mut self, in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        self.in_flight = in_flight;
        self.peak = peak;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Processor for ScriptedProcessor {
    async fn produce<'a>(&self, input: ProcessorInput<'a>) -> Result<Document, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(input.task.key.to_string());
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(self.error.clone());
        }

        Ok(Document::new(
            input.task.title.clone(),
            format!("# {}\n\nProject ID: {}\n", input.task.title, input.context.project_id),
        ))
    }
}

/// Generator that answers with one heading per `## ` line of the prompt.
#[derive(Default)]
pub struct EchoSectionsGenerator {
    pub calls: AtomicU32,
}

#[async_trait]
impl ContentGenerator for EchoSectionsGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request
            .prompt
            .lines()
            .filter(|line| line.starts_with("## "))
            .map(|line| format!("{}\nContent for {}.\n", line, request.task_key))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(body)
    }
}

/// Generator that records when each call reached it, answers after a fixed
/// latency, and can fail its first N calls transiently.
pub struct TimestampingGenerator {
    pub calls: Mutex<Vec<(TaskKey, tokio::time::Instant)>>,
    latency: Duration,
    failures: AtomicU32,
}

impl TimestampingGenerator {
    pub fn new(latency: Duration) -> Self {
        Self {
            calls: Mutex::new(vec![]),
            latency,
            failures: AtomicU32::new(0),
        }
    }

    pub fn failing(latency: Duration, times: u32) -> Self {
        let generator = Self::new(latency);
        generator.failures.store(times, Ordering::SeqCst);
        generator
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn call_keys(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(key, _)| key.to_string()).collect()
    }
}

#[async_trait]
impl ContentGenerator for TimestampingGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.task_key.clone(), tokio::time::Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GenerationError::transient("429 too many requests"));
        }
        Ok(format!("## Overview\nContent for {}.\n", request.task_key))
    }
}

/// Orchestrator whose tasks all use a one-section [`TemplateProcessor`], so
/// every attempt goes through the content generator.
pub fn template_orchestrator(
    tasks: Vec<GenerationTask>,
    generator: Arc<dyn ContentGenerator>,
) -> Orchestrator {
    let mut registry = ProcessorRegistry::new(Arc::new(ModuleTable::new()));
    for task in &tasks {
        registry.register_builtin_processor(
            task.key.clone(),
            Arc::new(TemplateProcessor::new(["Overview"])),
        );
    }
    let catalog = TaskCatalog::from_tasks(tasks).expect("valid test catalog");
    Orchestrator::new(catalog, registry, generator, Arc::new(MemorySink::default()))
}

/// In-memory sink that can be told to fail its first N saves.
#[derive(Default)]
pub struct MemorySink {
    pub saved: Mutex<Vec<TaskKey>>,
    failures: AtomicU32,
}

impl MemorySink {
    pub fn failing(times: u32) -> Self {
        Self {
            saved: Mutex::new(vec![]),
            failures: AtomicU32::new(times),
        }
    }

    pub fn saved_keys(&self) -> Vec<String> {
        self.saved.lock().unwrap().iter().map(|k| k.to_string()).collect()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn save(&self, key: &TaskKey, _artifact: &Artifact) -> Result<(), PersistenceError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PersistenceError::new(key.clone(), "disk full"));
        }
        self.saved.lock().unwrap().push(key.clone());
        Ok(())
    }
}

/// Routes engine logs to the test harness; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("docforge_workflow=debug")
        .with_test_writer()
        .try_init();
}

pub fn context() -> ProjectContext {
    ProjectContext::new("PRJ-42", "Billing Revamp")
        .with_organization("Acme Corp")
        .with_stakeholders(["Ana Ruiz", "Tom Becker"])
}

/// Options with short backoff so paused-clock tests stay readable.
pub fn fast_options() -> GenerationOptions {
    GenerationOptions::default()
        .with_retry_delays(Duration::from_millis(10), Duration::from_millis(100))
        .with_compliance(false)
}

pub fn registry_with(processors: Vec<(&str, Arc<ScriptedProcessor>)>) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new(Arc::new(ModuleTable::new()));
    for (key, processor) in processors {
        registry.register_builtin_processor(key, processor);
    }
    registry
}

pub fn orchestrator(
    tasks: Vec<GenerationTask>,
    processors: Vec<(&str, Arc<ScriptedProcessor>)>,
    sink: Arc<MemorySink>,
) -> Orchestrator {
    let catalog = TaskCatalog::from_tasks(tasks).expect("valid test catalog");
    Orchestrator::new(
        catalog,
        registry_with(processors),
        Arc::new(EchoSectionsGenerator::default()),
        sink,
    )
}
