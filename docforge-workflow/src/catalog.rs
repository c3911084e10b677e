//! Task catalog assembly and validation.
//!
//! The catalog merges the built-in document set with an externally supplied
//! JSON mapping of `key -> {location, symbol, dependencies, priority}`. All
//! problems are collected and reported together in one
//! [`ConfigurationError`]; nothing executes against an invalid catalog.

use docforge_core::{
    ConfigViolation, ConfigurationError, DocumentCategory, GenerationTask, OrchestratorError,
    Priority, ProcessorRef, TaskKey,
};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::tasks::builtin_tasks;

// ===== External Mapping =====

/// Raw external task configuration, in declaration order.
///
/// Duplicate keys are preserved so they can be reported instead of silently
/// collapsing into the last occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalMapping {
    entries: Vec<(String, Value)>,
}

impl ExternalMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(raw).map_err(|err| {
            let violation = if err.is_data() {
                ConfigViolation::MappingNotAnObject
            } else {
                ConfigViolation::Malformed {
                    reason: err.to_string(),
                }
            };
            ConfigurationError::new(vec![violation])
        })
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
            }),
            Value::Array(items) => Ok(Self {
                entries: items.into_iter().map(keyed_entry).collect(),
            }),
            _ => Err(ConfigurationError::new(vec![ConfigViolation::MappingNotAnObject])),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            ConfigurationError::new(vec![ConfigViolation::Malformed {
                reason: format!("{}: {}", path.as_ref().display(), err),
            }])
        })?;
        Self::from_json_str(&raw)
    }

    pub fn insert(mut self, key: impl Into<String>, entry: Value) -> Self {
        self.entries.push((key.into(), entry));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses every entry. Malformed entries keep their key so duplicate
    /// detection still sees them.
    pub fn parse(&self) -> ParsedMapping {
        let mut parsed = ParsedMapping::default();

        for (key, entry) in &self.entries {
            let task = parse_entry(key, entry, &mut parsed.violations);
            if !key.trim().is_empty() {
                parsed.entries.push((TaskKey::new(key.as_str()), task));
            }
        }

        parsed
    }
}

/// Result of parsing an [`ExternalMapping`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMapping {
    /// Every non-empty key in declaration order, with its task when the
    /// entry was well-formed.
    pub entries: Vec<(TaskKey, Option<GenerationTask>)>,
    pub violations: Vec<ConfigViolation>,
}

impl ParsedMapping {
    pub fn tasks(&self) -> impl Iterator<Item = &GenerationTask> {
        self.entries.iter().filter_map(|(_, task)| task.as_ref())
    }
}

fn keyed_entry(item: Value) -> (String, Value) {
    let key = item
        .get("key")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (key, item)
}

impl<'de> Deserialize<'de> for ExternalMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = ExternalMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object keyed by task, or an array of keyed task entries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    entries.push((key, value));
                }
                Ok(ExternalMapping { entries })
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element::<Value>()? {
                    entries.push(keyed_entry(item));
                }
                Ok(ExternalMapping { entries })
            }
        }

        deserializer.deserialize_any(MappingVisitor)
    }
}

fn parse_entry(
    key: &str,
    entry: &Value,
    violations: &mut Vec<ConfigViolation>,
) -> Option<GenerationTask> {
    if key.trim().is_empty() {
        violations.push(ConfigViolation::EmptyKey);
        return None;
    }

    let Some(fields) = entry.as_object() else {
        violations.push(ConfigViolation::NotAnObject {
            key: key.to_string(),
        });
        return None;
    };

    let before = violations.len();
    let field = |name: &str| fields.get(name).filter(|value| !value.is_null());
    let invalid = |field: &'static str, expected: &'static str| ConfigViolation::InvalidType {
        key: key.to_string(),
        field,
        expected,
    };

    let mut required_string = |name: &'static str| match field(name) {
        None => {
            violations.push(ConfigViolation::MissingField {
                key: key.to_string(),
                field: name,
            });
            None
        }
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(_) => {
            violations.push(invalid(name, "a non-empty string"));
            None
        }
    };
    let location = required_string("location");
    let symbol = required_string("symbol");

    let dependencies = match field("dependencies") {
        None => Some(Vec::new()),
        Some(Value::Array(items)) => {
            let deps: Option<Vec<TaskKey>> = items
                .iter()
                .map(|item| item.as_str().map(TaskKey::from))
                .collect();
            if deps.is_none() {
                violations.push(invalid("dependencies", "an array of strings"));
            }
            deps
        }
        Some(_) => {
            violations.push(invalid("dependencies", "an array of strings"));
            None
        }
    };

    let priority = match field("priority") {
        None => Some(Priority::UNSPECIFIED),
        Some(value) => {
            let parsed = value
                .as_u64()
                .and_then(|p| u32::try_from(p).ok())
                .map(Priority::new);
            if parsed.is_none() {
                violations.push(invalid("priority", "a non-negative integer"));
            }
            parsed
        }
    };

    let mut optional_string = |name: &'static str| match field(name) {
        None => Some(None),
        Some(Value::String(s)) => Some(Some(s.clone())),
        Some(_) => {
            violations.push(invalid(name, "a string"));
            None
        }
    };
    let category = optional_string("category");
    let title = optional_string("title");

    if violations.len() > before {
        return None;
    }

    let (location, symbol, dependencies, priority, category, title) =
        (location?, symbol?, dependencies?, priority?, category?, title?);

    let mut task = GenerationTask::new(key, category.map(DocumentCategory::from).unwrap_or_default())
        .with_dependencies(dependencies)
        .with_processor(ProcessorRef::new(location, symbol));
    task.priority = priority;
    if let Some(title) = title {
        task = task.with_title(title);
    }
    Some(task)
}

// ===== Category Filter =====

/// Category selection applied to a catalog before a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    /// When non-empty, only these categories are selected.
    pub include: Vec<DocumentCategory>,
    pub exclude: Vec<DocumentCategory>,
}

impl CategoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include<I: IntoIterator<Item = DocumentCategory>>(mut self, categories: I) -> Self {
        self.include.extend(categories);
        self
    }

    pub fn exclude<I: IntoIterator<Item = DocumentCategory>>(mut self, categories: I) -> Self {
        self.exclude.extend(categories);
        self
    }

    pub fn allows(&self, category: &DocumentCategory) -> bool {
        (self.include.is_empty() || self.include.contains(category))
            && !self.exclude.contains(category)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

// ===== Task Catalog =====

/// Immutable, validated set of generation tasks in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCatalog {
    tasks: Vec<GenerationTask>,
    index: HashMap<TaskKey, usize>,
}

impl TaskCatalog {
    pub fn builder() -> TaskCatalogBuilder {
        TaskCatalogBuilder::default()
    }

    /// The built-in document set on its own.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::builder().with_builtin().build()
    }

    pub fn from_tasks<I>(tasks: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = GenerationTask>,
    {
        tasks
            .into_iter()
            .fold(Self::builder(), TaskCatalogBuilder::task)
            .build()
    }

    pub fn tasks(&self) -> &[GenerationTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&GenerationTask> {
        self.index.get(key).map(|&idx| &self.tasks[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Declaration position, used as the scheduling tie-break.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.tasks.iter().map(|task| &task.key)
    }

    pub fn by_category(&self, category: &DocumentCategory) -> Vec<&GenerationTask> {
        self.tasks
            .iter()
            .filter(|task| &task.category == category)
            .collect()
    }

    pub fn categories(&self) -> Vec<&DocumentCategory> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .map(|task| &task.category)
            .filter(|category| seen.insert(*category))
            .collect()
    }

    /// Sub-catalog of the tasks whose category passes `filter`.
    ///
    /// Dependencies on tasks outside the selection are dropped: those
    /// upstream documents are treated as already satisfied.
    pub fn select(&self, filter: &CategoryFilter) -> TaskCatalog {
        if filter.is_unrestricted() {
            return self.clone();
        }
        self.restrict(|task| filter.allows(&task.category))
    }

    /// Sub-catalog containing exactly `keys`.
    pub fn subset<I, K>(&self, keys: I) -> Result<TaskCatalog, OrchestratorError>
    where
        I: IntoIterator<Item = K>,
        K: Into<TaskKey>,
    {
        let mut wanted = HashSet::new();
        for key in keys {
            let key = key.into();
            if !self.contains(key.as_str()) {
                return Err(OrchestratorError::UnknownTask(key));
            }
            wanted.insert(key);
        }
        Ok(self.restrict(|task| wanted.contains(&task.key)))
    }

    fn restrict<F>(&self, keep: F) -> TaskCatalog
    where
        F: Fn(&GenerationTask) -> bool,
    {
        let selected: HashSet<&TaskKey> = self
            .tasks
            .iter()
            .filter(|&task| keep(task))
            .map(|task| &task.key)
            .collect();

        let tasks: Vec<GenerationTask> = self
            .tasks
            .iter()
            .filter(|task| selected.contains(&task.key))
            .map(|task| {
                let mut task = task.clone();
                task.dependencies.retain(|dep| selected.contains(dep));
                task
            })
            .collect();

        debug!(selected = tasks.len(), total = self.tasks.len(), "Restricted task catalog");
        TaskCatalog::indexed(tasks)
    }

    fn indexed(tasks: Vec<GenerationTask>) -> TaskCatalog {
        let index = tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.key.clone(), idx))
            .collect();
        TaskCatalog { tasks, index }
    }
}

/// Accumulates built-in, programmatic and external tasks, then validates the
/// merged set in one pass.
///
/// Every declared key takes part in duplicate detection, including external
/// entries that failed to parse, and every parsed occurrence has its
/// dependencies checked.
#[derive(Debug, Default)]
pub struct TaskCatalogBuilder {
    declared: Vec<(TaskKey, Option<GenerationTask>)>,
    violations: Vec<ConfigViolation>,
}

impl TaskCatalogBuilder {
    pub fn with_builtin(mut self) -> Self {
        self.declared
            .extend(builtin_tasks().into_iter().map(|task| (task.key.clone(), Some(task))));
        self
    }

    pub fn task(mut self, task: GenerationTask) -> Self {
        self.declared.push((task.key.clone(), Some(task)));
        self
    }

    pub fn external(mut self, mapping: &ExternalMapping) -> Self {
        let parsed = mapping.parse();
        self.declared.extend(parsed.entries);
        self.violations.extend(parsed.violations);
        self
    }

    pub fn build(self) -> Result<TaskCatalog, ConfigurationError> {
        let TaskCatalogBuilder {
            declared,
            mut violations,
        } = self;

        let mut seen = HashSet::new();
        for (key, _) in &declared {
            if key.is_empty() {
                violations.push(ConfigViolation::EmptyKey);
            } else if !seen.insert(key.clone()) {
                violations.push(ConfigViolation::DuplicateKey {
                    key: key.to_string(),
                });
            }
        }

        let tasks: Vec<GenerationTask> = declared.into_iter().filter_map(|(_, task)| task).collect();
        for task in &tasks {
            for dependency in &task.dependencies {
                if dependency == &task.key {
                    violations.push(ConfigViolation::SelfDependency {
                        key: task.key.to_string(),
                    });
                } else if !seen.contains(dependency) {
                    violations.push(ConfigViolation::UnknownDependency {
                        key: task.key.to_string(),
                        dependency: dependency.to_string(),
                    });
                }
            }
        }

        if !violations.is_empty() {
            return Err(ConfigurationError::new(violations));
        }

        Ok(TaskCatalog::indexed(tasks))
    }
}
