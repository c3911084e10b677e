use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::TaskKey;

// ===== Priority =====

/// Scheduling preference among simultaneously-ready tasks. Lower values run
/// earlier; priority never overrides a dependency edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Priority(pub u32);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);

    /// Assigned to tasks that declare no priority. They run after every
    /// explicitly prioritised ready task; ties among them fall back to
    /// catalog order.
    pub const UNSPECIFIED: Priority = Priority(999);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::UNSPECIFIED
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ===== Document Category =====

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentCategory {
    Initiation,
    Planning,
    Execution,
    Monitoring,
    Closure,
    Custom(String),
}

impl DocumentCategory {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentCategory::Initiation => "initiation",
            DocumentCategory::Planning => "planning",
            DocumentCategory::Execution => "execution",
            DocumentCategory::Monitoring => "monitoring",
            DocumentCategory::Closure => "closure",
            DocumentCategory::Custom(name) => name,
        }
    }
}

impl Default for DocumentCategory {
    fn default() -> Self {
        DocumentCategory::Custom("custom".to_string())
    }
}

impl FromStr for DocumentCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "initiation" => DocumentCategory::Initiation,
            "planning" => DocumentCategory::Planning,
            "execution" => DocumentCategory::Execution,
            "monitoring" => DocumentCategory::Monitoring,
            "closure" => DocumentCategory::Closure,
            other => DocumentCategory::Custom(other.to_string()),
        })
    }
}

impl From<String> for DocumentCategory {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for DocumentCategory {
    fn from(value: &str) -> Self {
        DocumentCategory::from(value.to_string())
    }
}

impl From<DocumentCategory> for String {
    fn from(category: DocumentCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== Processor Reference =====

/// Declarative pointer to an externally registered processing unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessorRef {
    pub location: String,
    pub symbol: String,
}

impl ProcessorRef {
    pub fn new(location: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for ProcessorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.location, self.symbol)
    }
}

// ===== Generation Task =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub key: TaskKey,
    pub title: String,
    pub category: DocumentCategory,
    pub priority: Priority,
    /// Keys that must reach a terminal state before this task starts.
    pub dependencies: Vec<TaskKey>,
    /// Present for tasks contributed by external configuration.
    pub processor: Option<ProcessorRef>,
}

impl GenerationTask {
    pub fn new(key: impl Into<TaskKey>, category: DocumentCategory) -> Self {
        let key = key.into();
        Self {
            title: title_from_key(key.as_str()),
            key,
            category,
            priority: Priority::UNSPECIFIED,
            dependencies: vec![],
            processor: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Priority(priority);
        self
    }

    pub fn with_dependencies<I, K>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<TaskKey>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_processor(mut self, processor: ProcessorRef) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn depends_on(&self, key: &TaskKey) -> bool {
        self.dependencies.contains(key)
    }

    pub fn is_external(&self) -> bool {
        self.processor.is_some()
    }
}

/// `stakeholder_register` -> `Stakeholder Register`
pub fn title_from_key(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
