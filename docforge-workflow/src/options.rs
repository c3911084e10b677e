use docforge_core::{DocumentCategory, OrchestratorError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::catalog::CategoryFilter;
use crate::retry::{ExponentialBackoff, JitterStrategy, RetryConfig};

/// Per-run knobs for `generate_all` / `generate_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_backoff_bounds"))]
pub struct GenerationOptions {
    pub include_categories: Vec<DocumentCategory>,
    pub exclude_categories: Vec<DocumentCategory>,

    /// Upper bound on tasks executing at the same time.
    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize,

    /// Minimum spacing between successive content-generator calls.
    pub inter_call_delay_ms: u64,

    /// Retries after the first content-generation attempt.
    #[validate(range(max = 10))]
    pub max_retries: u32,

    #[validate(range(min = 1))]
    pub retry_initial_delay_ms: u64,

    #[validate(range(min = 1))]
    pub retry_max_delay_ms: u64,

    pub retry_jitter: bool,

    /// Keep running independent tasks after a failure; dependents of the
    /// failed task are skipped.
    pub continue_on_error: bool,

    /// Bound on a single content-generator call. Time spent waiting for a
    /// rate-limit slot does not count.
    #[validate(range(min = 1))]
    pub task_timeout_ms: u64,

    #[validate(range(max = 10))]
    pub persistence_retries: u32,

    pub run_compliance: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            include_categories: vec![],
            exclude_categories: vec![],
            max_concurrency: 4,
            inter_call_delay_ms: 0,
            max_retries: 3,
            retry_initial_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            retry_jitter: false,
            continue_on_error: true,
            task_timeout_ms: 120_000,
            persistence_retries: 2,
            run_compliance: true,
        }
    }
}

fn validate_backoff_bounds(options: &GenerationOptions) -> Result<(), ValidationError> {
    if options.retry_initial_delay_ms > options.retry_max_delay_ms {
        let mut err = ValidationError::new("backoff_bounds");
        err.message = Some("retry_initial_delay_ms must not exceed retry_max_delay_ms".into());
        return Err(err);
    }
    Ok(())
}

impl GenerationOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_initial_delay_ms = initial.as_millis() as u64;
        self.retry_max_delay_ms = max.as_millis() as u64;
        self
    }

    pub fn with_inter_call_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_persistence_retries(mut self, retries: u32) -> Self {
        self.persistence_retries = retries;
        self
    }

    pub fn with_compliance(mut self, run_compliance: bool) -> Self {
        self.run_compliance = run_compliance;
        self
    }

    pub fn including<I: IntoIterator<Item = DocumentCategory>>(mut self, categories: I) -> Self {
        self.include_categories.extend(categories);
        self
    }

    pub fn excluding<I: IntoIterator<Item = DocumentCategory>>(mut self, categories: I) -> Self {
        self.exclude_categories.extend(categories);
        self
    }

    /// Checks the options and maps failures to [`OrchestratorError::InvalidOptions`].
    pub fn validated(&self) -> Result<(), OrchestratorError> {
        self.validate()
            .map_err(|errors| OrchestratorError::InvalidOptions(errors.to_string()))
    }

    pub fn category_filter(&self) -> CategoryFilter {
        CategoryFilter::all()
            .include(self.include_categories.iter().cloned())
            .exclude(self.exclude_categories.iter().cloned())
    }

    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn retry_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            multiplier: 2.0,
            jitter: if self.retry_jitter {
                JitterStrategy::Equal
            } else {
                JitterStrategy::None
            },
        })
    }

    /// Persistence retries reuse the backoff bounds but not the attempt budget.
    pub fn persistence_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(RetryConfig {
            max_retries: self.persistence_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            multiplier: 2.0,
            jitter: JitterStrategy::None,
        })
    }
}
