use async_trait::async_trait;
use docforge_core::{ContentGenerator, GenerationError, GenerationRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, timeout, Instant};

/// Enforces a fixed minimum spacing between successive calls to the wrapped
/// content generator, across every task of a run.
///
/// The spacing applies to each call including retries; it is independent of
/// the retry backoff computed by the execution engine. An optional call
/// timeout bounds the wrapped call only, starting once the slot is granted.
pub struct RateLimitedGenerator {
    inner: Arc<dyn ContentGenerator>,
    min_interval: Duration,
    call_timeout: Option<Duration>,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimitedGenerator {
    pub fn new(inner: Arc<dyn ContentGenerator>, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            call_timeout: None,
            last_call: Mutex::new(None),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = Some(call_timeout);
        self
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    async fn wait_turn(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        // Held across the sleep so concurrent callers queue behind each other.
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let next_slot = previous + self.min_interval;
            if next_slot > Instant::now() {
                sleep_until(next_slot).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[async_trait]
impl ContentGenerator for RateLimitedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.wait_turn().await;
        match self.call_timeout {
            Some(limit) => timeout(limit, self.inner.generate(request))
                .await
                .unwrap_or(Err(GenerationError::Timeout(limit))),
            None => self.inner.generate(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_core::TaskKey;
    use std::collections::HashMap;

    struct Clock {
        calls: std::sync::Mutex<Vec<Instant>>,
        latency: Duration,
    }

    impl Clock {
        fn new(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: std::sync::Mutex::new(vec![]),
                latency,
            })
        }
    }

    #[async_trait]
    impl ContentGenerator for Clock {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push(Instant::now());
            tokio::time::sleep(self.latency).await;
            Ok(String::new())
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            task_key: TaskKey::new("project_charter"),
            project_id: "PRJ-1".to_string(),
            prompt: String::new(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced_by_min_interval() {
        let clock = Clock::new(Duration::ZERO);
        let limited = RateLimitedGenerator::new(clock.clone(), Duration::from_millis(250));

        for _ in 0..3 {
            limited.generate(request()).await.unwrap();
        }

        let calls = clock.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert!(calls[1] - calls[0] >= Duration::from_millis(250));
        assert!(calls[2] - calls[1] >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_does_not_wait() {
        let clock = Clock::new(Duration::ZERO);
        let limited = RateLimitedGenerator::new(clock.clone(), Duration::ZERO);
        let start = Instant::now();

        limited.generate(request()).await.unwrap();
        limited.generate(request()).await.unwrap();

        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_callers_do_not_spend_their_timeout_waiting() {
        let clock = Clock::new(Duration::ZERO);
        let limited = Arc::new(
            RateLimitedGenerator::new(clock.clone(), Duration::from_millis(100))
                .with_call_timeout(Duration::from_millis(150)),
        );

        let results = futures::future::join_all((0..3).map(|_| {
            let limited = limited.clone();
            async move { limited.generate(request()).await }
        }))
        .await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(clock.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let limited = RateLimitedGenerator::new(Clock::new(Duration::from_secs(5)), Duration::ZERO)
            .with_call_timeout(Duration::from_secs(1));

        let err = limited.generate(request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(limit) if limit == Duration::from_secs(1)));
    }
}
