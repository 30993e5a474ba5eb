//! Async executor running dataset entries against a vision model

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::sleep;

use crate::config::Config;
use crate::dataset::{DatasetEntry, TaskKind};
use crate::interpreter::interpret;
use crate::providers::{build_prompt, AnswerMode, ProviderError, VisionModel, VisionRequest, VisionResponse};
use crate::reporting::{EvaluationRecord, ModeReport};

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum requests in flight
    pub parallel_requests: usize,
    /// Number of retries on failure
    pub retry_count: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub max_new_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_requests: 4,
            retry_count: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 60_000,
            timeout_ms: 300_000,
            max_new_tokens: 512,
            temperature: None,
        }
    }
}

impl From<&Config> for ExecutorConfig {
    fn from(config: &Config) -> Self {
        Self {
            parallel_requests: config.execution.parallel_requests,
            retry_count: config.execution.retry_count,
            retry_delay_ms: config.execution.retry_delay_ms,
            max_retry_delay_ms: config.execution.max_retry_delay_ms,
            timeout_ms: config.execution.timeout_ms,
            max_new_tokens: config.generation.max_new_tokens,
            temperature: config.generation.temperature,
        }
    }
}

/// Executor for evaluating entries
pub struct Executor {
    config: ExecutorConfig,
    model: Arc<dyn VisionModel>,
    semaphore: Arc<Semaphore>,
}

impl Executor {
    pub fn new(model: Arc<dyn VisionModel>, config: ExecutorConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.parallel_requests.max(1)));
        Self {
            config,
            model,
            semaphore,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Evaluate every entry under one answer mode
    pub async fn run_mode(&self, entries: &[DatasetEntry], mode: AnswerMode, split: &str) -> ModeReport {
        self.run_mode_with_progress(entries, mode, split, Arc::new(NoOpProgress))
            .await
    }

    /// Evaluate every entry, reporting progress as entries finish.
    ///
    /// Records come back grouped by task kind, each group in input order.
    pub async fn run_mode_with_progress(
        &self,
        entries: &[DatasetEntry],
        mode: AnswerMode,
        split: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> ModeReport {
        let total = entries.len();
        tracing::info!(
            "Evaluating {} entries of split '{}' in {} mode on {}",
            total,
            split,
            mode,
            self.model.name()
        );

        let shared: Arc<Vec<DatasetEntry>> = Arc::new(entries.to_vec());
        let completed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(total);

        for index in 0..total {
            let executor = self.clone_for_task();
            let entries = shared.clone();
            let progress = progress.clone();
            let completed = completed.clone();

            handles.push(tokio::spawn(async move {
                let entry = &entries[index];
                // Start and complete are both reported while the slot is held
                let permit = executor.permit().await;
                let record = match &permit {
                    Ok(_) => {
                        progress.on_entry_start(entry.contest_number, entry.task);
                        executor.evaluate_with_slot(entry, mode).await
                    }
                    Err(e) => EvaluationRecord::failed(entry, e.to_string()),
                };
                progress.on_entry_complete(entry.contest_number, entry.task, record.error.is_none());
                drop(permit);
                progress.on_progress(completed.fetch_add(1, Ordering::SeqCst) + 1, total);
                record
            }));
        }

        let mut records = Vec::with_capacity(total);
        for (entry, handle) in shared.iter().zip(handles) {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::error!("Evaluation task for contest {} panicked: {}", entry.contest_number, e);
                    records.push(EvaluationRecord::failed(entry, format!("task panicked: {}", e)));
                }
            }
        }

        let report = ModeReport::from_records(records, mode, split);
        tracing::info!(
            "{} mode: ranking {}/{}, matching {}/{}",
            mode,
            report.ranking.summary.correct_answers,
            report.ranking.summary.total_entries,
            report.matching.summary.correct_answers,
            report.matching.summary.total_entries
        );
        report
    }

    /// Query the model for one entry and interpret the answer.
    ///
    /// Failures after all retries produce an incorrect, unknown record.
    pub async fn evaluate_entry(&self, entry: &DatasetEntry, mode: AnswerMode) -> EvaluationRecord {
        match self.permit().await {
            Ok(_permit) => self.evaluate_with_slot(entry, mode).await,
            Err(e) => EvaluationRecord::failed(entry, e.to_string()),
        }
    }

    async fn evaluate_with_slot(&self, entry: &DatasetEntry, mode: AnswerMode) -> EvaluationRecord {
        match self.infer_with_slot(entry, mode).await {
            Ok(response) => {
                let interpretation = interpret(&response.content);
                tracing::debug!(
                    "Contest {} ({}): extracted {} (truth {})",
                    entry.contest_number,
                    entry.task,
                    interpretation.answer,
                    entry.answer
                );
                EvaluationRecord::new(entry, response.content, interpretation)
            }
            Err(e) => EvaluationRecord::failed(entry, e.to_string()),
        }
    }

    /// Send one entry's prompt with retries
    pub async fn infer(&self, entry: &DatasetEntry, mode: AnswerMode) -> Result<VisionResponse, ProviderError> {
        let _permit = self.permit().await?;
        self.infer_with_slot(entry, mode).await
    }

    /// One of `parallel_requests` slots
    async fn permit(&self) -> Result<SemaphorePermit<'_>, ProviderError> {
        // Closed only on drop, which cannot happen while self is alive
        self.semaphore
            .acquire()
            .await
            .map_err(|e| ProviderError::Config(e.to_string()))
    }

    /// Retry loop; the caller holds a permit
    async fn infer_with_slot(&self, entry: &DatasetEntry, mode: AnswerMode) -> Result<VisionResponse, ProviderError> {
        let request = self.build_request(entry, mode);
        let mut last_error = None;
        let mut delay = self.config.retry_delay_ms;
        let mut waited_for_rate_limit = false;

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tracing::info!(
                    "Retry {} for contest {} ({}) on {}",
                    attempt,
                    entry.contest_number,
                    entry.task,
                    self.model.name()
                );
                // A rate-limit wait already covers this attempt's backoff
                if !waited_for_rate_limit {
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.config.max_retry_delay_ms);
                }
                waited_for_rate_limit = false;
            }

            match self.try_complete(&request).await {
                Ok(response) => return Ok(response),
                Err(ProviderError::RateLimited { retry_after_ms }) => {
                    tracing::warn!(
                        "Rate limited on {}, waiting {}ms",
                        self.model.name(),
                        retry_after_ms
                    );
                    sleep(Duration::from_millis(retry_after_ms)).await;
                    waited_for_rate_limit = true;
                    last_error = Some(ProviderError::RateLimited { retry_after_ms });
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!("Contest {}: {}", entry.contest_number, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        "Error on {} for contest {}: {}",
                        self.model.name(),
                        entry.contest_number,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| ProviderError::Parse("no attempt made".to_string()));
        tracing::error!("Contest {} failed after retries: {}", entry.contest_number, error);
        Err(error)
    }

    fn build_request(&self, entry: &DatasetEntry, mode: AnswerMode) -> VisionRequest {
        let request = VisionRequest::new(
            entry.image.clone(),
            build_prompt(&entry.problem, mode),
            self.config.max_new_tokens,
            mode,
        );
        match self.config.temperature {
            Some(t) => request.with_temperature(t),
            None => request,
        }
    }

    /// Single attempt, bounded by the request timeout
    async fn try_complete(&self, request: &VisionRequest) -> Result<VisionResponse, ProviderError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, self.model.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            model: self.model.clone(),
            semaphore: self.semaphore.clone(),
        }
    }
}

/// Progress callback for tracking execution
pub trait ProgressCallback: Send + Sync {
    /// Called once the entry holds a request slot
    fn on_entry_start(&self, contest_number: u32, task: TaskKind);
    fn on_entry_complete(&self, contest_number: u32, task: TaskKind, success: bool);
    fn on_progress(&self, completed: usize, total: usize);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_entry_start(&self, _contest_number: u32, _task: TaskKind) {}
    fn on_entry_complete(&self, _contest_number: u32, _task: TaskKind, _success: bool) {}
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Console progress callback
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_entry_start(&self, _contest_number: u32, _task: TaskKind) {}

    fn on_entry_complete(&self, contest_number: u32, task: TaskKind, success: bool) {
        if !success {
            println!("  FAILED {} contest {}", task, contest_number);
        }
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if completed == total || completed % 10 == 0 {
            println!("Progress: {}/{} entries complete", completed, total);
        }
    }
}
