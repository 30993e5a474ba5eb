//! Humor caption benchmark for vision-language models
//!
//! Each dataset entry pairs a cartoon image with a five-option caption
//! question (`ranking` or `matching`). Models are prompted either for a bare
//! letter (simple) or for reasoning followed by a tagged answer (reasoned),
//! and free-form replies are mapped back to a choice by the
//! [`interpreter`].
//!
//! # Features
//!
//! - Deterministic answer extraction from `<think>`, `<answer>`,
//!   `<conclusion>` and boxed-token reply styles
//! - OpenAI-compatible (including local vLLM servers) and Anthropic providers
//! - Concurrent evaluation with retries, timeouts and rate limiting
//! - JSON results per mode with Unknown-aware analysis and mode comparison
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use humor_eval::{
//!     config::Config,
//!     dataset::load_entries,
//!     providers::{create_provider, AnswerMode},
//!     runner::{Executor, ExecutorConfig},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default();
//!     let model = create_provider(&config.provider)?;
//!     let executor = Executor::new(model, ExecutorConfig::from(&config));
//!
//!     let entries = load_entries(&config.dataset.dir, "test")?;
//!     let report = executor.run_mode(&entries, AnswerMode::Reasoned, "test").await;
//!     println!("ranking accuracy: {:.3}", report.ranking.summary.accuracy);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod interpreter;
pub mod providers;
pub mod reporting;
pub mod runner;

pub use config::Config;
pub use interpreter::{extract_answer, interpret, split_reasoning_and_answer_segment, ExtractedAnswer};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{compare, AccuracyStats, ComparisonReport, ResultsAnalysis};
    pub use crate::config::Config;
    pub use crate::dataset::{load_entries, Choice, DatasetEntry, EntrySource, JsonlDataset, TaskKind};
    pub use crate::interpreter::{
        extract_answer, interpret, split_reasoning_and_answer_segment, ExtractedAnswer,
        Interpretation, ParsedResponse,
    };
    pub use crate::providers::{
        build_prompt, create_provider, AnswerMode, ProviderError, ProviderResult, VisionModel,
        VisionRequest, VisionResponse,
    };
    pub use crate::reporting::{
        load_records, EvaluationRecord, JsonWriter, ModeReport, ReportError, ResultsDocument,
        RunMeta, TaskSummary,
    };
    pub use crate::runner::{Executor, ExecutorConfig};
}
