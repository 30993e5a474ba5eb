//! Humor caption benchmark CLI

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use humor_eval::{
    analysis::{compare, ResultsAnalysis},
    config::Config,
    dataset::load_entries,
    interpreter::interpret,
    providers::{build_prompt, create_provider, AnswerMode},
    reporting::{
        load_records, print_analysis, print_comparison, print_run_summary, JsonWriter, ReportError,
        ResultsDocument, RunMeta,
    },
    runner::{ConsoleProgress, Executor, ExecutorConfig, NoOpProgress, ProgressCallback},
};

/// Which answer modes a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ModeSelection {
    Simple,
    Reasoned,
    Both,
}

impl ModeSelection {
    fn modes(self) -> Vec<AnswerMode> {
        match self {
            ModeSelection::Simple => vec![AnswerMode::Simple],
            ModeSelection::Reasoned => vec![AnswerMode::Reasoned],
            ModeSelection::Both => AnswerMode::all().to_vec(),
        }
    }
}

#[derive(Parser)]
#[command(name = "humor-eval")]
#[command(about = "Multiple-choice humor caption benchmark for vision-language models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a split under one or both answer modes
    Run {
        /// Dataset split: test, test_hard or test_very_hard (default from config)
        #[arg(long)]
        split: Option<String>,

        #[arg(long, value_enum, default_value = "both")]
        mode: ModeSelection,

        #[arg(long)]
        max_new_tokens: Option<u32>,

        /// Directory for results files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Provider name (openai, anthropic)
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Only evaluate the first N entries
        #[arg(long)]
        limit: Option<usize>,

        /// Maximum requests in flight
        #[arg(long)]
        parallel: Option<usize>,

        #[arg(long)]
        no_progress: bool,
    },

    /// Query the model for a single entry and show the raw reply
    Infer {
        #[arg(long)]
        split: Option<String>,

        #[arg(long, default_value_t = 0)]
        index: usize,

        #[arg(long, default_value = "reasoned")]
        mode: AnswerMode,
    },

    /// Interpret a model reply given as an argument or on stdin
    Extract {
        response: Option<String>,
    },

    /// Accuracy with and without Unknown answers for a results file
    Analyze {
        file: PathBuf,
    },

    /// Compare a simple-mode results file against a reasoned-mode one
    Compare {
        simple: PathBuf,
        reasoned: PathBuf,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/humor-eval.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("humor_eval=debug,info")
    } else {
        EnvFilter::new("humor_eval=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Run {
            split,
            mode,
            max_new_tokens,
            output_dir,
            provider,
            model,
            limit,
            parallel,
            no_progress,
        } => {
            let mut config = config;
            if let Some(split) = split {
                config.dataset.split = split;
            }
            if let Some(tokens) = max_new_tokens {
                config.generation.max_new_tokens = tokens;
            }
            if let Some(dir) = output_dir {
                config.output.output_dir = dir.to_string_lossy().into_owned();
            }
            if let Some(name) = provider {
                config.provider.name = name;
            }
            if let Some(model) = model {
                config.provider.model = model;
            }
            if let Some(parallel) = parallel {
                config.execution.parallel_requests = parallel;
            }
            run_benchmark(&config, mode, limit, !no_progress).await?;
        }

        Commands::Infer { split, index, mode } => {
            let split = split.unwrap_or_else(|| config.dataset.split.clone());
            infer_single(&config, &split, index, mode).await?;
        }

        Commands::Extract { response } => {
            let response = match response {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            extract(&response);
        }

        Commands::Analyze { file } => {
            if let Err(e) = analyze_file(&file) {
                println!("Error: {}", e);
            }
        }

        Commands::Compare { simple, reasoned } => {
            if let Err(e) = compare_files(&simple, &reasoned) {
                println!("Error: {}", e);
            }
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

async fn run_benchmark(
    config: &Config,
    selection: ModeSelection,
    limit: Option<usize>,
    show_progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let split = &config.dataset.split;

    println!("=== Humor Caption Benchmark ===");
    println!("Split:    {}", split);
    println!("Provider: {} ({})", config.provider.name, config.provider.model);
    println!();

    let mut entries = load_entries(&config.dataset.dir, split)?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    if entries.is_empty() {
        eprintln!("Error: No entries to evaluate in split '{}'", split);
        std::process::exit(1);
    }
    println!("Entries: {}", entries.len());

    let model = create_provider(&config.provider)?;
    let provider_name = model.name().to_string();
    let model_name = model.default_model().to_string();
    match model.health_check().await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("{} did not answer the health check, continuing anyway", provider_name),
        Err(e) => tracing::warn!("Health check failed: {}", e),
    }
    let executor = Executor::new(model, ExecutorConfig::from(config));

    let progress: Arc<dyn ProgressCallback> = if show_progress {
        Arc::new(ConsoleProgress)
    } else {
        Arc::new(NoOpProgress)
    };

    let mut documents = Vec::new();
    for mode in selection.modes() {
        println!("\nRunning {} mode...", mode);
        let report = executor
            .run_mode_with_progress(&entries, mode, split, progress.clone())
            .await;
        print_run_summary(&report);

        let at = Utc::now();
        let meta = RunMeta {
            answer_mode: Some(mode),
            provider: Some(provider_name.clone()),
            model: Some(model_name.clone()),
            generated_at: Some(at.to_rfc3339()),
            ..RunMeta::new(split.as_str(), config.generation.max_new_tokens)
        };
        let document = ResultsDocument::new(meta, report);
        let path = JsonWriter::write_document(&config.output.output_dir, &document, mode, at)?;
        println!("Results written to: {}", path.display());

        documents.push((mode, document));
    }

    if let [(AnswerMode::Simple, simple), (AnswerMode::Reasoned, reasoned)] = documents.as_slice() {
        let simple: Vec<_> = simple.records().cloned().collect();
        let reasoned: Vec<_> = reasoned.records().cloned().collect();
        println!();
        print_comparison(&compare(&simple, &reasoned));
    }

    Ok(())
}

async fn infer_single(
    config: &Config,
    split: &str,
    index: usize,
    mode: AnswerMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = load_entries(&config.dataset.dir, split)?;
    let entry = entries
        .get(index)
        .ok_or_else(|| format!("Index {} out of range: split '{}' has {} entries", index, split, entries.len()))?;

    let model = create_provider(&config.provider)?;
    let executor = Executor::new(model, ExecutorConfig::from(config));

    println!("Contest {} ({}), answer {}", entry.contest_number, entry.task, entry.answer);
    println!("Prompt:\n{}\n", build_prompt(&entry.problem, mode));

    let response = executor.infer(entry, mode).await?;
    println!("Response ({} ms, {} output tokens):\n{}\n", response.latency_ms, response.output_tokens, response.content);

    let interpretation = interpret(&response.content);
    println!(
        "Extracted: {} ({})",
        interpretation.answer,
        if interpretation.answer.matches(entry.answer) { "correct" } else { "incorrect" }
    );
    Ok(())
}

fn extract(response: &str) {
    let interpretation = interpret(response);
    println!("Reasoning:\n{}\n", interpretation.reasoning);
    println!("Answer segment:\n{}\n", interpretation.answer_segment);
    println!("Extracted answer: {}", interpretation.answer);
}

fn analyze_file(path: &Path) -> Result<(), ReportError> {
    let records = load_records(path)?;
    print_analysis(&ResultsAnalysis::from_records(&records));
    Ok(())
}

fn compare_files(simple: &Path, reasoned: &Path) -> Result<(), ReportError> {
    let simple = load_records(simple)?;
    let reasoned = load_records(reasoned)?;
    print_comparison(&compare(&simple, &reasoned));
    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
