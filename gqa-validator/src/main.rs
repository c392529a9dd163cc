//! gqa-validator - batch classification validation
//!
//! Validates product classifications in a CSV file against an external
//! classification oracle, resuming from previously saved results.

use anyhow::{Context, Result};
use clap::Parser;
use gqa_common::events::{EventBus, ValidationEvent};
use gqa_common::human_time::format_duration;
use gqa_validator::config::{
    resolve_api_key, CliOverrides, ResolvedSettings, ValidatorConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME,
};
use gqa_validator::models::OutputFormat;
use gqa_validator::services::{OpenAiOracle, ReferenceDocs, RunOptions, RunReport, ValidationOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const RULE: &str = "============================================================";
const PROGRESS_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "gqa-validator", version, about = "Validate product classifications with an LLM oracle")]
struct Args {
    /// Input CSV file
    #[arg(short, long, default_value = "data_sample.csv")]
    input: PathBuf,

    /// Output results file (JSON or CSV)
    #[arg(short, long, default_value = "validation_results.json")]
    output: PathBuf,

    /// Oracle model [default: gpt-4o]
    #[arg(short, long, env = "GQA_MODEL")]
    model: Option<String>,

    /// Read at most this many input rows
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output format: json or csv [default: json]
    #[arg(short, long, env = "GQA_FORMAT")]
    format: Option<OutputFormat>,

    /// Reprocess every record, even those already in the output file
    #[arg(long)]
    no_skip: bool,

    /// Number of parallel workers (1 = sequential)
    #[arg(short, long, env = "GQA_PARALLEL")]
    parallel: Option<usize>,

    /// Save a checkpoint every N new results (0 = only at the end)
    #[arg(long, env = "GQA_CHECKPOINT_EVERY")]
    checkpoint_every: Option<usize>,

    /// Directory holding the classification definition documents
    #[arg(long, env = "GQA_DOCS_DIR")]
    docs_dir: Option<PathBuf>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "GQA_OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Oracle request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Config file (default: GQA_CONFIG, then ~/.config/gqa/gqa-validator.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            docs_dir: self.docs_dir.clone(),
            parallel: self.parallel,
            checkpoint_every: self.checkpoint_every,
            format: self.format,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the logging settings
    let config_path =
        gqa_common::config::resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let toml_config: ValidatorConfig = match &config_path {
        Some(path) => gqa_common::config::load_toml_config(path)?,
        None => ValidatorConfig::default(),
    };

    gqa_common::logging::init_tracing(&toml_config.logging)?;
    info!("Starting gqa-validator {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!(path = %path.display(), "Using config file"),
        Some(path) => info!(path = %path.display(), "No config file, using defaults"),
        None => warn!("No config directory available, using defaults"),
    }

    let settings = ResolvedSettings::resolve(&args.overrides(), &toml_config);
    let api_key = resolve_api_key(&toml_config)?;

    let docs = ReferenceDocs::load(&settings.docs_dir)
        .with_context(|| format!("Failed to load reference docs from {}", settings.docs_dir.display()))?;
    if docs.is_empty() {
        warn!(dir = %settings.docs_dir.display(), "No reference documents found; prompts carry no definitions");
    } else {
        info!(sections = docs.section_count(), "Loaded reference documents");
    }

    let oracle = OpenAiOracle::new(settings.oracle_settings(api_key))?;
    let event_bus = EventBus::new(1024);
    let orchestrator = ValidationOrchestrator::new(Arc::new(oracle), Arc::new(docs), event_bus.clone());

    let mut options = RunOptions::new(&args.input, &args.output);
    options.format = settings.format;
    options.limit = args.limit;
    options.skip_existing = !args.no_skip;
    options.concurrency = settings.parallel;
    options.checkpoint_every = settings.checkpoint_every;

    print_banner(&options, &settings.model);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight records and saving results");
            ctrl_c_token.cancel();
        }
    });

    let progress_printer = tokio::spawn(print_progress(event_bus.subscribe()));
    drop(event_bus);

    let report = orchestrator.run(&options, cancel).await;

    // Dropping the last sender closes the channel; the printer drains what is buffered, then exits
    drop(orchestrator);
    if tokio::time::timeout(PROGRESS_DRAIN_TIMEOUT, progress_printer).await.is_err() {
        warn!("Progress output did not finish draining");
    }
    let report = report?;

    print_report(&report, &options);
    Ok(())
}

fn print_banner(options: &RunOptions, model: &str) {
    println!("{}", RULE);
    println!("LLM-Based Data Validation");
    println!("{}", RULE);
    println!("Input file:    {}", options.input.display());
    println!("Output file:   {}", options.output.display());
    println!("Model:         {}", model);
    println!(
        "Row limit:     {}",
        options
            .limit
            .map(|l| l.to_string())
            .unwrap_or_else(|| "All rows".to_string())
    );
    println!("Format:        {}", options.format);
    println!("Skip existing: {}", options.skip_existing);
    println!("Parallel:      {} worker(s)", options.concurrency);
    println!("{}", RULE);
    println!();
}

async fn print_progress(mut rx: broadcast::Receiver<ValidationEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress display fell behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ValidationEvent::RunStarted { pending, workers, .. } => {
                if workers > 1 {
                    println!("Running {} records with {} parallel workers...", pending, workers);
                } else {
                    println!("Running {} records sequentially...", pending);
                }
            }
            ValidationEvent::RecordCompleted {
                item_key,
                index,
                total,
                elapsed_seconds,
                average_seconds,
                eta_seconds,
                ..
            } => match elapsed_seconds {
                Some(elapsed) => println!(
                    "  ✓ [{}/{}] {} in {:.2}s | Avg: {:.2}s | ETA: {}",
                    index,
                    total,
                    truncate(&item_key, 50),
                    elapsed,
                    average_seconds,
                    format_duration(eta_seconds)
                ),
                None => println!(
                    "  ✓ [{}/{}] {} | ETA: {}",
                    index,
                    total,
                    truncate(&item_key, 40),
                    format_duration(eta_seconds)
                ),
            },
            ValidationEvent::RecordFailed {
                item_key,
                index,
                total,
                message,
                ..
            } => println!("  ✗ [{}/{}] {}: {}", index, total, truncate(&item_key, 40), message),
            ValidationEvent::CheckpointSaved {
                total_results,
                new_results,
                ..
            } => println!("  Checkpoint saved ({} total, {} new)", total_results, new_results),
            ValidationEvent::RunFinished { .. } => {}
        }
    }
}

fn print_report(report: &RunReport, options: &RunOptions) {
    if let Some(timing) = &report.timing {
        println!();
        println!("{}", timing);
    }

    println!();
    if report.cancelled {
        println!(
            "Validation interrupted: {} record(s) were not dispatched. Rerun to resume.",
            report.not_dispatched
        );
    } else if report.new_count == 0 {
        println!("All items already processed. Nothing to do.");
    } else {
        println!("Validation complete. Results saved to: {}", options.output.display());
    }
    println!("  - Existing items: {}", report.existing_count);
    println!("  - New items processed: {}", report.new_count);
    if report.failed_count > 0 {
        println!("  - Failed items: {}", report.failed_count);
    }
    println!("  - Total items: {}", report.total_count());

    println!();
    println!("{}", RULE);
    println!("{}", report.summary);
    if report.summary.corrections_by_column.is_empty() {
        println!("No corrections were made.");
    }
    println!("{}", RULE);
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
