use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tfm_ingest::{
    BatchResult, IngestionHandler, ItemStatus, LocalObjectFetcher, ObjectCreatedEvent,
    ProcessorConfig,
};
use tfm_scan::TextScanner;
use tfm_store::JournalMetricsStore;
use tfm_types::{Metrics, RecordKey};
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::*;

/// Configuration file picked up from the working directory.
const DEFAULT_CONFIG_FILE: &str = "tfm.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Process(args) => cmd_process(&config, args, cli.format),
        Command::Scan(args) => cmd_scan(&config, args, cli.format),
        Command::Show(args) => cmd_show(&config, args, cli.format),
        Command::Compact => cmd_compact(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProcessorConfig> {
    match path {
        Some(path) => ProcessorConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            ProcessorConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("loading config from {DEFAULT_CONFIG_FILE}"))
        }
        None => {
            debug!("no config file; using defaults");
            Ok(ProcessorConfig::default())
        }
    }
}

fn open_store(config: &ProcessorConfig) -> anyhow::Result<JournalMetricsStore> {
    JournalMetricsStore::open(&config.store, &config.region).with_context(|| {
        format!(
            "opening table {} in {}",
            config.store.table_name,
            config.store.data_dir.display()
        )
    })
}

fn read_event(path: &Path) -> anyhow::Result<ObjectCreatedEvent> {
    let event = if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        ObjectCreatedEvent::from_json(&text)?
    } else {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        ObjectCreatedEvent::from_reader(io::BufReader::new(file))?
    };
    Ok(event)
}

fn cmd_process(config: &ProcessorConfig, args: ProcessArgs, format: OutputFormat) -> anyhow::Result<()> {
    let event = read_event(&args.event)?;
    let fetcher = Arc::new(LocalObjectFetcher::new(&config.source.root, &config.region));
    let store = Arc::new(open_store(config)?);
    let handler = IngestionHandler::new(fetcher, store, config.ingest.clone());

    let result = handler.process_event(&event)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_batch(&result),
    }

    if !result.is_clean() {
        bail!("{} of {} item(s) failed", result.failed(), result.len());
    }
    Ok(())
}

fn print_batch(result: &BatchResult) {
    for outcome in &result.outcomes {
        let name = outcome.object.to_string();
        match &outcome.status {
            ItemStatus::Succeeded { record } => println!(
                "{} {}  {} size={}",
                "✓".green().bold(),
                name.bold(),
                record.metrics,
                record.file_size
            ),
            ItemStatus::Skipped { reason } => {
                println!("{} {}  {}", "-".dimmed(), name, reason.dimmed())
            }
            ItemStatus::Failed { stage, kind, message } => println!(
                "{} {}  {} at {:?}: {}",
                "✗".red().bold(),
                name.bold(),
                kind.to_string().red(),
                stage,
                message
            ),
        }
    }
    println!(
        "\nBatch {}: {} succeeded, {} skipped, {} failed ({} ms)",
        result.batch_id.to_string().cyan(),
        result.succeeded().to_string().green(),
        result.skipped(),
        result.failed().to_string().red(),
        result.elapsed.as_millis()
    );
}

/// Files named on the command line, plus eligible files under directories.
fn collect_files(paths: &[PathBuf], suffix: &str) -> anyhow::Result<Vec<PathBuf>> {
    let suffix = suffix.to_lowercase();
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                let eligible = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.to_lowercase().ends_with(&suffix));
                if entry.file_type().is_file() && eligible {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn scan_file(scanner: &TextScanner, path: &Path) -> anyhow::Result<(Metrics, u64)> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let size = file.metadata()?.len();
    let metrics = scanner
        .scan(file)
        .with_context(|| format!("scanning {}", path.display()))?;
    Ok((metrics, size))
}

fn cmd_scan(config: &ProcessorConfig, args: ScanArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scanner = TextScanner::with_buffer_size(config.ingest.scan_buffer_size);
    let files = collect_files(&args.paths, &config.ingest.eligible_suffix)?;

    let mut rows = Vec::with_capacity(files.len());
    for path in &files {
        let (metrics, size) = scan_file(&scanner, path)?;
        match format {
            OutputFormat::Text => println!("{}  {} size={}", path.display().to_string().bold(), metrics, size),
            OutputFormat::Json => rows.push(json!({
                "path": path.display().to_string(),
                "metrics": metrics,
                "byteSize": size,
            })),
        }
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}

fn cmd_show(config: &ProcessorConfig, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let key = RecordKey::new(args.bucket, args.key);
    let Some(record) = store.get(&key)? else {
        bail!("no record for {key}");
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("{}", key.to_string().bold());
            println!("  Lines: {}", record.metrics.line_count);
            println!("  Words: {}", record.metrics.word_count);
            println!("  Characters: {}", record.metrics.character_count);
            println!("  Size: {} bytes", record.file_size);
            println!("  Processed: {}", record.upload_timestamp.to_string().cyan());
        }
    }
    Ok(())
}

fn cmd_compact(config: &ProcessorConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let dropped = store.compact()?;
    println!(
        "{} Compacted {}: {} live, {} superseded frame(s) dropped",
        "✓".green().bold(),
        store.path().display(),
        store.len()?,
        dropped
    );
    Ok(())
}
