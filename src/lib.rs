pub mod checkpoint;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod error;
pub mod error_sink;
pub mod ingest;
pub mod io_utils;
pub mod pg;
pub mod prompt;
pub mod query;
pub mod report;
pub mod schema;
pub mod source;
pub mod store;
pub mod target;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    checkpoint::CheckpointStore,
    cli::{Cli, Commands},
    config::IngestConfig,
    error_sink::ErrorSink,
    ingest::Ingestor,
    pg::PgStore,
    prompt::TerminalPrompter,
    source::CsvRowSource,
    target::TargetRequest,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err).context("Loading .env");
        }
    }
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Checkpoint(args) => handle_checkpoint(&args),
    }
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.file, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let config = IngestConfig::new(args.batch_size)?
        .clear_before_load(args.clear_table)
        .skip_confirmation(args.yes);
    let source = CsvRowSource::open(&args.file, Some(delimiter), encoding)
        .with_context(|| format!("Opening source {:?}", args.file))?;

    let checkpoint_path = args
        .checkpoint
        .clone()
        .unwrap_or_else(|| CheckpointStore::default_path(&args.file));
    let error_log = args
        .error_log
        .clone()
        .unwrap_or_else(|| ErrorSink::default_path(&args.file));
    info!(
        "Loading '{}' with delimiter '{}' (checkpoint {:?}, batch size {})",
        args.file.display(),
        printable_delimiter(delimiter),
        checkpoint_path,
        config.batch_size
    );

    let request = TargetRequest {
        schema: args.schema.clone(),
        table: args.table.clone(),
        columns: args
            .columns
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect(),
    };
    debug!("Target request: {:?}", request);

    let mut store = PgStore::connect(&args.database.to_config())
        .with_context(|| format!("Connecting to {}:{}", args.database.host, args.database.port))?;
    let mut prompter = TerminalPrompter::stdio();
    let summary = Ingestor::new(
        &config,
        &mut store,
        &mut prompter,
        CheckpointStore::new(&checkpoint_path),
        ErrorSink::new(&error_log),
    )
    .run(source, &request)
    .with_context(|| format!("Loading {:?}", args.file))?;
    drop(prompter);

    info!(
        "Inserted {} row(s) into {} in {} batch(es); checkpoint at row {}",
        summary.rows_inserted, summary.target, summary.batches, summary.last_index
    );
    if summary.empty_rows > 0 {
        info!(
            "Skipped {} row(s) with no values for the selected columns",
            summary.empty_rows
        );
    }
    if summary.failed_rows > 0 {
        warn!(
            "{} row(s) could not be converted and were written to {:?}",
            summary.failed_rows, error_log
        );
    }
    Ok(())
}

fn handle_checkpoint(args: &cli::CheckpointArgs) -> Result<()> {
    let path = match (&args.checkpoint, &args.file) {
        (Some(path), _) => path.clone(),
        (None, Some(file)) => CheckpointStore::default_path(file),
        (None, None) => anyhow::bail!("Either --checkpoint or --file is required"),
    };
    let store = CheckpointStore::new(&path);
    if args.reset {
        if store.clear()? {
            info!("Removed checkpoint {:?}", path);
        } else {
            info!("No checkpoint at {:?}", path);
        }
        return Ok(());
    }
    match store
        .load()
        .with_context(|| format!("Reading checkpoint {path:?}"))?
    {
        Some(record) => print!("{}", report::render_checkpoint(&record)),
        None => println!("No checkpoint at {}", path.display()),
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
