use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_BATCH_SIZE, DatabaseConfig};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load CSV files into Postgres tables with resumable checkpoints",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Insert the rows of a CSV file into a table, resuming from a checkpoint when one exists
    Load(LoadArgs),
    /// Show or reset the checkpoint kept for a load
    Checkpoint(CheckpointArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// CSV file to load
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
    /// Target schema (prompted for when omitted)
    #[arg(long)]
    pub schema: Option<String>,
    /// Target table (prompted for when omitted)
    #[arg(long)]
    pub table: Option<String>,
    /// Comma-separated table columns to load instead of choosing interactively
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Checkpoint file (defaults to `<file>_checkpoint.txt`)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// File receiving rows that could not be converted (defaults to `<file>_errors.csv`)
    #[arg(long = "error-log")]
    pub error_log: Option<PathBuf>,
    /// Rows per INSERT statement and commit
    #[arg(long = "batch-size", env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Truncate the table before inserting (ignored when resuming)
    #[arg(long = "clear-table")]
    pub clear_table: bool,
    /// Answer yes to confirmations and keep every matching column
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Debug, Args)]
pub struct DatabaseArgs {
    /// Database host
    #[arg(long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    /// Database port
    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    /// Database name
    #[arg(long = "db-name", env = "DB_NAME")]
    pub name: Option<String>,
    /// Database user
    #[arg(long = "db-user", env = "DB_USER")]
    pub user: Option<String>,
    /// Database password
    #[arg(long = "db-password", env = "DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl DatabaseArgs {
    pub fn to_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.host.clone(),
            port: self.port,
            name: self.name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct CheckpointArgs {
    /// Checkpoint file to inspect
    #[arg(short = 'c', long = "checkpoint", required_unless_present = "file")]
    pub checkpoint: Option<PathBuf>,
    /// CSV file whose default checkpoint should be inspected
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
    /// Delete the checkpoint so the next load starts from the first row
    #[arg(long)]
    pub reset: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
