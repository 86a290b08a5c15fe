//! Error taxonomy for the ingestion pipeline.
//!
//! Row-level problems ([`IngestError::TypeMismatch`]) are absorbed by the
//! driver into the error sink. Everything else aborts the run; batch failures
//! leave the last committed checkpoint in place so the next run can resume.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Source file {0:?} not found")]
    SourceNotFound(PathBuf),

    #[error("Opening source file {path:?}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Source is missing checkpointed column(s): {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("Target {schema}.{table} could not be resolved: {reason}")]
    TargetResolution {
        schema: String,
        table: String,
        reason: String,
    },

    #[error("Row {row} column '{column}': cannot read '{value}' as {declared_type}")]
    TypeMismatch {
        row: usize,
        column: String,
        value: String,
        declared_type: String,
    },

    #[error("Batch covering rows {first_row}..={last_row} failed")]
    BatchExecution {
        first_row: usize,
        last_row: usize,
        #[source]
        source: StoreError,
    },

    #[error("Checkpoint file {path:?} is corrupt: {reason}")]
    CheckpointCorruption { path: PathBuf, reason: String },

    #[error("Writing checkpoint file {path:?}")]
    CheckpointWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Appending to error log {path:?}")]
    ErrorLog {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Reading source row {row}")]
    Source {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Decoding source: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Prompt failed")]
    Prompt(#[source] io::Error),

    #[error("No columns selected for {schema}.{table}")]
    NoColumnsSelected { schema: String, table: String },

    #[error("Column '{0}' selected more than once")]
    DuplicateColumn(String),

    #[error("Row has {actual} value(s) but {expected} column(s) are selected")]
    RowShape { expected: usize, actual: usize },

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Load aborted by operator")]
    Aborted,
}

impl IngestError {
    /// True for errors that only exclude a single row from the load.
    pub fn is_row_level(&self) -> bool {
        matches!(self, IngestError::TypeMismatch { .. })
    }
}
