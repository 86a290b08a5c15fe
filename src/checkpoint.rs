//! File-persisted checkpoint of the last committed source row.
//!
//! The file holds a single newline-terminated JSON object:
//!
//! ```text
//! {"checkpoint":1999,"schema":"sales","table":"orders","columns":[["id","bigint"],["note","text"]]}
//! ```
//!
//! Saves go through a sibling temporary file that is synced and renamed over
//! the target, so an interrupted save leaves the previous checkpoint intact.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::IngestError, schema::ColumnDescriptor};

/// `last_index` value meaning no row has been committed yet.
pub const NOTHING_COMMITTED: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub last_index: i64,
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl CheckpointRecord {
    /// First source row index that still needs loading.
    pub fn resume_at(&self) -> usize {
        usize::try_from(self.last_index + 1).unwrap_or(0)
    }
}

#[derive(Serialize, Deserialize)]
struct CheckpointFile {
    checkpoint: i64,
    schema: String,
    table: String,
    columns: Vec<(String, String)>,
}

impl From<&CheckpointRecord> for CheckpointFile {
    fn from(record: &CheckpointRecord) -> Self {
        Self {
            checkpoint: record.last_index,
            schema: record.schema.clone(),
            table: record.table.clone(),
            columns: record
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.declared_type.clone()))
                .collect(),
        }
    }
}

impl From<CheckpointFile> for CheckpointRecord {
    fn from(file: CheckpointFile) -> Self {
        Self {
            last_index: file.checkpoint,
            schema: file.schema,
            table: file.table,
            columns: file
                .columns
                .into_iter()
                .map(|(name, declared_type)| ColumnDescriptor {
                    name,
                    declared_type,
                })
                .collect(),
        }
    }
}

/// Outcome of comparing a loaded checkpoint with the requested target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Valid(CheckpointRecord),
    Invalid { expected: String, found: String },
}

/// Accepts `loaded` when every explicitly requested part of the target matches
/// it. Parts the caller left open are taken from the checkpoint.
pub fn reconcile(
    loaded: CheckpointRecord,
    requested_schema: Option<&str>,
    requested_table: Option<&str>,
) -> Reconciliation {
    let schema_ok = requested_schema.is_none_or(|s| s == loaded.schema);
    let table_ok = requested_table.is_none_or(|t| t == loaded.table);
    if schema_ok && table_ok {
        return Reconciliation::Valid(loaded);
    }
    Reconciliation::Invalid {
        expected: format!(
            "{}.{}",
            requested_schema.unwrap_or(&loaded.schema),
            requested_table.unwrap_or(&loaded.table)
        ),
        found: format!("{}.{}", loaded.schema, loaded.table),
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<source>_checkpoint.txt` next to the source file.
    pub fn default_path(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_os_string();
        name.push("_checkpoint.txt");
        PathBuf::from(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, record: &CheckpointRecord) -> Result<(), IngestError> {
        let write_err = |source: io::Error| IngestError::CheckpointWrite {
            path: self.path.clone(),
            source,
        };
        let mut line = serde_json::to_string(&CheckpointFile::from(record))
            .map_err(|err| write_err(io::Error::other(err)))?;
        line.push('\n');

        let staging = self.staging_path();
        let mut file = File::create(&staging).map_err(write_err)?;
        file.write_all(line.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&staging, &self.path).map_err(write_err)?;
        debug!(
            "Checkpoint {} for {}.{} written to {:?}",
            record.last_index, record.schema, record.table, self.path
        );
        Ok(())
    }

    /// `Ok(None)` when no checkpoint exists. A file that exists but cannot be
    /// used is reported as [`IngestError::CheckpointCorruption`].
    pub fn load(&self) -> Result<Option<CheckpointRecord>, IngestError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.corrupt(err.to_string())),
        };
        let parsed: CheckpointFile =
            serde_json::from_str(contents.trim()).map_err(|err| self.corrupt(err.to_string()))?;
        if parsed.checkpoint < NOTHING_COMMITTED {
            return Err(self.corrupt(format!(
                "checkpoint index {} is below {NOTHING_COMMITTED}",
                parsed.checkpoint
            )));
        }
        Ok(Some(parsed.into()))
    }

    /// Removes the checkpoint; returns whether one existed.
    pub fn clear(&self) -> Result<bool, IngestError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(IngestError::CheckpointWrite {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn corrupt(&self, reason: String) -> IngestError {
        IngestError::CheckpointCorruption {
            path: self.path.clone(),
            reason,
        }
    }
}
