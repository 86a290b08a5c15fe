//! Append-only CSV log of source rows that could not be loaded.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::{error::IngestError, io_utils, transform::SourceRow};

pub struct ErrorSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    written: usize,
}

impl ErrorSink {
    /// The file is only created once the first row is recorded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            written: 0,
        }
    }

    /// `<source>_errors.csv` next to the source file.
    pub fn default_path(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_os_string();
        name.push("_errors.csv");
        PathBuf::from(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn record(&mut self, row: &SourceRow) -> Result<(), IngestError> {
        let path = self.path.clone();
        let log_err = |source: csv::Error| IngestError::ErrorLog {
            path: path.clone(),
            source,
        };
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|err| log_err(err.into()))?;
            self.writer = Some(io_utils::open_append_writer(file));
        }
        if let Some(writer) = self.writer.as_mut() {
            writer
                .write_record(row.fields().iter().map(|field| field.text()))
                .map_err(log_err)?;
            writer.flush().map_err(|err| log_err(err.into()))?;
        }
        self.written += 1;
        Ok(())
    }
}
