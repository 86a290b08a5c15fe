#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use csv_ingest::error::IngestError;
use csv_ingest::prompt::Prompter;
use csv_ingest::schema::ColumnDescriptor;
use csv_ingest::source::RowSource;
use csv_ingest::store::{SchemaCatalog, Store, StoreError};
use csv_ingest::transform::SourceRow;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

pub fn columns(specs: &[(&str, &str)]) -> Vec<ColumnDescriptor> {
    specs
        .iter()
        .map(|(name, ty)| ColumnDescriptor::new(*name, *ty))
        .collect()
}

/// In-memory rows of field text, read the same way the CSV source reads them.
pub struct VecSource {
    fields: Rc<[String]>,
    rows: std::vec::IntoIter<Vec<String>>,
    total: usize,
    next_index: usize,
}

impl VecSource {
    pub fn new(fields: &[&str], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|field| field.to_string()).collect())
            .collect::<Vec<Vec<String>>>();
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            total: rows.len(),
            rows: rows.into_iter(),
            next_index: 0,
        }
    }
}

impl Iterator for VecSource {
    type Item = Result<SourceRow, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        let texts = self.rows.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(Ok(SourceRow::new(index, Rc::clone(&self.fields), texts)))
    }
}

impl RowSource for VecSource {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn total_rows(&self) -> Option<usize> {
        Some(self.total)
    }
}

/// Records committed statements; can be told to reject the n-th statement.
#[derive(Default)]
pub struct MemoryStore {
    catalog: BTreeMap<String, BTreeMap<String, Vec<ColumnDescriptor>>>,
    pending: Vec<String>,
    in_transaction: bool,
    statements_seen: usize,
    pub fail_statement: Option<usize>,
    pub committed: Vec<String>,
    pub truncated: Vec<String>,
    pub rollbacks: usize,
}

impl MemoryStore {
    pub fn with_table(schema: &str, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        let mut store = Self::default();
        store.add_table(schema, table, columns);
        store
    }

    pub fn add_table(&mut self, schema: &str, table: &str, columns: Vec<ColumnDescriptor>) {
        self.catalog
            .entry(schema.to_string())
            .or_default()
            .insert(table.to_string(), columns);
    }

    pub fn failing_at(mut self, statement: usize) -> Self {
        self.fail_statement = Some(statement);
        self
    }
}

impl Store for MemoryStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        assert!(!self.in_transaction, "nested transaction");
        self.in_transaction = true;
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        assert!(self.in_transaction, "statement outside a transaction");
        let position = self.statements_seen;
        self.statements_seen += 1;
        if self.fail_statement == Some(position) {
            return Err(StoreError::Rejected(format!("statement {position} rejected")));
        }
        self.pending.push(statement.to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.committed.append(&mut self.pending);
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.pending.clear();
        self.in_transaction = false;
        self.rollbacks += 1;
        Ok(())
    }

    fn truncate(&mut self, schema: &str, table: &str) -> Result<(), StoreError> {
        self.truncated.push(format!("{schema}.{table}"));
        Ok(())
    }
}

impl SchemaCatalog for MemoryStore {
    fn schemas(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.catalog.keys().cloned().collect())
    }

    fn tables(&mut self, schema: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .catalog
            .get(schema)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, StoreError> {
        Ok(self
            .catalog
            .get(schema)
            .and_then(|tables| tables.get(table))
            .cloned()
            .unwrap_or_default())
    }
}

/// Answers prompts from queues and records what was asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub select_one: VecDeque<usize>,
    pub select_many: VecDeque<Vec<usize>>,
    pub confirm: VecDeque<bool>,
    pub asked: Vec<String>,
    /// Totals announced when progress reporting started.
    pub progress_totals: Vec<Option<u64>>,
    pub progress: Vec<usize>,
    pub progress_finished: usize,
}

impl ScriptedPrompter {
    pub fn confirming(answers: &[bool]) -> Self {
        Self {
            confirm: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn unexpected(prompt: &str) -> io::Error {
        io::Error::other(format!("unexpected prompt: {prompt}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select_one(&mut self, prompt: &str, _options: &[String]) -> io::Result<usize> {
        self.asked.push(prompt.to_string());
        self.select_one
            .pop_front()
            .ok_or_else(|| Self::unexpected(prompt))
    }

    fn select_many(&mut self, prompt: &str, _options: &[String]) -> io::Result<Vec<usize>> {
        self.asked.push(prompt.to_string());
        self.select_many
            .pop_front()
            .ok_or_else(|| Self::unexpected(prompt))
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> io::Result<bool> {
        self.asked.push(prompt.to_string());
        self.confirm.pop_front().ok_or_else(|| Self::unexpected(prompt))
    }

    fn start_progress(&mut self, total: Option<u64>) {
        self.progress_totals.push(total);
    }

    fn report_progress(&mut self, count: usize) {
        self.progress.push(count);
    }

    fn finish_progress(&mut self) {
        self.progress_finished += 1;
    }
}
