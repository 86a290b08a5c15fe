use std::{fs::File, io::BufReader, path::Path, rc::Rc};

use encoding_rs::Encoding;
use log::debug;

use crate::{error::IngestError, io_utils, transform::SourceRow};

/// Rows in a stable order with named fields. Skipping ahead is linear.
pub trait RowSource: Iterator<Item = Result<SourceRow, IngestError>> {
    fn fields(&self) -> &[String];

    /// Number of data rows, when the source knows it up front.
    fn total_rows(&self) -> Option<usize> {
        None
    }
}

pub struct CsvRowSource {
    reader: csv::Reader<BufReader<File>>,
    encoding: &'static Encoding,
    fields: Rc<[String]>,
    record: csv::ByteRecord,
    next_index: usize,
    total_rows: usize,
}

impl CsvRowSource {
    pub fn open(
        path: &Path,
        delimiter: Option<u8>,
        encoding: &'static Encoding,
    ) -> Result<Self, IngestError> {
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let fields: Rc<[String]> = io_utils::reader_headers(&mut reader, encoding)?
            .into_iter()
            .map(|f| f.trim().to_string())
            .collect();
        let total_rows = count_records(path, delimiter)?;
        debug!(
            "Source {:?} exposes {} field(s) over {} row(s)",
            path,
            fields.len(),
            total_rows
        );
        Ok(Self {
            reader,
            encoding,
            fields,
            record: csv::ByteRecord::new(),
            next_index: 0,
            total_rows,
        })
    }

    fn read_next(&mut self) -> Result<Option<SourceRow>, IngestError> {
        let index = self.next_index;
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .map_err(|source| IngestError::Source { row: index, source })?;
        if !more {
            return Ok(None);
        }
        self.next_index += 1;
        let texts = io_utils::decode_record(&self.record, self.encoding)?;
        Ok(Some(SourceRow::new(index, Rc::clone(&self.fields), texts)))
    }
}

impl Iterator for CsvRowSource {
    type Item = Result<SourceRow, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

impl RowSource for CsvRowSource {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn total_rows(&self) -> Option<usize> {
        Some(self.total_rows)
    }
}

fn count_records(path: &Path, delimiter: u8) -> Result<usize, IngestError> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let mut record = csv::ByteRecord::new();
    let mut count = 0;
    while reader
        .read_byte_record(&mut record)
        .map_err(|source| IngestError::Source { row: count, source })?
    {
        count += 1;
    }
    Ok(count)
}
