//! Source rows and their positional transformation against a column selection.

use std::rc::Rc;

use crate::{
    coerce::{Field, SqlValue, coerce},
    error::IngestError,
    schema::ColumnDescriptor,
};

/// One row of the source, addressed by its 0-based position in the file.
#[derive(Debug, Clone)]
pub struct SourceRow {
    index: usize,
    names: Rc<[String]>,
    fields: Vec<Field>,
}

impl SourceRow {
    /// `texts` are the decoded fields in source order.
    pub fn new<I, T>(index: usize, names: Rc<[String]>, texts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            index,
            names,
            fields: texts.into_iter().map(Field::new).collect(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Field lookup by name; `None` when the source has no such field or the
    /// record is shorter than the header.
    pub fn get(&self, name: &str) -> Option<&Field> {
        let position = self.names.iter().position(|f| f == name)?;
        self.fields.get(position)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedRow(Vec<SqlValue>);

impl TransformedRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    /// True when every selected field is null; such rows are not inserted.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(SqlValue::is_null)
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

pub fn transform_row(
    row: &SourceRow,
    columns: &[ColumnDescriptor],
) -> Result<TransformedRow, IngestError> {
    columns
        .iter()
        .map(|column| {
            coerce(row.get(&column.name), column).map_err(|mismatch| IngestError::TypeMismatch {
                row: row.index(),
                column: column.name.clone(),
                value: mismatch.value,
                declared_type: mismatch.declared_type,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(TransformedRow)
}
