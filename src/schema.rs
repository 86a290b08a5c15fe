//! Column descriptors and the comparison of a target table's columns with the
//! fields offered by a source file.

use std::{collections::HashSet, fmt};

use itertools::Itertools;

use crate::error::IngestError;

/// Coercion bucket derived from a store's declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integral,
    TextLike,
}

impl ColumnType {
    pub fn from_declared(declared: &str) -> Self {
        match declared.trim().to_ascii_lowercase().as_str() {
            "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8" => {
                ColumnType::Integral
            }
            _ => ColumnType::TextLike,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        ColumnType::from_declared(&self.declared_type)
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.declared_type)
    }
}

/// Rejects a selection that names the same column twice.
pub fn ensure_unique(columns: &[ColumnDescriptor]) -> Result<(), IngestError> {
    match columns.iter().map(|c| c.name.as_str()).duplicates().next() {
        Some(name) => Err(IngestError::DuplicateColumn(name.to_string())),
        None => Ok(()),
    }
}

/// Checkpointed columns the source no longer provides, in column order.
pub fn missing_from_source(columns: &[ColumnDescriptor], fields: &[String]) -> Vec<String> {
    let available: HashSet<&str> = fields.iter().map(String::as_str).collect();
    columns
        .iter()
        .filter(|c| !available.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect()
}

/// How a target table's columns line up with a source's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    /// Table columns also present in the source, in table order.
    pub candidates: Vec<ColumnDescriptor>,
    /// Table columns the source does not provide.
    pub missing: Vec<String>,
    /// Source fields with no matching table column.
    pub extra: Vec<String>,
}

impl ColumnReport {
    pub fn compare(table_columns: &[ColumnDescriptor], fields: &[String]) -> Self {
        let available: HashSet<&str> = fields.iter().map(String::as_str).collect();
        let known: HashSet<&str> = table_columns.iter().map(|c| c.name.as_str()).collect();
        let (candidates, missing): (Vec<_>, Vec<_>) = table_columns
            .iter()
            .cloned()
            .partition(|c| available.contains(c.name.as_str()));
        let extra = fields
            .iter()
            .filter(|f| !known.contains(f.as_str()))
            .cloned()
            .collect();
        Self {
            candidates,
            missing: missing.into_iter().map(|c| c.name).collect(),
            extra,
        }
    }
}
