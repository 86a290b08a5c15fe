//! Seams between the pipeline and the relational store.

use thiserror::Error;

use crate::schema::ColumnDescriptor;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Postgres: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("Statement rejected: {0}")]
    Rejected(String),
}

/// Executes statements inside explicit transactions.
pub trait Store {
    fn begin(&mut self) -> Result<(), StoreError>;
    fn execute(&mut self, statement: &str) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    fn rollback(&mut self) -> Result<(), StoreError>;
    /// Removes every row of `schema.table` and commits.
    fn truncate(&mut self, schema: &str, table: &str) -> Result<(), StoreError>;
}

/// Describes the targets available in the store.
pub trait SchemaCatalog {
    fn schemas(&mut self) -> Result<Vec<String>, StoreError>;
    fn tables(&mut self, schema: &str) -> Result<Vec<String>, StoreError>;
    /// Columns of `schema.table` in their declared order.
    fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, StoreError>;
}
