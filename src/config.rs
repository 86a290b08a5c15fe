use crate::error::IngestError;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Knobs that shape a single ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub clear_before_load: bool,
    pub skip_confirmation: bool,
}

impl IngestConfig {
    pub fn new(batch_size: usize) -> Result<Self, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            ..Self::default()
        })
    }

    pub fn clear_before_load(mut self, clear: bool) -> Self {
        self.clear_before_load = clear;
        self
    }

    pub fn skip_confirmation(mut self, skip: bool) -> Self {
        self.skip_confirmation = skip;
        self
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            clear_before_load: false,
            skip_confirmation: false,
        }
    }
}

/// Connection settings, usually sourced from `DB_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}
