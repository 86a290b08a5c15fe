//! The ingestion driver.
//!
//! A run moves through [`Phase::Init`], [`Phase::ResolvingTarget`],
//! [`Phase::ValidatingColumns`], [`Phase::Streaming`] and finally
//! [`Phase::Done`]; any fatal error leaves it in [`Phase::Failed`].
//!
//! Rows are streamed in source order and grouped into batches of
//! [`IngestConfig::batch_size`]. Each batch is one `INSERT` executed and
//! committed in its own transaction, after which the checkpoint is rewritten
//! with the index of the batch's last row. Rows that fail coercion travel with
//! the batch they were read in and reach the error log only once that batch is
//! committed, so a replayed batch never logs them twice. A failed batch ends
//! the run and leaves the previous checkpoint as the recovery point.

use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    checkpoint::{self, CheckpointRecord, CheckpointStore, NOTHING_COMMITTED, Reconciliation},
    config::IngestConfig,
    error::IngestError,
    error_sink::ErrorSink,
    prompt::Prompter,
    query,
    schema::{self, ColumnDescriptor},
    source::RowSource,
    store::{SchemaCatalog, Store, StoreError},
    target::{self, Target, TargetRequest},
    transform::{self, SourceRow, TransformedRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    ResolvingTarget,
    ValidatingColumns,
    Streaming,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub target: Target,
    pub columns: Vec<ColumnDescriptor>,
    /// Checkpoint index the run resumed after, if it resumed.
    pub resumed_from: Option<i64>,
    pub rows_inserted: usize,
    pub batches: usize,
    /// Rows whose selected fields were all null.
    pub empty_rows: usize,
    /// Rows written to the error log.
    pub failed_rows: usize,
    /// Index recorded in the final checkpoint.
    pub last_index: i64,
}

struct Plan {
    target: Target,
    columns: Vec<ColumnDescriptor>,
    last_index: i64,
    resuming: bool,
}

impl Plan {
    fn record(&self, last_index: i64) -> CheckpointRecord {
        CheckpointRecord {
            last_index,
            schema: self.target.schema.clone(),
            table: self.target.table.clone(),
            columns: self.columns.clone(),
        }
    }
}

struct Batch {
    rows: Vec<TransformedRow>,
    rejected: Vec<SourceRow>,
    first_row: usize,
    last_row: usize,
}

impl Batch {
    fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            rejected: Vec::new(),
            first_row: 0,
            last_row: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.rejected.is_empty()
    }

    fn track(&mut self, index: usize) {
        if self.is_empty() {
            self.first_row = index;
        }
        self.last_row = index;
    }

    fn push(&mut self, index: usize, row: TransformedRow) {
        self.track(index);
        self.rows.push(row);
    }

    fn reject(&mut self, row: SourceRow) {
        self.track(row.index());
        self.rejected.push(row);
    }

    fn is_full(&self, batch_size: usize) -> bool {
        self.rows.len() >= batch_size || self.rejected.len() >= batch_size
    }
}

pub struct Ingestor<'a, S: ?Sized, P: ?Sized> {
    config: &'a IngestConfig,
    store: &'a mut S,
    prompter: &'a mut P,
    checkpoints: CheckpointStore,
    errors: ErrorSink,
    phase: Phase,
}

impl<'a, S, P> Ingestor<'a, S, P>
where
    S: Store + SchemaCatalog + ?Sized,
    P: Prompter + ?Sized,
{
    pub fn new(
        config: &'a IngestConfig,
        store: &'a mut S,
        prompter: &'a mut P,
        checkpoints: CheckpointStore,
        errors: ErrorSink,
    ) -> Self {
        Self {
            config,
            store,
            prompter,
            checkpoints,
            errors,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run<R: RowSource>(
        &mut self,
        source: R,
        request: &TargetRequest,
    ) -> Result<IngestSummary, IngestError> {
        let result = self.drive(source, request);
        if result.is_err() {
            self.enter(Phase::Failed);
        }
        result
    }

    fn drive<R: RowSource>(
        &mut self,
        source: R,
        request: &TargetRequest,
    ) -> Result<IngestSummary, IngestError> {
        if self.config.batch_size == 0 {
            return Err(IngestError::InvalidBatchSize);
        }
        self.enter(Phase::Init);
        let plan = match self.accepted_checkpoint(request)? {
            Some(record) => self.plan_resume(record, request, source.fields())?,
            None => self.plan_fresh(request, source.fields())?,
        };
        self.enter(Phase::Streaming);
        let summary = self.stream(source, &plan)?;
        self.enter(Phase::Done);
        Ok(summary)
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Ingestion phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// A checkpoint that matches the request and that the operator agreed to
    /// resume from.
    fn accepted_checkpoint(
        &mut self,
        request: &TargetRequest,
    ) -> Result<Option<CheckpointRecord>, IngestError> {
        let loaded = match self.checkpoints.load() {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(err @ IngestError::CheckpointCorruption { .. }) => {
                warn!("{err}; starting from the first row");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let record = match checkpoint::reconcile(
            loaded,
            request.schema.as_deref(),
            request.table.as_deref(),
        ) {
            Reconciliation::Valid(record) => record,
            Reconciliation::Invalid { expected, found } => {
                warn!(
                    "Checkpoint {:?} belongs to {found}, not {expected}; ignoring it",
                    self.checkpoints.path()
                );
                return Ok(None);
            }
        };
        let accepted = self.confirm(
            &format!(
                "Resume loading into {}.{} after row {}?",
                record.schema, record.table, record.last_index
            ),
            true,
        )?;
        if accepted {
            Ok(Some(record))
        } else {
            info!("Checkpoint declined; starting from the first row");
            Ok(None)
        }
    }

    fn plan_resume(
        &mut self,
        record: CheckpointRecord,
        request: &TargetRequest,
        fields: &[String],
    ) -> Result<Plan, IngestError> {
        self.enter(Phase::ResolvingTarget);
        let target = Target {
            schema: record.schema,
            table: record.table,
        };
        target::ensure_target_exists(&mut *self.store, &target)?;

        self.enter(Phase::ValidatingColumns);
        let missing = schema::missing_from_source(&record.columns, fields);
        if !missing.is_empty() {
            return Err(IngestError::SchemaMismatch { missing });
        }
        if record.columns.is_empty() {
            return Err(IngestError::NoColumnsSelected {
                schema: target.schema,
                table: target.table,
            });
        }
        schema::ensure_unique(&record.columns)?;
        let checkpointed = record.columns.iter().map(|c| c.name.as_str()).join(",");
        let requested = request.columns.join(",");
        if !requested.is_empty() && requested != checkpointed {
            warn!(
                "Ignoring requested columns {requested}; resuming with the checkpointed columns {checkpointed}"
            );
        }
        if self.config.clear_before_load {
            warn!("Ignoring clear-table request while resuming from a checkpoint");
        }
        info!("Resuming {target} after row {}", record.last_index);
        Ok(Plan {
            target,
            columns: record.columns,
            last_index: record.last_index,
            resuming: true,
        })
    }

    fn plan_fresh(
        &mut self,
        request: &TargetRequest,
        fields: &[String],
    ) -> Result<Plan, IngestError> {
        self.enter(Phase::ResolvingTarget);
        let (target, table_columns) =
            target::resolve_target(&mut *self.store, &mut *self.prompter, request)?;

        self.enter(Phase::ValidatingColumns);
        let columns = target::select_columns(
            &mut *self.prompter,
            &target,
            &table_columns,
            fields,
            &request.columns,
            self.config.skip_confirmation,
        )?;
        if !self.confirm(
            &format!(
                "Continue with table {} in schema {}?",
                target.table, target.schema
            ),
            false,
        )? {
            return Err(IngestError::Aborted);
        }
        if self.config.clear_before_load {
            info!("Truncating {target}");
            self.store.truncate(&target.schema, &target.table)?;
        }
        Ok(Plan {
            target,
            columns,
            last_index: NOTHING_COMMITTED,
            resuming: false,
        })
    }

    fn stream<R: RowSource>(&mut self, source: R, plan: &Plan) -> Result<IngestSummary, IngestError> {
        info!(
            "Loading {} column(s) into {}{}",
            plan.columns.len(),
            plan.target,
            if plan.resuming {
                format!(" from row {}", plan.last_index + 1)
            } else {
                String::new()
            }
        );
        let mut summary = IngestSummary {
            target: plan.target.clone(),
            columns: plan.columns.clone(),
            resumed_from: plan.resuming.then_some(plan.last_index),
            rows_inserted: 0,
            batches: 0,
            empty_rows: 0,
            failed_rows: 0,
            last_index: plan.last_index,
        };
        let mut batch = Batch::new(self.config.batch_size);
        let remaining = source
            .total_rows()
            .map(|total| total.saturating_sub(plan.record(plan.last_index).resume_at()) as u64);
        self.prompter.start_progress(remaining);

        for item in source {
            let row = item?;
            let index = row.index();
            if i64::try_from(index).is_ok_and(|i| i <= plan.last_index) {
                continue;
            }
            summary.last_index = summary.last_index.max(index as i64);
            match transform::transform_row(&row, &plan.columns) {
                Ok(transformed) if transformed.is_empty() => {
                    debug!("Row {index} has no values for the selected columns; skipped");
                    summary.empty_rows += 1;
                }
                Ok(transformed) => batch.push(index, transformed),
                Err(err) if err.is_row_level() => {
                    warn!("{err}; the row goes to {:?}", self.errors.path());
                    batch.reject(row);
                }
                Err(err) => return Err(err),
            }
            if batch.is_full(self.config.batch_size) {
                self.flush(&mut batch, plan, &mut summary)?;
            }
        }
        self.flush(&mut batch, plan, &mut summary)?;
        self.prompter.finish_progress();

        self.checkpoints.save(&plan.record(summary.last_index))?;
        Ok(summary)
    }

    fn flush(
        &mut self,
        batch: &mut Batch,
        plan: &Plan,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }
        let statement = query::build_insert(
            &batch.rows,
            &plan.columns,
            &plan.target.table,
            &plan.target.schema,
        )?;
        if let Some(statement) = statement {
            self.execute_in_transaction(&statement)
                .map_err(|source| IngestError::BatchExecution {
                    first_row: batch.first_row,
                    last_row: batch.last_row,
                    source,
                })?;
        }
        self.checkpoints.save(&plan.record(batch.last_row as i64))?;
        for row in batch.rejected.drain(..) {
            self.errors.record(&row)?;
            summary.failed_rows += 1;
        }

        if !batch.rows.is_empty() {
            summary.batches += 1;
            summary.rows_inserted += batch.rows.len();
            debug!(
                "Committed rows {}..={} ({} row(s))",
                batch.first_row,
                batch.last_row,
                batch.rows.len()
            );
            batch.rows.clear();
            self.prompter.report_progress(summary.rows_inserted);
        }
        Ok(())
    }

    fn execute_in_transaction(&mut self, statement: &str) -> Result<(), StoreError> {
        self.store.begin()?;
        let outcome = self
            .store
            .execute(statement)
            .and_then(|()| self.store.commit());
        if let Err(err) = outcome {
            if let Err(rollback) = self.store.rollback() {
                warn!("Rollback after failed batch also failed: {rollback}");
            }
            return Err(err);
        }
        Ok(())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, IngestError> {
        if self.config.skip_confirmation {
            return Ok(true);
        }
        self.prompter
            .confirm(prompt, default)
            .map_err(IngestError::Prompt)
    }
}
