//! Resolving the target table and choosing which of its columns to load.

use std::fmt;

use log::{info, warn};

use crate::{
    error::IngestError,
    prompt::Prompter,
    schema::{self, ColumnDescriptor, ColumnReport},
    store::SchemaCatalog,
};

/// What the caller asked for before any interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRequest {
    pub schema: Option<String>,
    pub table: Option<String>,
    /// Pre-selected column names; empty means choose interactively.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub schema: String,
    pub table: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Picks schema and table (validating any requested ones) and reads the
/// table's columns.
pub fn resolve_target<C, P>(
    catalog: &mut C,
    prompter: &mut P,
    request: &TargetRequest,
) -> Result<(Target, Vec<ColumnDescriptor>), IngestError>
where
    C: SchemaCatalog + ?Sized,
    P: Prompter + ?Sized,
{
    let unresolved = |schema: &str, table: &str, reason: String| IngestError::TargetResolution {
        schema: schema.to_string(),
        table: table.to_string(),
        reason,
    };
    let wanted_table = request.table.as_deref().unwrap_or("?");

    let schemas = catalog.schemas()?;
    let schema = match &request.schema {
        Some(schema) if schemas.contains(schema) => schema.clone(),
        Some(schema) => {
            return Err(unresolved(schema, wanted_table, "schema does not exist".into()));
        }
        None if schemas.is_empty() => {
            return Err(unresolved("?", wanted_table, "no user schemas to choose from".into()));
        }
        None => {
            let idx = prompter
                .select_one("Select schema:", &schemas)
                .map_err(IngestError::Prompt)?;
            schemas[idx].clone()
        }
    };

    let tables = catalog.tables(&schema)?;
    let table = match &request.table {
        Some(table) if tables.contains(table) => table.clone(),
        Some(table) => {
            return Err(unresolved(&schema, table, "table does not exist".into()));
        }
        None if tables.is_empty() => {
            return Err(unresolved(&schema, "?", "schema has no tables to choose from".into()));
        }
        None => {
            let idx = prompter
                .select_one(&format!("Select table in {schema}:"), &tables)
                .map_err(IngestError::Prompt)?;
            tables[idx].clone()
        }
    };

    let columns = catalog.columns(&schema, &table)?;
    if columns.is_empty() {
        return Err(unresolved(&schema, &table, "table has no columns".into()));
    }
    Ok((Target { schema, table }, columns))
}

/// Confirms that a previously chosen target still exists in the catalog.
pub fn ensure_target_exists<C>(catalog: &mut C, target: &Target) -> Result<(), IngestError>
where
    C: SchemaCatalog + ?Sized,
{
    let reason = if !catalog.schemas()?.contains(&target.schema) {
        "schema does not exist"
    } else if !catalog.tables(&target.schema)?.contains(&target.table) {
        "table does not exist"
    } else {
        return Ok(());
    };
    Err(IngestError::TargetResolution {
        schema: target.schema.clone(),
        table: target.table.clone(),
        reason: reason.into(),
    })
}

/// Reports how the table and the source line up, then settles the column
/// selection from `requested` names or through the prompter.
pub fn select_columns<P>(
    prompter: &mut P,
    target: &Target,
    table_columns: &[ColumnDescriptor],
    fields: &[String],
    requested: &[String],
    accept_defaults: bool,
) -> Result<Vec<ColumnDescriptor>, IngestError>
where
    P: Prompter + ?Sized,
{
    let report = ColumnReport::compare(table_columns, fields);
    if !report.missing.is_empty() {
        info!(
            "{} column(s) of {target} missing from source: {}",
            report.missing.len(),
            report.missing.join(" | ")
        );
    }
    if !report.extra.is_empty() {
        info!(
            "{} source field(s) not in {target}: {}",
            report.extra.len(),
            report.extra.join(" | ")
        );
    }

    let selected = if !requested.is_empty() {
        let picked = requested
            .iter()
            .map(|name| {
                table_columns
                    .iter()
                    .find(|c| &c.name == name)
                    .cloned()
                    .ok_or_else(|| IngestError::TargetResolution {
                        schema: target.schema.clone(),
                        table: target.table.clone(),
                        reason: format!("column '{name}' does not exist"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for name in schema::missing_from_source(&picked, fields) {
            warn!("Selected column '{name}' is not in the source; it will be loaded as NULL");
        }
        picked
    } else if accept_defaults {
        report.candidates
    } else if report.candidates.is_empty() {
        Vec::new()
    } else {
        let names: Vec<String> = report.candidates.iter().map(|c| c.to_string()).collect();
        prompter
            .select_many("Select columns to insert:", &names)
            .map_err(IngestError::Prompt)?
            .into_iter()
            .filter_map(|idx| report.candidates.get(idx).cloned())
            .collect()
    };

    if selected.is_empty() {
        return Err(IngestError::NoColumnsSelected {
            schema: target.schema.clone(),
            table: target.table.clone(),
        });
    }
    schema::ensure_unique(&selected)?;
    Ok(selected)
}
