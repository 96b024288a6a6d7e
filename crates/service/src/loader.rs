//! Incremental loader: export file → per-form warehouse table.
//!
//! A missing table is created from one of the two schema descriptors and
//! receives every row. An existing table receives only rows whose `id` is not
//! stored yet, so repeated runs over overlapping windows never duplicate.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use formsync_core::schema::IDENTITY_COLUMN;
use formsync_core::{RowBatch, SchemaVariant, select_schema};
use formsync_warehouse::{TableRef, Warehouse};
use tracing::{info, warn};

use crate::error::ServiceError;

/// What a load did to the form's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No export file; nothing was fetched for the form.
    NoFile,
    /// Table was missing and has been created with `variant`.
    Created { variant: SchemaVariant, inserted: usize },
    /// Table existed; only unseen ids were appended.
    Appended { inserted: usize, already_stored: usize },
    /// Every id in the file is already stored.
    UpToDate,
}

impl LoadOutcome {
    #[must_use]
    pub const fn inserted(&self) -> usize {
        match self {
            Self::Created { inserted, .. } | Self::Appended { inserted, .. } => *inserted,
            Self::NoFile | Self::UpToDate => 0,
        }
    }
}

pub struct Loader {
    warehouse: Arc<dyn Warehouse>,
    dataset: String,
}

impl Loader {
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>, dataset: impl Into<String>) -> Self {
        Self { warehouse, dataset: dataset.into() }
    }

    /// Destination table of a form: `<dataset>.<form name>`.
    pub fn table_for(&self, form_name: &str) -> Result<TableRef, ServiceError> {
        Ok(TableRef::new(&self.dataset, form_name)?)
    }

    pub async fn load_form(
        &self,
        form_name: &str,
        path: &Path,
    ) -> Result<LoadOutcome, ServiceError> {
        let table = self.table_for(form_name)?;
        let Some(batch) = read_export(path)? else {
            info!(form = %form_name, "no export file, nothing to load");
            return Ok(LoadOutcome::NoFile);
        };
        let id_index = batch.column_index(IDENTITY_COLUMN).ok_or_else(|| {
            ServiceError::InvalidExport {
                path: path.to_path_buf(),
                reason: format!("missing `{IDENTITY_COLUMN}` column"),
            }
        })?;
        let batch = unique_ids(&batch, id_index, form_name);
        if batch.is_empty() {
            info!(form = %form_name, "export file has no loadable rows");
            return Ok(LoadOutcome::UpToDate);
        }

        if self.warehouse.table_exists(&table).await? {
            info!(form = %form_name, table = %table, "table found");
            let candidates: Vec<String> = batch
                .rows
                .iter()
                .map(|row| row.get(id_index).cloned().unwrap_or_default())
                .collect();
            let existing = self.warehouse.existing_ids(&table, &candidates).await?;
            let fresh = batch.filter_rows(id_index, |id| !existing.contains(id));
            if fresh.is_empty() {
                info!(form = %form_name, "no new records");
                return Ok(LoadOutcome::UpToDate);
            }
            let inserted = self.insert(&table, &fresh, form_name).await?;
            info!(form = %form_name, inserted, "loaded {inserted} records");
            Ok(LoadOutcome::Appended { inserted, already_stored: existing.len() })
        } else {
            let variant = select_schema(batch.columns.as_slice());
            self.warehouse.create_table(&table, &variant.schema()).await?;
            info!(form = %form_name, table = %table, schema = %variant, "table created");
            let inserted = self.insert(&table, &batch, form_name).await?;
            info!(form = %form_name, inserted, "loaded {inserted} records");
            Ok(LoadOutcome::Created { variant, inserted })
        }
    }

    async fn insert(
        &self,
        table: &TableRef,
        batch: &RowBatch,
        form_name: &str,
    ) -> Result<usize, ServiceError> {
        let table_columns = self.warehouse.table_columns(table).await?;
        let projected = project(batch, &table_columns, form_name);
        Ok(self.warehouse.load_rows(table, &projected).await?)
    }
}

/// Read an export file into a text batch; `Ok(None)` when it does not exist.
fn read_export(path: &Path) -> Result<Option<RowBatch>, ServiceError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_owned).collect());
    }
    Ok(Some(RowBatch { columns, rows }))
}

/// Drop rows with an empty id and rows repeating an id seen earlier in the
/// same batch.
fn unique_ids(batch: &RowBatch, id_index: usize, form_name: &str) -> RowBatch {
    let mut seen = HashSet::new();
    let mut blank = 0_usize;
    let mut repeated = 0_usize;
    let kept = batch.filter_rows(id_index, |id| {
        if id.is_empty() {
            blank += 1;
            false
        } else if seen.insert(id.to_owned()) {
            true
        } else {
            repeated += 1;
            false
        }
    });
    if blank > 0 {
        warn!(form = %form_name, rows = blank, "skipping rows without an id");
    }
    if repeated > 0 {
        warn!(form = %form_name, rows = repeated, "skipping rows repeating an id");
    }
    kept
}

/// Keep only the batch columns the table has, in batch order.
fn project(batch: &RowBatch, table_columns: &[String], form_name: &str) -> RowBatch {
    let keep: Vec<usize> = batch
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| table_columns.contains(*c))
        .map(|(i, _)| i)
        .collect();
    if keep.len() == batch.columns.len() {
        return batch.clone();
    }

    let dropped: Vec<&str> = batch
        .columns
        .iter()
        .filter(|c| !table_columns.contains(*c))
        .map(String::as_str)
        .collect();
    warn!(form = %form_name, columns = ?dropped, "dropping columns the table does not have");

    RowBatch {
        columns: keep.iter().map(|&i| batch.columns[i].clone()).collect(),
        rows: batch
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row.get(i).cloned().unwrap_or_default()).collect())
            .collect(),
    }
}
