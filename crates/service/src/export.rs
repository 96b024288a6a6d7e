//! Tabular export of flattened sessions to per-form CSV files.
//!
//! One file per form at `<dir>/sessions_<form>.csv`: a sorted, normalized
//! header and one row per session, every field quoted. The file only lives
//! for the duration of a form's run; [`ExportFile`] removes it when dropped.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use formsync_core::{FlatRecord, FormTarget, RowBatch};
use tracing::{debug, info, warn};

use crate::error::ServiceError;

const FILE_PREFIX: &str = "sessions_";
const FILE_EXTENSION: &str = "csv";

/// Directory holding the per-form export files.
#[derive(Debug, Clone)]
pub struct ExportWorkspace {
    dir: PathBuf,
}

impl ExportWorkspace {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic export path for a form. Path separators in the name are
    /// replaced so the file always lands directly inside the workspace.
    #[must_use]
    pub fn export_path(&self, form_name: &str) -> PathBuf {
        let safe = form_name.replace(['/', '\\'], "_");
        self.dir.join(format!("{FILE_PREFIX}{safe}.{FILE_EXTENSION}"))
    }

    /// Write the records of one form. Zero records writes nothing and
    /// returns `Ok(None)`.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written. A
    /// partially written file is removed before returning.
    pub fn export(
        &self,
        form_name: &str,
        records: &[FlatRecord],
    ) -> Result<Option<ExportFile>, ServiceError> {
        if records.is_empty() {
            info!(form = %form_name, "no sessions, nothing to export");
            return Ok(None);
        }

        let batch = RowBatch::from_flat_records(records);
        fs::create_dir_all(&self.dir)?;

        let file = ExportFile {
            path: self.export_path(form_name),
            rows: batch.len(),
            columns: batch.columns.len(),
        };
        let mut writer =
            WriterBuilder::new().quote_style(QuoteStyle::Always).from_path(&file.path)?;
        writer.write_record(&batch.columns)?;
        for row in &batch.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        info!(
            form = %form_name,
            rows = file.rows,
            columns = file.columns,
            path = %file.path.display(),
            "CSV saved"
        );
        Ok(Some(file))
    }

    /// Remove one form's export file if present. Returns whether a file was
    /// deleted.
    ///
    /// # Errors
    /// Returns any I/O error other than "not found".
    pub fn purge(&self, form_name: &str) -> Result<bool, ServiceError> {
        match fs::remove_file(self.export_path(form_name)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove the export files of every listed form. Failures are logged and
    /// never abort the batch. Returns the number of files deleted.
    pub fn purge_all<'a>(&self, forms: impl IntoIterator<Item = &'a FormTarget>) -> usize {
        let mut removed = 0;
        for form in forms {
            match self.purge(&form.name) {
                Ok(true) => {
                    debug!(form = %form.name, "removed stale export file");
                    removed += 1;
                },
                Ok(false) => {},
                Err(e) => warn!(form = %form.name, error = %e, "failed to remove export file"),
            }
        }
        removed
    }
}

/// A written export file. Deleting the file is tied to this value's
/// lifetime, so every exit path of a form's run cleans up.
#[derive(Debug)]
#[must_use = "dropping the guard deletes the export file"]
pub struct ExportFile {
    path: PathBuf,
    rows: usize,
    columns: usize,
}

impl ExportFile {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }
}

impl Drop for ExportFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "export file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove export file");
            },
        }
    }
}
