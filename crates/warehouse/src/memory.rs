//! In-process warehouse used for dry runs and tests.
//!
//! Mirrors the Postgres backend's observable behavior: tables must be created
//! before use, unknown columns are rejected, empty cells are NULL and a row
//! whose id is already stored is silently skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use formsync_core::schema::IDENTITY_COLUMN;
use formsync_core::{RowBatch, SchemaVariant, TableSchema};

use crate::error::WarehouseError;
use crate::table::TableRef;
use crate::traits::Warehouse;

/// One stored row: column → value, `None` for NULL.
pub type StoredRow = BTreeMap<String, Option<String>>;

#[derive(Debug)]
struct MemTable {
    schema: TableSchema,
    rows: Vec<StoredRow>,
    ids: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    tables: Mutex<HashMap<TableRef, MemTable>>,
}

impl MemoryWarehouse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TableRef, MemTable>>, WarehouseError> {
        self.tables.lock().map_err(|_| WarehouseError::Poisoned)
    }

    /// Schema variant a table was created with.
    pub fn variant_of(&self, table: &TableRef) -> Option<SchemaVariant> {
        self.lock().ok()?.get(table).map(|t| t.schema.variant)
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &TableRef) -> Vec<StoredRow> {
        self.lock()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.rows.clone()))
            .unwrap_or_default()
    }

    /// Stored ids, sorted.
    pub fn ids(&self, table: &TableRef) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.ids.iter().cloned().collect()))
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn table_count(&self) -> usize {
        self.lock().map(|tables| tables.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        Ok(self.lock()?.contains_key(table))
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        let mut tables = self.lock()?;
        if tables.contains_key(table) {
            return Err(WarehouseError::TableExists(table.to_string()));
        }
        tables.insert(
            table.clone(),
            MemTable { schema: *schema, rows: Vec::new(), ids: HashSet::new() },
        );
        Ok(())
    }

    async fn table_columns(&self, table: &TableRef) -> Result<Vec<String>, WarehouseError> {
        let tables = self.lock()?;
        let stored =
            tables.get(table).ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;
        Ok(stored.schema.columns.iter().map(|c| c.name.to_owned()).collect())
    }

    async fn existing_ids(
        &self,
        table: &TableRef,
        candidates: &[String],
    ) -> Result<HashSet<String>, WarehouseError> {
        let tables = self.lock()?;
        let stored =
            tables.get(table).ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;
        Ok(candidates.iter().filter(|id| stored.ids.contains(*id)).cloned().collect())
    }

    async fn load_rows(
        &self,
        table: &TableRef,
        batch: &RowBatch,
    ) -> Result<usize, WarehouseError> {
        let mut tables = self.lock()?;
        let stored =
            tables.get_mut(table).ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;

        if let Some(unknown) = batch.columns.iter().find(|c| !stored.schema.contains(c)) {
            return Err(WarehouseError::UnknownColumn {
                table: table.to_string(),
                column: unknown.clone(),
            });
        }
        let id_index = batch.column_index(IDENTITY_COLUMN);

        let mut inserted = 0;
        for row in &batch.rows {
            if let Some(id) = id_index.and_then(|i| row.get(i)) {
                if !stored.ids.insert(id.clone()) {
                    continue;
                }
            }
            let mut values: StoredRow =
                stored.schema.columns.iter().map(|c| (c.name.to_owned(), None)).collect();
            for (column, cell) in batch.columns.iter().zip(row) {
                values.insert(column.clone(), (!cell.is_empty()).then(|| cell.clone()));
            }
            stored.rows.push(values);
            inserted += 1;
        }
        Ok(inserted)
    }
}
