//! Warehouse trait abstraction
//!
//! The four operations the loader needs from a columnar warehouse. Tables are
//! append-only: there is no update and no delete.

use std::collections::HashSet;

use async_trait::async_trait;
use formsync_core::{RowBatch, TableSchema};

use crate::error::WarehouseError;
use crate::table::TableRef;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// `Ok(false)` only when the table is positively absent; any other lookup
    /// failure is an error.
    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError>;

    /// Create the table (and its dataset if needed) with a fixed schema.
    async fn create_table(&self, table: &TableRef, schema: &TableSchema)
    -> Result<(), WarehouseError>;

    /// Column names of an existing table, in table order.
    async fn table_columns(&self, table: &TableRef) -> Result<Vec<String>, WarehouseError>;

    /// The subset of `candidates` already stored in the table's `id` column.
    async fn existing_ids(
        &self,
        table: &TableRef,
        candidates: &[String],
    ) -> Result<HashSet<String>, WarehouseError>;

    /// Append rows. Every batch column must exist in the table; empty cells
    /// load as NULL. Returns the number of rows inserted.
    async fn load_rows(&self, table: &TableRef, batch: &RowBatch) -> Result<usize, WarehouseError>;
}
