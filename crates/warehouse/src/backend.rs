//! Unified warehouse backend with enum dispatch.

use std::collections::HashSet;

use async_trait::async_trait;
use formsync_core::{RowBatch, TableSchema};

use crate::error::WarehouseError;
use crate::memory::MemoryWarehouse;
use crate::table::TableRef;
use crate::traits::Warehouse;

macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            #[cfg(feature = "postgres")]
            WarehouseBackend::Postgres(w) => {
                <crate::pg_warehouse::PgWarehouse as Warehouse>::$method(w, $($arg),*).await
            },
            WarehouseBackend::Memory(w) => {
                <MemoryWarehouse as Warehouse>::$method(w, $($arg),*).await
            },
        }
    };
}

#[derive(Debug)]
pub enum WarehouseBackend {
    #[cfg(feature = "postgres")]
    Postgres(crate::pg_warehouse::PgWarehouse),
    Memory(MemoryWarehouse),
}

impl WarehouseBackend {
    #[cfg(feature = "postgres")]
    pub async fn new_postgres(database_url: &str) -> Result<Self, WarehouseError> {
        Ok(Self::Postgres(crate::pg_warehouse::PgWarehouse::new(database_url).await?))
    }

    #[must_use]
    pub fn new_memory() -> Self {
        Self::Memory(MemoryWarehouse::new())
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl Warehouse for WarehouseBackend {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        dispatch!(self, table_exists(table))
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        dispatch!(self, create_table(table, schema))
    }

    async fn table_columns(&self, table: &TableRef) -> Result<Vec<String>, WarehouseError> {
        dispatch!(self, table_columns(table))
    }

    async fn existing_ids(
        &self,
        table: &TableRef,
        candidates: &[String],
    ) -> Result<HashSet<String>, WarehouseError> {
        dispatch!(self, existing_ids(table, candidates))
    }

    async fn load_rows(&self, table: &TableRef, batch: &RowBatch) -> Result<usize, WarehouseError> {
        dispatch!(self, load_rows(table, batch))
    }
}
