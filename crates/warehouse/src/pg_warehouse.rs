//! PostgreSQL warehouse backend using sqlx.
//!
//! The dataset maps to a Postgres schema and every form to one table in it.
//! Cells arrive as text and are cast to the column type on insert.

use std::collections::HashSet;

use async_trait::async_trait;
use formsync_core::constants::{
    LOAD_CHUNK_ROWS, PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS,
};
use formsync_core::schema::IDENTITY_COLUMN;
use formsync_core::{RowBatch, TableSchema};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::WarehouseError;
use crate::table::{TableRef, quote_ident};
use crate::traits::Warehouse;

#[derive(Clone, Debug)]
pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    pub async fn new(database_url: &str) -> Result<Self, WarehouseError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        tracing::info!("PgWarehouse initialized");
        Ok(Self { pool })
    }

    /// `(column, data_type)` pairs of a table in ordinal order.
    async fn column_types(
        &self,
        table: &TableRef,
    ) -> Result<Vec<(String, String)>, WarehouseError> {
        let rows = sqlx::query(
            "SELECT column_name::text AS column_name, data_type::text AS data_type
             FROM information_schema.columns
             WHERE table_schema = $1 AND table_name = $2
             ORDER BY ordinal_position",
        )
        .bind(&table.dataset)
        .bind(&table.name)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(WarehouseError::TableNotFound(table.to_string()));
        }
        rows.iter()
            .map(|r| -> Result<(String, String), WarehouseError> {
                Ok((r.try_get("column_name")?, r.try_get("data_type")?))
            })
            .collect()
    }
}

/// `CREATE TABLE` statement for a schema descriptor; `id` becomes the primary key.
#[must_use]
pub fn create_table_sql(table: &TableRef, schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(c.name), c.column_type.sql_type());
            if c.name == IDENTITY_COLUMN {
                def.push_str(" PRIMARY KEY");
            } else if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();
    format!("CREATE TABLE {} ({})", table.quoted(), columns.join(", "))
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        let row = sqlx::query(
            "SELECT EXISTS (
                 SELECT 1 FROM information_schema.tables
                 WHERE table_schema = $1 AND table_name = $2
             ) AS present",
        )
        .bind(&table.dataset)
        .bind(&table.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<bool, _>("present")?)
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&table.dataset)))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create_table_sql(table, schema)).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn table_columns(&self, table: &TableRef) -> Result<Vec<String>, WarehouseError> {
        Ok(self.column_types(table).await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn existing_ids(
        &self,
        table: &TableRef,
        candidates: &[String],
    ) -> Result<HashSet<String>, WarehouseError> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {id} FROM {table} WHERE {id} = ANY($1)",
            id = quote_ident(IDENTITY_COLUMN),
            table = table.quoted(),
        ))
        .bind(candidates)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| -> Result<String, WarehouseError> { Ok(r.try_get(0)?) })
            .collect()
    }

    async fn load_rows(&self, table: &TableRef, batch: &RowBatch) -> Result<usize, WarehouseError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let types = self.column_types(table).await?;
        let mut casts = Vec::with_capacity(batch.columns.len());
        for column in &batch.columns {
            let data_type = types
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, data_type)| data_type.clone())
                .ok_or_else(|| WarehouseError::UnknownColumn {
                    table: table.to_string(),
                    column: column.clone(),
                })?;
            casts.push(data_type);
        }
        let column_list =
            batch.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");

        let mut tx = self.pool.begin().await?;
        let mut inserted: u64 = 0;
        for chunk in batch.rows.chunks(LOAD_CHUNK_ROWS) {
            let mut builder: QueryBuilder<'_, Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} ({column_list}) ", table.quoted()));
            builder.push_values(chunk, |mut values, row| {
                for (cell, data_type) in row.iter().zip(&casts) {
                    values
                        .push("CAST(NULLIF(")
                        .push_bind_unseparated(cell.clone())
                        .push_unseparated(format!(", '') AS {data_type})"));
                }
            });
            builder.push(" ON CONFLICT DO NOTHING");
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        Ok(usize::try_from(inserted).unwrap_or(usize::MAX))
    }
}
