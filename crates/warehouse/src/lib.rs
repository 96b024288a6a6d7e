//! Warehouse layer for formsync
//!
//! One append-only table per form inside a dataset. PostgreSQL in production,
//! an in-memory backend for dry runs and tests.

mod backend;
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod pg_warehouse;
mod table;
mod traits;

pub use backend::WarehouseBackend;
pub use error::WarehouseError;
pub use memory::{MemoryWarehouse, StoredRow};
#[cfg(feature = "postgres")]
pub use pg_warehouse::{PgWarehouse, create_table_sql};
pub use table::{TableRef, quote_ident};
pub use traits::Warehouse;
