//! Core types for formsync
//!
//! Domain types shared by the fetcher, the warehouse layer and the batch
//! orchestrator: sessions, their flat projection, the two warehouse schema
//! variants and the run configuration.

pub mod constants;
mod config;
pub mod env_config;
mod error;
mod flatten;
mod form;
pub mod schema;
mod session;
pub mod tabular;

pub use config::*;
pub use error::*;
pub use flatten::*;
pub use form::*;
pub use schema::{ColumnSpec, ColumnType, SchemaVariant, TableSchema, select_schema};
pub use session::*;
pub use tabular::{FlatRecord, RowBatch};
