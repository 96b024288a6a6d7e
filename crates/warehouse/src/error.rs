//! Typed error enum for the warehouse layer.
//!
//! Keeps "the table is not there" apart from every other failure, so a
//! connectivity or permission problem is never mistaken for a missing table.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The warehouse positively reported the table as absent.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Create was attempted on an existing table.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// Dataset or table name that cannot be used as an identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A loaded column is not part of the table.
    #[error("column {column} is not part of table {table}")]
    UnknownColumn { table: String, column: String },

    /// SQL / connection / timeout failure.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// In-memory state is unusable after a panic in another holder.
    #[error("warehouse state poisoned")]
    Poisoned,
}

impl WarehouseError {
    /// Whether this error is a genuine "table does not exist" signal.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }
}

/// SQLSTATE 42P01 → `TableNotFound`, 42P07 → `TableExists`, everything else
/// → `Database`.
#[cfg(feature = "postgres")]
impl From<sqlx::Error> for WarehouseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().is_some_and(|c| c == "42P01") => {
                Self::TableNotFound(db_err.message().to_owned())
            },
            sqlx::Error::Database(db_err) if db_err.code().is_some_and(|c| c == "42P07") => {
                Self::TableExists(db_err.message().to_owned())
            },
            _ => Self::Database(err),
        }
    }
}
