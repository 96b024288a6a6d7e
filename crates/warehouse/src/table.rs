use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::WarehouseError;

/// PostgreSQL truncates longer identifiers silently; reject them instead.
const MAX_IDENTIFIER_BYTES: usize = 63;

/// Fully qualified destination table: `dataset.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub dataset: String,
    pub name: String,
}

impl TableRef {
    /// # Errors
    /// Returns [`WarehouseError::InvalidIdentifier`] when either part is
    /// empty, too long, or contains a NUL byte.
    pub fn new(dataset: &str, name: &str) -> Result<Self, WarehouseError> {
        validate_identifier(dataset)?;
        validate_identifier(name)?;
        Ok(Self { dataset: dataset.to_owned(), name: name.to_owned() })
    }

    /// Quoted `"dataset"."name"` for SQL.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.dataset), quote_ident(&self.name))
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{}", self.dataset, self.name)
    }
}

fn validate_identifier(ident: &str) -> Result<(), WarehouseError> {
    if ident.is_empty() || ident.len() > MAX_IDENTIFIER_BYTES || ident.contains('\0') {
        return Err(WarehouseError::InvalidIdentifier(ident.to_owned()));
    }
    Ok(())
}

/// Double-quote an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
