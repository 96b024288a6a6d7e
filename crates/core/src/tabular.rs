//! Tabular projection helpers: column-name normalization, the sorted column
//! union of a batch and text coercion of cell values.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single-level record keyed by column name.
pub type FlatRecord = BTreeMap<String, Value>;

/// Column name with spaces and hyphens replaced by underscores.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    name.replace([' ', '-'], "_")
}

/// Rename every key of `record` to its normalized form.
///
/// When two raw keys normalize to the same column, the one sorting last wins.
#[must_use]
pub fn normalize_record(record: &FlatRecord) -> FlatRecord {
    record.iter().map(|(k, v)| (normalize_column_name(k), v.clone())).collect()
}

/// Sorted union of the normalized column names of every record.
#[must_use]
pub fn column_union<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a FlatRecord>,
{
    let columns: BTreeSet<String> =
        records.into_iter().flat_map(|r| r.keys().map(|k| normalize_column_name(k))).collect();
    columns.into_iter().collect()
}

/// Text form of a cell: null becomes the empty string, strings stay verbatim,
/// nested values are rendered as JSON.
#[must_use]
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Text-only table: a header plus rows aligned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowBatch {
    /// Normalize, take the column union, and coerce every value to text.
    /// Missing cells become empty strings.
    #[must_use]
    pub fn from_flat_records(records: &[FlatRecord]) -> Self {
        let normalized: Vec<FlatRecord> = records.iter().map(normalize_record).collect();
        let columns = column_union(&normalized);
        let rows = normalized
            .iter()
            .map(|record| {
                columns.iter().map(|c| record.get(c).map(cell_text).unwrap_or_default()).collect()
            })
            .collect();
        Self { columns, rows }
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rows whose value in `column` satisfies `keep`, same header.
    #[must_use]
    pub fn filter_rows(&self, column: usize, mut keep: impl FnMut(&str) -> bool) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|row| keep(row.get(column).map_or("", String::as_str)))
            .cloned()
            .collect();
        Self { columns: self.columns.clone(), rows }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
