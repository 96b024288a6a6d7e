//! Typed error enum for the service layer.
//!
//! Unifies upstream, warehouse, file and notification failures so the orchestrator can
//! report a form failure without downcasting.

use std::path::PathBuf;

use formsync_upstream::UpstreamError;
use formsync_warehouse::WarehouseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Session fetch failed (transport, status, body, pagination).
    #[error("upstream: {0}")]
    Upstream(#[from] UpstreamError),

    /// Table lookup, creation or load failed.
    #[error("warehouse: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Export file could not be written or parsed.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Export file is readable but unusable (e.g. no `id` column).
    #[error("invalid export {}: {reason}", path.display())]
    InvalidExport { path: PathBuf, reason: String },

    /// Notification delivery failed.
    #[error("notify: {0}")]
    Notify(String),
}
