//! Service layer for formsync
//!
//! The per-form pipeline between the sessions API and the warehouse:
//! flatten, export, incremental load, and failure notification.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

pub mod error;
mod export;
mod loader;
mod notify;
mod orchestrator;

#[cfg(test)]
mod orchestrator_tests;

pub use error::ServiceError;
pub use export::{ExportFile, ExportWorkspace};
pub use loader::{LoadOutcome, Loader};
pub use notify::{
    LogNotifier, Notification, Notifier, WebhookNotifier, notifier_from_config, send_best_effort,
};
pub use orchestrator::{BatchReport, BatchRunner, BatchSettings, FormReport, FormState, Stage};
