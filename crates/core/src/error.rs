use std::io;
use std::result::Result as StdResult;

use thiserror::Error;

/// Errors raised while assembling the run configuration or the form registry.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    #[error("invalid form registry: {0}")]
    InvalidForms(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = StdResult<T, CoreError>;
