//! Run configuration, read once at startup and threaded through every stage.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_DATASET, DEFAULT_EXPORT_DIR, DEFAULT_FORMS_FILE,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_NOTIFY_TAG,
};
use crate::env_config::{non_blank, parse_with_default};
use crate::error::{CoreError, Result};

/// Where failure notifications go. Built independently of [`RunConfig`] so a
/// configuration error can itself be reported.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NotifyConfig {
    pub recipients: Vec<String>,
    /// Mail relay endpoint; `None` means notifications are only logged.
    pub webhook_url: Option<String>,
    pub tag: String,
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("recipients", &self.recipients)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "***"))
            .field("tag", &self.tag)
            .finish()
    }
}

impl NotifyConfig {
    /// Best-effort read; never fails.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            recipients: lookup("RECEIVER").map(|r| parse_recipients(&r)).unwrap_or_default(),
            webhook_url: non_blank(lookup("FORMSYNC_NOTIFY_URL")),
            tag: non_blank(lookup("FORMSYNC_NOTIFY_TAG"))
                .unwrap_or_else(|| DEFAULT_NOTIFY_TAG.to_owned()),
        }
    }
}

/// Everything a batch run needs; required items fail fast.
#[derive(Clone)]
pub struct RunConfig {
    pub days_back: u32,
    pub api_key: String,
    pub api_url: String,
    /// Warehouse connection string; only a run that loads into Postgres needs it.
    pub database_url: Option<String>,
    pub dataset: String,
    pub export_dir: PathBuf,
    pub forms_file: PathBuf,
    pub http_timeout: Duration,
    pub notify: NotifyConfig,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("days_back", &self.days_back)
            .field("api_key", &"***")
            .field("api_url", &self.api_url)
            .field("database_url", &self.database_url.as_ref().map(|_| "***"))
            .field("dataset", &self.dataset)
            .field("export_dir", &self.export_dir)
            .field("forms_file", &self.forms_file)
            .field("http_timeout", &self.http_timeout)
            .field("notify", &self.notify)
            .finish()
    }
}

impl RunConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`CoreError::MissingConfig`] for an absent required variable and
    /// [`CoreError::InvalidConfig`] for a malformed one.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`RunConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required =
            |var: &'static str| non_blank(lookup(var)).ok_or(CoreError::MissingConfig(var));

        let days_raw = required("DAYS_BACK")?;
        let days_back = days_raw.parse::<u32>().map_err(|e| CoreError::InvalidConfig {
            var: "DAYS_BACK",
            reason: format!("{days_raw:?} is not a non-negative integer ({e})"),
        })?;

        let recipients = parse_recipients(&required("RECEIVER")?);
        if recipients.is_empty() {
            return Err(CoreError::InvalidConfig {
                var: "RECEIVER",
                reason: "no recipient addresses".to_owned(),
            });
        }

        let api_key = required("ZUKO_API_KEY")?;

        let timeout_secs = parse_with_default(
            "FORMSYNC_HTTP_TIMEOUT_SECS",
            lookup("FORMSYNC_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        );

        Ok(Self {
            days_back,
            api_key,
            api_url: non_blank(lookup("ZUKO_API_URL"))
                .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            database_url: non_blank(lookup("DATABASE_URL")),
            dataset: non_blank(lookup("FORMSYNC_DATASET"))
                .unwrap_or_else(|| DEFAULT_DATASET.to_owned()),
            export_dir: non_blank(lookup("FORMSYNC_EXPORT_DIR"))
                .map_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR), PathBuf::from),
            forms_file: non_blank(lookup("FORMSYNC_FORMS_FILE"))
                .map_or_else(|| PathBuf::from(DEFAULT_FORMS_FILE), PathBuf::from),
            http_timeout: Duration::from_secs(timeout_secs),
            notify: NotifyConfig {
                recipients,
                webhook_url: non_blank(lookup("FORMSYNC_NOTIFY_URL")),
                tag: non_blank(lookup("FORMSYNC_NOTIFY_TAG"))
                    .unwrap_or_else(|| DEFAULT_NOTIFY_TAG.to_owned()),
            },
        })
    }

    /// The warehouse connection string, for runs that connect to one.
    ///
    /// # Errors
    /// Returns [`CoreError::MissingConfig`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or(CoreError::MissingConfig("DATABASE_URL"))
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|r| !r.is_empty()).map(str::to_owned).collect()
}
