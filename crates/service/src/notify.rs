//! Failure notifications.
//!
//! A notification is a subject plus a body addressed to the configured
//! recipients. Delivery is fire-and-forget: the batch never fails because a
//! notification could not be sent.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use formsync_core::NotifyConfig;
use formsync_core::constants::FAILURE_SUBJECT;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// One form failed; the batch went on.
    #[must_use]
    pub fn form_failure(tag: &str, form_name: &str, err: &dyn Display) -> Self {
        Self {
            subject: FAILURE_SUBJECT.to_owned(),
            body: format!("[{tag}] Error in form {form_name}: {err}"),
        }
    }

    /// The batch could not run at all.
    #[must_use]
    pub fn batch_failure(tag: &str, err: &dyn Display) -> Self {
        Self { subject: FAILURE_SUBJECT.to_owned(), body: format!("[{tag}] Error: {err}") }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError>;
}

/// Send and swallow the outcome; a failed delivery is only logged.
pub async fn send_best_effort(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.notify(notification).await {
        warn!(error = %e, subject = %notification.subject, "failed to send notification");
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    recipients: Vec<String>,
}

impl LogNotifier {
    #[must_use]
    pub const fn new(recipients: Vec<String>) -> Self {
        Self { recipients }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        error!(
            recipients = ?self.recipients,
            subject = %notification.subject,
            body = %notification.body,
            "failure notification"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
    recipients: &'a [String],
}

/// Posts notifications as JSON to a mail relay endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    recipients: Vec<String>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}

impl WebhookNotifier {
    pub fn new(
        url: impl Into<String>,
        recipients: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Notify(format!("client build failed: {e}")))?;
        Ok(Self { client, url: url.into(), recipients })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        let payload = WebhookPayload {
            subject: &notification.subject,
            body: &notification.body,
            recipients: &self.recipients,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Notify(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Notify(format!("HTTP {}: {body}", status.as_u16())));
        }
        info!(recipients = self.recipients.len(), "notification sent");
        Ok(())
    }
}

/// Webhook delivery when a relay URL is configured, log-only otherwise.
pub fn notifier_from_config(
    config: &NotifyConfig,
    timeout: Duration,
) -> Result<Arc<dyn Notifier>, ServiceError> {
    match &config.webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(url.clone(), config.recipients.clone(), timeout)?;
            Ok(Arc::new(notifier))
        },
        None => Ok(Arc::new(LogNotifier::new(config.recipients.clone()))),
    }
}
