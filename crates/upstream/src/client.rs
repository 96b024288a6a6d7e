use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use formsync_core::constants::{API_KEY_HEADER, SESSION_INCLUDES};
use formsync_core::{FormTarget, Session, TimeWindow};

use crate::error::UpstreamError;
use crate::wire_types::SessionPage;

/// Source of raw sessions for one form and time window.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Every session of `form` inside `window`, pages concatenated in order.
    async fn fetch_sessions(
        &self,
        form: &FormTarget,
        window: &TimeWindow,
    ) -> Result<Vec<Session>, UpstreamError>;
}

/// Client for the sessions egress API.
pub struct SessionsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for SessionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionsClient")
            .field("client", &self.client)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SessionsClient {
    /// Creates a client with the given API key, base URL and per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::ClientInit(e.to_string()))?;
        Ok(Self { client, api_key, base_url })
    }

    /// Fetch a single page. `cursor` is the `next_page_id` of the previous page.
    ///
    /// # Errors
    /// Returns an error if the request fails, the API answers with a
    /// non-success status, or the body is not a valid page.
    pub async fn fetch_page(
        &self,
        form_uuid: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
    ) -> Result<SessionPage, UpstreamError> {
        let from = window.from_param();
        let to = window.to_param();
        let mut params: Vec<(&str, &str)> = vec![
            ("form_uuid", form_uuid),
            ("time[from]", from.as_str()),
            ("time[to]", to.as_str()),
            ("includes", SESSION_INCLUDES),
        ];
        if let Some(cursor) = cursor {
            params.push(("next_page_id", cursor));
        }

        let response = self
            .client
            .get(format!("{}/sessions", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body =
                response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());
            return Err(UpstreamError::HttpStatus { code: status.as_u16(), body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::JsonParse {
            context: format!("sessions page (body: {})", truncate(&body, 200)),
            source: e,
        })
    }
}

#[async_trait]
impl SessionSource for SessionsClient {
    async fn fetch_sessions(
        &self,
        form: &FormTarget,
        window: &TimeWindow,
    ) -> Result<Vec<Session>, UpstreamError> {
        let mut sessions = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages: usize = 0;

        loop {
            let page = self.fetch_page(&form.uuid, window, cursor.as_deref()).await?;
            pages += 1;
            tracing::debug!(
                form = %form.name,
                page = pages,
                size = page.sessions.len(),
                "fetched page"
            );

            let next = page.cursor().map(str::to_owned);
            sessions.extend(page.sessions);

            match next {
                Some(next) => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(UpstreamError::PaginationLoop { cursor: next });
                    }
                    cursor = Some(next);
                },
                None => break,
            }
        }

        tracing::info!(form = %form.name, count = sessions.len(), pages, "fetched sessions");
        Ok(sessions)
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}
