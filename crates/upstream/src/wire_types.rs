use formsync_core::Session;
use serde::Deserialize;

/// One page of the `/sessions` response.
#[derive(Debug, Deserialize)]
pub struct SessionPage {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub next_page_id: Option<String>,
}

impl SessionPage {
    /// Cursor for the next request; blank cursors end pagination.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.next_page_id.as_deref().filter(|c| !c.is_empty())
    }
}
