use async_trait::async_trait;
use reqwest::Client;

use super::{Tool, ToolContext, ToolId, ToolKind, ToolOutput};
use crate::events::PageContent;

/// Build the HTTP client shared by page fetchers and the search crawl.
///
/// Listing sites reject obvious bot agents, so a browser-family UA is
/// sent.
#[must_use]
pub fn page_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(10))
        .user_agent("Mozilla/5.0 (compatible; weekendscout/0.1)")
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Downloads one configured listing page and stores it for extraction.
///
/// One instance is registered per listing source; the plan refers to
/// them by id (`fetch_sympla`, `fetch_sesc`, ...).
pub struct FetchPage {
    id: ToolId,
    source: String,
    url: String,
    client: Client,
}

impl FetchPage {
    pub fn new(id: ToolId, source: &str, url: &str, client: Client) -> Self {
        Self {
            id,
            source: source.to_string(),
            url: url.to_string(),
            client,
        }
    }
}

#[async_trait]
impl Tool for FetchPage {
    fn id(&self) -> ToolId {
        self.id
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Acquire
    }

    async fn run(&self, _ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput> {
        tracing::debug!(source = %self.source, url = %self.url, "fetching listing page");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        tracing::debug!(source = %self.source, bytes = body.len(), "listing page fetched");
        Ok(ToolOutput::Page(PageContent {
            url: self.url.clone(),
            body,
            source: self.source.clone(),
        }))
    }
}
