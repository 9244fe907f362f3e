use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use super::listing::parse_listing;
use super::{Tool, ToolContext, ToolId, ToolKind, ToolOutput};
use crate::events::{Event, SearchHit};
use crate::utils::text::normalize_whitespace;

/// Result-age filter forwarded to the search engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Recency {
    Day,
    /// Events churn weekly; anything older is usually stale.
    #[default]
    Week,
    Month,
    Year,
    Any,
}

impl Recency {
    fn df_param(self) -> Option<&'static str> {
        match self {
            Recency::Day => Some("d"),
            Recency::Week => Some("w"),
            Recency::Month => Some("m"),
            Recency::Year => Some("y"),
            Recency::Any => None,
        }
    }
}

/// Search engine boundary, mockable in tests.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        recency: Recency,
    ) -> anyhow::Result<Vec<SearchHit>>;
}

/// DuckDuckGo via the plain HTML endpoint. No API key, no JS.
pub struct DuckDuckGo {
    base_url: String,
    client: Client,
}

impl DuckDuckGo {
    pub fn new(base_url: Option<&str>, client: Client) -> Self {
        Self {
            base_url: base_url
                .unwrap_or("https://html.duckduckgo.com/html/")
                .to_string(),
            client,
        }
    }

    fn parse_serp(html: &str) -> Vec<SearchHit> {
        let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
            Selector::parse("div.result"),
            Selector::parse("a.result__a"),
            Selector::parse(".result__snippet"),
        ) else {
            return Vec::new();
        };

        let document = Html::parse_document(html);
        let mut hits = Vec::new();

        for result in document.select(&result_sel) {
            let Some(anchor) = result.select(&link_sel).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = unwrap_redirect(href) else {
                continue;
            };
            let title = normalize_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
            if title.is_empty() {
                continue;
            }
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
                .unwrap_or_default();

            hits.push(SearchHit {
                title,
                url,
                snippet,
                source: Some("duckduckgo".to_string()),
                date: None,
            });
        }
        hits
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        recency: Recency,
    ) -> anyhow::Result<Vec<SearchHit>> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("kl", "br-pt")]);
        if let Some(df) = recency.df_param() {
            request = request.query(&[("df", df)]);
        }

        let response = request.send().await?.error_for_status()?;
        let html = response.text().await?;

        let mut hits = Self::parse_serp(&html);
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Unwrap DuckDuckGo's `/l/?uddg=<target>` redirect links; pass plain
/// http(s) URLs through; reject everything else.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    for (key, value) in parsed.query_pairs() {
        if key == "uddg" {
            return Some(value.into_owned());
        }
    }
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

/// Bounds for the search-and-crawl pass.
#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    pub max_results: usize,
    pub recency: Recency,
    pub max_pages: usize,
    pub concurrency: usize,
    pub delay_ms: u64,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_results: 12,
            recency: Recency::Week,
            max_pages: 30,
            concurrency: 6,
            delay_ms: 150,
        }
    }
}

/// Fallback acquisition: search the open web for weekend listings and
/// harvest whatever the heuristic parser recognizes.
///
/// Queries are fixed at construction from the city, focus, and weekend
/// window, so plan steps carry no parameters.
pub struct WebsearchEvents {
    search: Arc<dyn SearchProvider>,
    client: Client,
    queries: Vec<String>,
    limits: CrawlLimits,
}

impl WebsearchEvents {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        client: Client,
        queries: Vec<String>,
        limits: CrawlLimits,
    ) -> Self {
        Self {
            search,
            client,
            queries,
            limits,
        }
    }

    /// Crawl pages concurrently, keeping SERP ranking order in the
    /// combined result regardless of completion order.
    async fn crawl(&self, urls: Vec<String>) -> Vec<Event> {
        let semaphore = Arc::new(Semaphore::new(self.limits.concurrency.max(1)));
        let delay = Duration::from_millis(self.limits.delay_ms);
        let mut tasks: JoinSet<(usize, Vec<Event>)> = JoinSet::new();

        for (index, url) in urls.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let client = self.client.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Vec::new());
                };
                let events = crawl_page(&client, &url).await;
                tokio::time::sleep(delay).await;
                (index, events)
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => indexed.push(result),
                Err(error) => tracing::warn!(error = %error, "crawl task failed"),
            }
        }
        indexed.sort_unstable_by_key(|(index, _)| *index);
        indexed
            .into_iter()
            .flat_map(|(_, events)| events)
            .collect()
    }
}

async fn crawl_page(client: &Client, url: &str) -> Vec<Event> {
    let body = match fetch_body(client, url).await {
        Ok(body) => body,
        Err(error) => {
            tracing::debug!(url = %url, error = %error, "crawl fetch failed, skipping page");
            return Vec::new();
        }
    };
    parse_listing(&body, url, "websearch")
}

async fn fetch_body(client: &Client, url: &str) -> anyhow::Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

#[async_trait]
impl Tool for WebsearchEvents {
    fn id(&self) -> ToolId {
        ToolId::WebsearchEvents
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Acquire
    }

    async fn run(&self, _ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput> {
        let mut hits: Vec<SearchHit> = Vec::new();
        for query in &self.queries {
            match self
                .search
                .search(query, self.limits.max_results, self.limits.recency)
                .await
            {
                Ok(found) => {
                    tracing::debug!(query = %query, hits = found.len(), "search query done");
                    hits.extend(found);
                }
                Err(error) => {
                    tracing::warn!(query = %query, error = %error, "search query failed, skipping");
                }
            }
        }

        // Dedupe by URL keeping SERP order, then cap the crawl set.
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for hit in hits {
            if urls.len() >= self.limits.max_pages {
                break;
            }
            if seen.insert(hit.url.clone()) {
                urls.push(hit.url);
            }
        }

        tracing::debug!(pages = urls.len(), "crawling search results");
        let events = self.crawl(urls).await;
        Ok(ToolOutput::Events(events))
    }
}
