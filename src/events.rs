use serde::{Deserialize, Serialize};

use crate::utils::text::normalize_whitespace;

/// One extracted cultural event. Only the title is required; every other
/// field stays `None` when the source page does not state it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    #[serde(default)]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    /// Raw date phrase from the page when no ISO form is known.
    #[serde(default)]
    pub date_text: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Raw page snapshot produced by a fetch tool and consumed by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub body: String,
    pub source: String,
}

/// One search-engine result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

fn norm(s: &str) -> String {
    normalize_whitespace(s).to_lowercase()
}

/// Order-preserving, first-wins dedupe keyed on normalized
/// (title, starts_at, venue).
#[must_use]
pub fn dedupe(events: Vec<Event>) -> Vec<Event> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(events.len());
    for event in events {
        let key = (
            norm(&event.title),
            event.starts_at.clone(),
            event.venue.as_deref().map(norm),
        );
        if seen.insert(key) {
            unique.push(event);
        }
    }
    unique
}

fn link_is_absolute_http(link: &str) -> bool {
    url::Url::parse(link).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Drop events that cannot be presented: blank titles, relative or
/// non-http links, and events pinned to a different city. Events with no
/// city are kept.
#[must_use]
pub fn retain_valid(events: Vec<Event>, city: &str) -> Vec<Event> {
    let wanted = norm(city);
    events
        .into_iter()
        .filter(|event| {
            if event.title.trim().is_empty() {
                return false;
            }
            if let Some(link) = event.link.as_deref()
                && !link_is_absolute_http(link)
            {
                return false;
            }
            match event.city.as_deref() {
                Some(event_city) => norm(event_city) == wanted,
                None => true,
            }
        })
        .collect()
}
