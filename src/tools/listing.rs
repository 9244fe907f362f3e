use scraper::{Html, Selector};
use url::Url;

use crate::events::Event;
use crate::utils::text::{normalize_whitespace, truncate_chars};

/// Month tokens that mark an anchor as date-bearing. Brazilian listing
/// sites abbreviate months in Portuguese; search snippets sometimes use
/// full English names.
const MONTHS_PT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

const MONTHS_EN: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const MAX_TITLE_CHARS: usize = 120;

/// Scan a listing page for anchors that look like dated events.
///
/// Cheap fallback applied to crawled search results, where a full LLM
/// extraction pass would cost too much. Naive: a month substring
/// anywhere in the anchor text counts as a date hint. No date is
/// recorded on the result; the anchor text rarely carries a parseable
/// one and guessing would fabricate data.
#[must_use]
pub fn parse_listing(html: &str, base_url: &str, source: &str) -> Vec<Event> {
    let Ok(anchor) = Selector::parse("a") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let mut events = Vec::new();
    for element in document.select(&anchor) {
        let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        if text.is_empty() || !has_month_token(&text) {
            continue;
        }

        let link = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(base.as_ref(), href));

        events.push(Event {
            title: truncate_chars(&text, MAX_TITLE_CHARS).to_string(),
            link,
            source_name: Some(source.to_string()),
            source_url: Some(base_url.to_string()),
            ..Event::default()
        });
    }
    events
}

fn has_month_token(text: &str) -> bool {
    let lower = text.to_lowercase();
    MONTHS_PT.iter().chain(MONTHS_EN.iter()).any(|m| lower.contains(m))
}

fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    base?.join(href).ok().map(|resolved| resolved.to_string())
}
