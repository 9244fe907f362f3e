use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Tool, ToolContext, ToolId, ToolKind, ToolOutput};
use crate::events::Event;
use crate::llm::Provider;
use crate::llm::structured::obtain;
use crate::utils::text::truncate_chars;

/// Wrapper shape the extraction prompt demands. A single "events" key
/// keeps small models from answering with a bare array.
#[derive(Debug, Deserialize)]
struct EventBatch {
    events: Vec<Event>,
}

/// LLM-backed event extraction over every page fetched so far.
///
/// Pages are processed independently. A page that defeats the model
/// contributes zero events; it never fails the step.
pub struct ExtractEvents {
    provider: Arc<dyn Provider>,
    max_retries: u32,
    max_page_chars: usize,
}

impl ExtractEvents {
    pub fn new(provider: Arc<dyn Provider>, max_retries: u32, max_page_chars: usize) -> Self {
        Self {
            provider,
            max_retries,
            max_page_chars,
        }
    }

    fn system_prompt() -> &'static str {
        concat!(
            "You extract cultural events from the raw HTML of event listing pages.\n",
            "Rules:\n",
            "- Extract only real events present in the HTML. Never invent events.\n",
            "- Ignore navigation, menus, ads, newsletters, and unrelated news.\n",
            "- Use null for every field the HTML does not state.\n",
            "- Dates use ISO format YYYY-MM-DD when the HTML is explicit; otherwise null.\n",
            "- Put unparsed date wording (\"todo sábado\", \"este fim de semana\") in date_text.\n",
            "- If the page lists no events, return an empty list.\n\n",
            "Respond with a JSON object in this exact format:\n",
            "{\n",
            "  \"events\": [\n",
            "    {\n",
            "      \"title\": \"<event title>\",\n",
            "      \"starts_at\": \"<YYYY-MM-DD or null>\",\n",
            "      \"ends_at\": \"<YYYY-MM-DD or null>\",\n",
            "      \"date_text\": \"<verbatim date wording or null>\",\n",
            "      \"venue\": \"<venue name or null>\",\n",
            "      \"city\": \"<city or null>\",\n",
            "      \"category\": \"<music, theatre, fair, ... or null>\",\n",
            "      \"price\": \"<price text or null>\",\n",
            "      \"link\": \"<absolute URL or null>\"\n",
            "    }\n",
            "  ]\n",
            "}\n",
            "The top-level value MUST be an object with the single key \"events\", never a raw array.",
        )
    }
}

#[async_trait]
impl Tool for ExtractEvents {
    fn id(&self) -> ToolId {
        ToolId::ExtractEvents
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Extract
    }

    async fn run(&self, ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput> {
        let mut extracted = Vec::new();

        for page in ctx.pages {
            let user = format!(
                "SOURCE: {}\nURL: {}\n\nHTML:\n{}",
                page.source,
                page.url,
                truncate_chars(&page.body, self.max_page_chars),
            );

            match obtain::<EventBatch>(
                self.provider.as_ref(),
                Self::system_prompt(),
                &user,
                self.max_retries,
            )
            .await
            {
                Ok(batch) => {
                    tracing::debug!(
                        source = %page.source,
                        count = batch.events.len(),
                        "extracted events from page"
                    );
                    extracted.extend(batch.events.into_iter().map(|mut event| {
                        event.source_name = Some(page.source.clone());
                        event.source_url = Some(page.url.clone());
                        event
                    }));
                }
                Err(error) => {
                    tracing::warn!(
                        source = %page.source,
                        url = %page.url,
                        error = %error,
                        "extraction failed for page, skipping"
                    );
                }
            }
        }

        Ok(ToolOutput::Events(extracted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PageContent;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<anyhow::Result<String>>>,
    }

    impl Scripted {
        fn new<I>(replies: I) -> Self
        where
            I: IntoIterator<Item = anyhow::Result<String>>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("{\"events\": []}".to_string()))
        }
    }

    fn page(source: &str, url: &str) -> PageContent {
        PageContent {
            url: url.to_string(),
            body: "<html>listing</html>".to_string(),
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn extracted_events_are_stamped_with_their_page() {
        let provider = Arc::new(Scripted::new([Ok(
            "{\"events\": [{\"title\": \"Feira do Bixiga\"}]}".to_string()
        )]));
        let tool = ExtractEvents::new(provider, 0, 12_000);
        let pages = vec![page("sympla", "https://sympla.example/sp")];

        let output = tool
            .run(ToolContext {
                pages: &pages,
                events: &[],
            })
            .await
            .unwrap();

        match output {
            ToolOutput::Events(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].source_name.as_deref(), Some("sympla"));
                assert_eq!(
                    events[0].source_url.as_deref(),
                    Some("https://sympla.example/sp")
                );
            }
            other => panic!("expected events output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn a_failing_page_degrades_to_zero_events() {
        let provider = Arc::new(Scripted::new([
            Err(anyhow::anyhow!("model not loaded")),
            Ok("{\"events\": [{\"title\": \"Virada Cultural\"}]}".to_string()),
        ]));
        let tool = ExtractEvents::new(provider, 0, 12_000);
        let pages = vec![
            page("sesc", "https://sesc.example/prog"),
            page("eventim", "https://eventim.example/sp"),
        ];

        let output = tool
            .run(ToolContext {
                pages: &pages,
                events: &[],
            })
            .await
            .unwrap();

        match output {
            ToolOutput::Events(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].title, "Virada Cultural");
                assert_eq!(events[0].source_name.as_deref(), Some("eventim"));
            }
            other => panic!("expected events output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_pages_means_no_events() {
        let provider = Arc::new(Scripted::new([]));
        let tool = ExtractEvents::new(provider, 0, 12_000);

        let output = tool
            .run(ToolContext {
                pages: &[],
                events: &[],
            })
            .await
            .unwrap();

        match output {
            ToolOutput::Events(events) => assert!(events.is_empty()),
            other => panic!("expected events output, got {other:?}"),
        }
    }
}
