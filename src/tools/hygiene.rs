use async_trait::async_trait;

use super::{Tool, ToolContext, ToolId, ToolKind, ToolOutput};
use crate::events;

/// Collapses duplicate events the acquisition steps picked up from
/// overlapping sources.
pub struct DedupeEvents;

#[async_trait]
impl Tool for DedupeEvents {
    fn id(&self) -> ToolId {
        ToolId::DedupeEvents
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Transform
    }

    async fn run(&self, ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput> {
        let before = ctx.events.len();
        let deduped = events::dedupe(ctx.events.to_vec());
        tracing::debug!(before, after = deduped.len(), "deduplicated events");
        Ok(ToolOutput::Events(deduped))
    }
}

/// Drops events that fail basic hygiene rules for the configured city.
pub struct ValidateEvents {
    city: String,
}

impl ValidateEvents {
    pub fn new(city: &str) -> Self {
        Self {
            city: city.to_string(),
        }
    }
}

#[async_trait]
impl Tool for ValidateEvents {
    fn id(&self) -> ToolId {
        ToolId::ValidateEvents
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Transform
    }

    async fn run(&self, ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput> {
        let before = ctx.events.len();
        let valid = events::retain_valid(ctx.events.to_vec(), &self.city);
        tracing::debug!(before, after = valid.len(), city = %self.city, "validated events");
        Ok(ToolOutput::Events(valid))
    }
}
