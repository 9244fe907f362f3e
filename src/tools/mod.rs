pub mod extract;
pub mod fetch;
pub mod hygiene;
pub mod listing;
pub mod websearch;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::events::{Event, PageContent};

/// Closed vocabulary of plan step tools.
///
/// Plans deserialize against this enum, so a model inventing a tool
/// name fails during plan decoding instead of reaching the executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolId {
    FetchSympla,
    FetchSesc,
    FetchEventim,
    FetchSaoPauloSecreto,
    WebsearchEvents,
    ExtractEvents,
    DedupeEvents,
    ValidateEvents,
    Stop,
}

/// What a tool's output does to executor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Brings new material in from outside (a page or events) and is
    /// recorded as a source.
    Acquire,
    /// Derives events from already-fetched pages.
    Extract,
    /// Rewrites the accumulated event list wholesale.
    Transform,
    /// Flow control; produces nothing.
    Control,
}

/// Payload a tool hands back to the executor.
#[derive(Debug)]
pub enum ToolOutput {
    Page(PageContent),
    Events(Vec<Event>),
    Nothing,
}

/// Read-only view of executor state passed into each tool run.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub pages: &'a [PageContent],
    pub events: &'a [Event],
}

/// Core tool trait for plan steps.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Identity under which plans reference this tool.
    fn id(&self) -> ToolId;

    /// How the executor should absorb this tool's output.
    fn kind(&self) -> ToolKind;

    /// Execute against a snapshot of the executor state.
    async fn run(&self, ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput>;
}

/// Central registry mapping plan step ids to tool instances.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same id.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        self.tools.insert(tool.id(), tool);
    }

    /// Look up a tool by id.
    #[must_use]
    pub fn get(&self, id: ToolId) -> Option<Arc<dyn Tool>> {
        self.tools.get(&id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.contains_key(&id)
    }

    /// Registered ids, sorted by wire name.
    #[must_use]
    pub fn registered_ids(&self) -> Vec<ToolId> {
        let mut ids: Vec<ToolId> = self.tools.keys().copied().collect();
        ids.sort_unstable_by_key(ToolId::to_string);
        ids
    }

    /// Vocabulary entries with no registered implementation.
    #[must_use]
    pub fn missing_ids(&self) -> Vec<ToolId> {
        ToolId::iter()
            .filter(|id| !self.tools.contains_key(id))
            .collect()
    }
}

/// Terminal no-op. Lets plans end explicitly without touching state.
pub struct StopTool;

#[async_trait]
impl Tool for StopTool {
    fn id(&self) -> ToolId {
        ToolId::Stop
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Control
    }

    async fn run(&self, _ctx: ToolContext<'_>) -> anyhow::Result<ToolOutput> {
        Ok(ToolOutput::Nothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_ids_serialize_snake_case() {
        let json = serde_json::to_string(&ToolId::FetchSaoPauloSecreto).unwrap();
        assert_eq!(json, "\"fetch_sao_paulo_secreto\"");
        let json = serde_json::to_string(&ToolId::WebsearchEvents).unwrap();
        assert_eq!(json, "\"websearch_events\"");
    }

    #[test]
    fn unknown_tool_id_is_rejected() {
        let result: Result<ToolId, _> = serde_json::from_str("\"fetch_facebook\"");
        assert!(result.is_err());
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(ToolId::ExtractEvents.to_string(), "extract_events");
        assert_eq!(ToolId::Stop.to_string(), "stop");
    }

    #[test]
    fn vocabulary_has_nine_tools() {
        assert_eq!(ToolId::iter().count(), 9);
    }

    #[test]
    fn register_then_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(StopTool));
        assert!(registry.contains(ToolId::Stop));
        let tool = registry.get(ToolId::Stop).unwrap();
        assert_eq!(tool.id(), ToolId::Stop);
        assert!(registry.get(ToolId::ExtractEvents).is_none());
    }

    #[test]
    fn missing_ids_complements_registered() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(StopTool));
        let missing = registry.missing_ids();
        assert_eq!(missing.len(), 8);
        assert!(!missing.contains(&ToolId::Stop));
    }

    #[tokio::test]
    async fn stop_produces_nothing() {
        let ctx = ToolContext {
            pages: &[],
            events: &[],
        };
        let output = StopTool.run(ctx).await.unwrap();
        assert!(matches!(output, ToolOutput::Nothing));
    }
}
