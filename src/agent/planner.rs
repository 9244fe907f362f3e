use std::sync::Arc;

use strum::IntoEnumIterator;

use super::types::Plan;
use crate::error::PlanError;
use crate::llm::Provider;
use crate::llm::structured::obtain;
use crate::tools::ToolId;

/// Turns a run request into a validated [`Plan`].
pub struct Planner {
    provider: Arc<dyn Provider>,
    max_retries: u32,
}

impl Planner {
    pub fn new(provider: Arc<dyn Provider>, max_retries: u32) -> Self {
        Self {
            provider,
            max_retries,
        }
    }

    fn system_prompt() -> String {
        let tool_list = ToolId::iter()
            .map(|id| format!("- {id}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = String::from(concat!(
            "You plan weekend cultural-event discovery runs for one city.\n",
            "Respond with a JSON object in this exact format:\n",
            "{\n",
            "  \"objective\": \"<one sentence>\",\n",
            "  \"steps\": [\n",
            "    {\"tool\": \"<tool id>\", \"description\": \"<what this step does>\"}\n",
            "  ],\n",
            "  \"success_criteria\": {\"min_events\": <number>, \"city\": \"<city>\", \"date_range_required\": true},\n",
            "  \"fallback\": {\n",
            "    \"trigger\": \"<condition for falling back>\",\n",
            "    \"steps\": [{\"tool\": \"<tool id>\", \"description\": \"<what this step does>\"}]\n",
            "  }\n",
            "}\n\n",
            "Rules:\n",
            "- Steps carry no parameters; use each tool id at most as listed.\n",
            "- Fetch listing pages before extract_events.\n",
            "- End the main steps with dedupe_events then validate_events.\n",
            "- The fallback must acquire events a different way (websearch_events) and clean them again.\n\n",
            "Available tools (use these ids exactly):\n",
        ));
        prompt.push_str(&tool_list);
        prompt
    }

    /// Ask the model for a plan and validate its shape.
    pub async fn plan(&self, request: &str) -> Result<Plan, PlanError> {
        let plan: Plan = obtain(
            self.provider.as_ref(),
            &Self::system_prompt(),
            request,
            self.max_retries,
        )
        .await?;
        plan.validate()?;

        tracing::info!(
            steps = plan.steps.len(),
            fallback = plan.fallback.is_some(),
            min_events = plan.success_criteria.min_events,
            "plan accepted"
        );
        Ok(plan)
    }
}
