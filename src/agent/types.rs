use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::ToolId;

/// A model-authored execution plan.
///
/// Decoding is itself the first validation layer: step tools
/// deserialize against [`ToolId`], so an invented tool name fails the
/// structured-output protocol rather than reaching the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub objective: String,
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
    #[serde(default)]
    pub fallback: Option<FallbackPlan>,
}

/// One plan step. Tools are parameterless; everything they need is
/// injected when the registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: ToolId,
    pub description: String,
    /// Kept so a model that emits params fails validation loudly
    /// instead of having its intent silently dropped.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// What the run must achieve for the main plan to count as enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    #[serde(default = "default_min_events")]
    pub min_events: usize,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_date_range_required")]
    pub date_range_required: bool,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self {
            min_events: default_min_events(),
            city: default_city(),
            date_range_required: default_date_range_required(),
        }
    }
}

/// Recovery steps to run when the main plan under-delivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackPlan {
    /// Model-stated reason the fallback would fire; informational.
    pub trigger: String,
    pub steps: Vec<PlanStep>,
}

/// Outcome of one executed plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub tool: ToolId,
    pub ok: bool,
    /// Events this step produced; `None` when the output is not
    /// event-shaped (page fetches, control steps).
    pub events_found: Option<usize>,
    pub errors: u32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Aggregate view derived from executor state after a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_events: usize,
    pub sources_used: Vec<String>,
    pub errors: u32,
}

/// Plan shape violations caught after decoding, before execution.
#[derive(Debug, Error)]
pub enum InvalidPlan {
    #[error("plan has no steps")]
    NoSteps,
    #[error("step '{tool}' carries params, but tools are parameterless")]
    ParamsNotEmpty { tool: ToolId },
}

impl Plan {
    /// Shape checks that decoding alone cannot express.
    pub fn validate(&self) -> Result<(), InvalidPlan> {
        if self.steps.is_empty() {
            return Err(InvalidPlan::NoSteps);
        }
        let fallback_steps = self.fallback.iter().flat_map(|f| f.steps.iter());
        for step in self.steps.iter().chain(fallback_steps) {
            if !step.params.is_empty() {
                return Err(InvalidPlan::ParamsNotEmpty { tool: step.tool });
            }
        }
        Ok(())
    }
}

fn default_min_events() -> usize {
    10
}

fn default_city() -> String {
    "São Paulo".to_string()
}

fn default_date_range_required() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(tool: ToolId) -> PlanStep {
        PlanStep {
            tool,
            description: "step".to_string(),
            params: serde_json::Map::new(),
        }
    }

    #[test]
    fn plan_decodes_from_model_shaped_json() {
        let json = r#"{
            "objective": "Find weekend events in São Paulo",
            "steps": [
                {"tool": "fetch_sympla", "description": "Fetch the Sympla listing"},
                {"tool": "extract_events", "description": "Extract events from pages"}
            ],
            "success_criteria": {"min_events": 5, "city": "São Paulo", "date_range_required": true},
            "fallback": {
                "trigger": "fewer than 5 events",
                "steps": [{"tool": "websearch_events", "description": "Search the open web"}]
            }
        }"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool, ToolId::FetchSympla);
        assert_eq!(plan.success_criteria.min_events, 5);
        assert!(plan.fallback.is_some());
        plan.validate().unwrap();
    }

    #[test]
    fn unknown_tool_name_fails_decoding() {
        let json = r#"{
            "objective": "x",
            "steps": [{"tool": "fetch_instagram", "description": "nope"}]
        }"#;
        let result: Result<Plan, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn missing_criteria_fall_back_to_defaults() {
        let json = r#"{
            "objective": "x",
            "steps": [{"tool": "stop", "description": "end"}]
        }"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.success_criteria.min_events, 10);
        assert_eq!(plan.success_criteria.city, "São Paulo");
        assert!(plan.success_criteria.date_range_required);
        assert!(plan.fallback.is_none());
    }

    #[test]
    fn empty_plan_is_invalid() {
        let plan = Plan {
            objective: "x".to_string(),
            steps: Vec::new(),
            success_criteria: SuccessCriteria::default(),
            fallback: None,
        };
        assert!(matches!(plan.validate(), Err(InvalidPlan::NoSteps)));
    }

    #[test]
    fn step_params_are_rejected() {
        let mut bad = step(ToolId::FetchSesc);
        bad.params
            .insert("url".to_string(), serde_json::json!("https://example.com"));
        let plan = Plan {
            objective: "x".to_string(),
            steps: vec![bad],
            success_criteria: SuccessCriteria::default(),
            fallback: None,
        };
        match plan.validate() {
            Err(InvalidPlan::ParamsNotEmpty { tool }) => assert_eq!(tool, ToolId::FetchSesc),
            other => panic!("expected params rejection, got {other:?}"),
        }
    }

    #[test]
    fn fallback_steps_are_validated_too() {
        let mut bad = step(ToolId::WebsearchEvents);
        bad.params.insert("q".to_string(), serde_json::json!("x"));
        let plan = Plan {
            objective: "x".to_string(),
            steps: vec![step(ToolId::FetchSympla)],
            success_criteria: SuccessCriteria::default(),
            fallback: Some(FallbackPlan {
                trigger: "too few events".to_string(),
                steps: vec![bad],
            }),
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn step_results_serialize_without_empty_notes() {
        let result = StepResult {
            tool: ToolId::DedupeEvents,
            ok: true,
            events_found: Some(7),
            errors: 0,
            duration_ms: 12,
            notes: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("notes"));
        assert!(json.contains("\"events_found\":7"));
    }
}
