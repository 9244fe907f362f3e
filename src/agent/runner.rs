use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::executor::Executor;
use super::planner::Planner;
use super::types::{ExecutionSummary, StepResult};
use crate::error::Result;
use crate::events::Event;
use crate::tools::ToolRegistry;

/// Everything a finished run hands back to the caller.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub events: Vec<Event>,
    pub step_results: Vec<StepResult>,
    pub summary: ExecutionSummary,
}

/// Drives one discovery run: plan, execute, optionally fall back.
pub struct Runner {
    planner: Planner,
    registry: Arc<ToolRegistry>,
    step_timeout: Duration,
}

impl Runner {
    pub fn new(planner: Planner, registry: Arc<ToolRegistry>, step_timeout: Duration) -> Self {
        Self {
            planner,
            registry,
            step_timeout,
        }
    }

    /// One full pass: plan, execute, evaluate the fallback guard once,
    /// maybe execute the fallback, summarize.
    ///
    /// Only planning can fail. Execution failures degrade into the
    /// step log.
    pub async fn run(&self, request: &str) -> Result<RunOutcome> {
        let run_id = uuid::Uuid::new_v4();
        tracing::info!(%run_id, request, "planning");

        let plan = self.planner.plan(request).await?;

        tracing::info!(%run_id, objective = %plan.objective, "executing main plan");
        let mut executor = Executor::new(Arc::clone(&self.registry), self.step_timeout);
        executor.run_plan(&plan.steps).await;

        let mut summary = executor.summary();

        // The guard is evaluated exactly once, after the main pass.
        // Fallback steps run on the same executor, so accumulated
        // state and the step log carry over.
        if let Some(fallback) = &plan.fallback
            && summary.total_events < plan.success_criteria.min_events
        {
            tracing::info!(
                %run_id,
                total_events = summary.total_events,
                min_events = plan.success_criteria.min_events,
                trigger = %fallback.trigger,
                "main plan under-delivered, executing fallback"
            );
            executor.run_plan(&fallback.steps).await;
            summary = executor.summary();
        }

        tracing::info!(
            %run_id,
            total_events = summary.total_events,
            errors = summary.errors,
            "run finished"
        );

        let (events, step_results) = executor.into_parts();
        Ok(RunOutcome {
            events,
            step_results,
            summary,
        })
    }
}
