use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{ExecutionSummary, PlanStep, StepResult};
use crate::events::{Event, PageContent};
use crate::tools::{ToolContext, ToolId, ToolKind, ToolOutput, ToolRegistry};

/// Runs plan steps sequentially against shared run state.
///
/// Steps are isolated: a tool that is missing, fails, or times out is
/// recorded as a failed [`StepResult`] and execution moves on. Nothing
/// a tool does can abort the run.
pub struct Executor {
    registry: Arc<ToolRegistry>,
    step_timeout: Duration,
    pages: Vec<PageContent>,
    events: Vec<Event>,
    sources: BTreeSet<String>,
    step_results: Vec<StepResult>,
}

impl Executor {
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, step_timeout: Duration) -> Self {
        Self {
            registry,
            step_timeout,
            pages: Vec::new(),
            events: Vec::new(),
            sources: BTreeSet::new(),
            step_results: Vec::new(),
        }
    }

    /// Execute every step in order. Never fails; failures land in the
    /// step results.
    pub async fn run_plan(&mut self, steps: &[PlanStep]) {
        for step in steps {
            self.run_step(step).await;
        }
    }

    pub async fn run_step(&mut self, step: &PlanStep) {
        let started = Instant::now();

        let Some(tool) = self.registry.get(step.tool) else {
            tracing::warn!(tool = %step.tool, "plan step names an unregistered tool");
            self.step_results.push(StepResult {
                tool: step.tool,
                ok: false,
                events_found: None,
                errors: 1,
                duration_ms: elapsed_ms(started),
                notes: Some(format!("tool not registered: {}", step.tool)),
            });
            return;
        };

        let outcome = tokio::time::timeout(
            self.step_timeout,
            tool.run(ToolContext {
                pages: &self.pages,
                events: &self.events,
            }),
        )
        .await;

        let result = match outcome {
            Err(_elapsed) => StepResult {
                tool: step.tool,
                ok: false,
                events_found: None,
                errors: 1,
                duration_ms: elapsed_ms(started),
                notes: Some(format!(
                    "timed out after {}s",
                    self.step_timeout.as_secs()
                )),
            },
            Ok(Err(error)) => StepResult {
                tool: step.tool,
                ok: false,
                events_found: None,
                errors: 1,
                duration_ms: elapsed_ms(started),
                notes: Some(format!("{error:#}")),
            },
            Ok(Ok(output)) => {
                let events_found = self.absorb(step.tool, tool.kind(), output);
                StepResult {
                    tool: step.tool,
                    ok: true,
                    events_found,
                    errors: 0,
                    duration_ms: elapsed_ms(started),
                    notes: None,
                }
            }
        };

        tracing::info!(
            tool = %step.tool,
            ok = result.ok,
            events_found = ?result.events_found,
            duration_ms = result.duration_ms,
            "step finished"
        );
        self.step_results.push(result);
    }

    /// Fold a successful output into run state according to the tool's
    /// capability kind. Returns the step's `events_found`.
    fn absorb(&mut self, tool: ToolId, kind: ToolKind, output: ToolOutput) -> Option<usize> {
        match (kind, output) {
            (ToolKind::Acquire, ToolOutput::Page(page)) => {
                self.sources.insert(page.source.clone());
                self.pages.push(page);
                None
            }
            (ToolKind::Acquire, ToolOutput::Events(found)) => {
                let count = found.len();
                self.sources.insert(tool.to_string());
                self.events.extend(found);
                Some(count)
            }
            (ToolKind::Extract, ToolOutput::Events(found)) => {
                let count = found.len();
                self.events.extend(found);
                Some(count)
            }
            (ToolKind::Transform, ToolOutput::Events(replaced)) => {
                self.events = replaced;
                Some(self.events.len())
            }
            (ToolKind::Control, ToolOutput::Nothing) => None,
            (kind, output) => {
                // Tool broke its kind contract. State stays untouched;
                // the step still counts as ok.
                tracing::warn!(
                    tool = %tool,
                    ?kind,
                    output = output_label(&output),
                    "tool output ignored: kind mismatch"
                );
                None
            }
        }
    }

    /// Aggregate view of the run so far. Sources come out sorted.
    #[must_use]
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            total_events: self.events.len(),
            sources_used: self.sources.iter().cloned().collect(),
            errors: self.step_results.iter().map(|r| r.errors).sum(),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn step_results(&self) -> &[StepResult] {
        &self.step_results
    }

    /// Consume the executor, releasing the collected events and the
    /// step log.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Event>, Vec<StepResult>) {
        (self.events, self.step_results)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn output_label(output: &ToolOutput) -> &'static str {
    match output {
        ToolOutput::Page(_) => "page",
        ToolOutput::Events(_) => "events",
        ToolOutput::Nothing => "nothing",
    }
}
