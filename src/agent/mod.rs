pub mod executor;
pub mod planner;
pub mod runner;
pub mod types;

pub use executor::Executor;
pub use planner::Planner;
pub use runner::{RunOutcome, Runner};
pub use types::{ExecutionSummary, Plan, PlanStep, StepResult, SuccessCriteria};
