//! Plan model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ExecutionResult, PlanStatus, Step};
use crate::planner::DependencyGraph;

/// Represents a built plan: its steps, their dependency graph and, once run,
/// the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier for the plan
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub status: PlanStatus,

    /// Steps in specification order
    pub steps: Vec<Step>,

    /// Edges from each step to the steps that depend on it
    pub graph: DependencyGraph,

    /// Free-form key/value map handed to every step
    #[serde(default)]
    pub context: Map<String, Value>,

    pub estimate: Estimate,

    /// Results of the most recent run, in dispatch order
    #[serde(default)]
    pub results: Vec<ExecutionResult>,

    /// Timestamp when the plan was built (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the most recent run started (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    /// Timestamp when the most recent run finished (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl Plan {
    /// Look up a step by its generated ID.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// The result recorded for a step in the most recent run.
    pub fn result_for(&self, step_id: &str) -> Option<&ExecutionResult> {
        self.results
            .iter()
            .find(|result| result.step_id.as_deref() == Some(step_id))
    }
}

/// Up-front estimate computed when a plan is built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Estimate {
    /// Sum of declared step time budgets, in seconds
    pub time_secs: u64,

    /// Aggregate keyword risk in `[0, 1]`
    pub risk: f64,

    /// Sum of step costs
    pub cost: f64,
}
