//! Plan summary types and functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Plan, PlanStatus};

/// Summary information about a plan with run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: String,
    pub title: String,
    pub status: PlanStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// Total number of steps
    pub total_steps: u32,
    /// Number of steps that have a result from the most recent run
    pub attempted_steps: u32,
    /// Number of those results that succeeded
    pub succeeded_steps: u32,
    pub risk: f64,
}

impl From<&Plan> for PlanSummary {
    fn from(plan: &Plan) -> Self {
        let succeeded_steps = plan.results.iter().filter(|result| result.ok).count() as u32;

        Self {
            id: plan.id.clone(),
            title: plan.title.clone(),
            status: plan.status,
            created_at: plan.created_at,
            finished_at: plan.finished_at,
            total_steps: plan.steps.len() as u32,
            attempted_steps: plan.results.len() as u32,
            succeeded_steps,
            risk: plan.estimate.risk,
        }
    }
}
