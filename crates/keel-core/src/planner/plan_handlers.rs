//! Plan handler operations that return formatted wrapper types for the Planner.

use super::Planner;
use crate::{
    display::{CreateResult, DeleteResult, PlanSummaries, RunReport},
    error::Result,
    models::{Plan, PlanSummary},
    params::{BuildPlan, Id},
};

impl Planner {
    /// Handle building a plan from interface parameters.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use keel_core::{params::BuildPlan, PlannerBuilder};
    /// # async {
    /// let planner = PlannerBuilder::new().build().await?;
    /// let params = BuildPlan {
    ///     spec: serde_json::json!(["cargo fmt --check", "cargo test"]),
    ///     context: Default::default(),
    ///     title: Some("Checks".to_string()),
    /// };
    /// let created = planner.build_plan_result(&params)?;
    /// println!("{created}");
    /// # Result::<(), keel_core::KeelError>::Ok(())
    /// # };
    /// ```
    pub fn build_plan_result(&self, params: &BuildPlan) -> Result<CreateResult<Plan>> {
        let plan = self.build_plan(
            params.spec.clone(),
            params.context.clone(),
            params.title.clone(),
        )?;
        Ok(CreateResult::new(plan))
    }

    /// Handle showing a plan with its steps and latest results.
    pub fn show_plan(&self, params: &Id) -> Result<Plan> {
        self.get_plan(&params.id)
    }

    /// Handle listing plans as summaries, oldest first.
    pub fn list_plans_summary(&self) -> PlanSummaries {
        let summaries: Vec<PlanSummary> = self.list_plans().iter().map(Into::into).collect();
        PlanSummaries(summaries)
    }

    /// Handle deleting a plan.
    pub fn delete_plan_result(&self, params: &Id) -> Result<DeleteResult<Plan>> {
        self.delete_plan(&params.id).map(DeleteResult::new)
    }

    /// Handle running a plan to completion.
    ///
    /// A failed run is still `Ok`; the report says which step halted it.
    pub async fn run_plan_report(&self, params: &Id) -> Result<RunReport> {
        self.run_plan(&params.id).await.map(RunReport)
    }
}
