//! Plan operations for the Planner.

use std::collections::HashMap;

use jiff::Timestamp;
use log::info;
use serde_json::{Map, Value};

use super::{
    estimate::estimate,
    graph::DependencyGraph,
    spec::{PlanSpec, StepRef, StepSpec},
    Planner,
};
use crate::{
    error::{KeelError, Result},
    models::{Plan, PlanStatus, Step, DEFAULT_STEP_COST, DEFAULT_STEP_TIMEOUT_SECS},
};

const DEFAULT_PLAN_TITLE: &str = "Task Plan";

impl Planner {
    /// Builds a plan from any of the accepted spec shapes and stores it.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` if the spec matches no shape, a step
    /// key is used twice, an `after` entry refers to no step, or the
    /// dependencies form a cycle.
    pub fn build_plan(
        &self,
        spec: Value,
        context: Map<String, Value>,
        title: Option<String>,
    ) -> Result<Plan> {
        let spec = PlanSpec::from_value(spec)?;
        self.build_plan_from_spec(spec, context, title)
    }

    /// Builds a plan from already-normalized steps.
    ///
    /// This is the entry point for steps carrying callback actions, which
    /// cannot be expressed in JSON.
    pub fn build_plan_from_spec(
        &self,
        spec: PlanSpec,
        context: Map<String, Value>,
        title: Option<String>,
    ) -> Result<Plan> {
        let steps = resolve_steps(spec.steps)?;
        let graph = DependencyGraph::build(&steps)?;

        let plan = Plan {
            id: uuid::Uuid::new_v4().to_string(),
            title: title
                .or(spec.title)
                .unwrap_or_else(|| DEFAULT_PLAN_TITLE.to_string()),
            status: PlanStatus::Ready,
            estimate: estimate(&steps),
            steps,
            graph,
            context,
            results: Vec::new(),
            created_at: Timestamp::now(),
            started_at: None,
            finished_at: None,
        };

        info!(
            "Created plan {} '{}' with {} steps",
            plan.id,
            plan.title,
            plan.steps.len()
        );
        self.plans_mut().insert(plan.id.clone(), plan.clone());
        Ok(plan)
    }

    /// Retrieves a plan by its ID.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::PlanNotFound` if no plan has that ID.
    pub fn get_plan(&self, id: &str) -> Result<Plan> {
        self.plans()
            .get(id)
            .cloned()
            .ok_or_else(|| KeelError::PlanNotFound { id: id.to_string() })
    }

    /// Lists all plans, oldest first.
    pub fn list_plans(&self) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self.plans().values().cloned().collect();
        plans.sort_by_key(|plan| plan.created_at);
        plans
    }

    /// Removes a plan and returns it.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::PlanNotFound` if no plan has that ID and
    /// `KeelError::Validation` if the plan is running.
    pub fn delete_plan(&self, id: &str) -> Result<Plan> {
        let mut plans = self.plans_mut();
        match plans.get(id) {
            None => return Err(KeelError::PlanNotFound { id: id.to_string() }),
            Some(plan) if plan.status == PlanStatus::Running => {
                return Err(KeelError::validation("id").with_reason("Cannot delete a running plan"))
            }
            Some(_) => {}
        }
        let plan = plans
            .remove(id)
            .ok_or_else(|| KeelError::PlanNotFound { id: id.to_string() })?;
        info!("Deleted plan {id}");
        Ok(plan)
    }
}

/// Assign IDs, apply defaults and resolve `after` references to step IDs.
fn resolve_steps(specs: Vec<StepSpec>) -> Result<Vec<Step>> {
    let ids: Vec<String> = specs
        .iter()
        .map(|_| uuid::Uuid::new_v4().to_string())
        .collect();

    let mut keys: HashMap<&str, usize> = HashMap::new();
    for (index, spec) in specs.iter().enumerate() {
        if let Some(key) = spec.key.as_deref() {
            if keys.insert(key, index).is_some() {
                return Err(KeelError::validation("key")
                    .with_reason(format!("Duplicate step key '{key}'")));
            }
        }
    }

    let resolve = |index: usize, reference: &StepRef| -> Result<String> {
        let target = match reference {
            StepRef::Index(target) if *target < specs.len() => Some(*target),
            StepRef::Index(_) => None,
            StepRef::Key(key) | StepRef::Object { id: key } => keys.get(key.as_str()).copied(),
        };
        let target = target.ok_or_else(|| {
            KeelError::validation(format!("steps[{index}].after"))
                .with_reason(format!("No step matches {}", describe(reference)))
        })?;
        if target == index {
            return Err(KeelError::validation(format!("steps[{index}].after"))
                .with_reason("A step cannot depend on itself"));
        }
        Ok(ids[target].clone())
    };

    let mut resolved = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let after = spec
            .after
            .as_ref()
            .map(|refs| {
                refs.iter()
                    .map(|reference| resolve(index, reference))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        resolved.push(after);
    }

    Ok(specs
        .into_iter()
        .zip(ids)
        .zip(resolved)
        .enumerate()
        .map(|(index, ((spec, id), after))| Step {
            id,
            key: spec.key,
            order: index as u32,
            title: spec.title,
            action: spec.action,
            after,
            timeout_secs: spec.timeout_secs.unwrap_or(DEFAULT_STEP_TIMEOUT_SECS),
            block_on_fail: spec.block_on_fail.unwrap_or(true),
            cost: spec.cost.unwrap_or(DEFAULT_STEP_COST),
        })
        .collect())
}

fn describe(reference: &StepRef) -> String {
    match reference {
        StepRef::Index(index) => format!("index {index}"),
        StepRef::Key(key) | StepRef::Object { id: key } => format!("key '{key}'"),
    }
}
