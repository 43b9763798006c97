//! Sequential plan execution.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use jiff::Timestamp;
use log::{debug, info, warn};
use serde::Serialize;

use super::Planner;
use crate::{
    error::{KeelError, Result},
    models::{ExecutionResult, Plan, PlanStatus, Step, StepAction, StepContext},
    sandbox::RunOptions,
};

/// Context key naming the working directory for command and code steps.
pub const WORK_DIR_CONTEXT_KEY: &str = "work_dir";

/// Called with each step and its context right before the step runs.
pub type StepObserver<'a> = dyn Fn(&Step, &StepContext) + Send + Sync + 'a;

/// Outcome of [`Planner::run_plan`].
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// True when every step in the execution order ran and the plan completed
    pub ok: bool,
    /// The plan with its results and final status
    pub plan: Plan,
}

impl Planner {
    /// Runs a plan to completion.
    ///
    /// See [`Planner::run_plan_with`].
    pub async fn run_plan(&self, id: &str) -> Result<RunOutcome> {
        self.run_plan_with(id, None).await
    }

    /// Runs every step of a plan in dependency order, one at a time.
    ///
    /// Command and code steps are classified by the gate first; a denied step
    /// fails without reaching the sandbox. The walk stops at the first failed
    /// step whose `block_on_fail` is set, leaving later steps unattempted.
    /// Running a finished plan again starts over and replaces its results.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::PlanNotFound` for an unknown ID and
    /// `KeelError::Validation` if the plan is already running. Step failures
    /// are reported in the outcome, not as errors.
    ///
    /// If the returned future is dropped before it completes, the plan is
    /// left `Failed` with the results recorded so far.
    pub async fn run_plan_with(
        &self,
        id: &str,
        on_step: Option<&StepObserver<'_>>,
    ) -> Result<RunOutcome> {
        let (plan, order) = self.start_run(id)?;
        let mut guard = RunGuard {
            planner: self,
            id,
            finished: false,
        };
        info!("Running plan {} '{}' ({} steps)", plan.id, plan.title, order.len());

        let mut results: Vec<ExecutionResult> = Vec::with_capacity(order.len());
        let mut failed = false;

        for step_id in &order {
            let Some(step) = plan.step(step_id) else {
                continue;
            };

            // Declared prerequisites see only their own results; other
            // steps see everything recorded so far
            let previous = match &step.after {
                Some(after) => results
                    .iter()
                    .filter(|result| {
                        result
                            .step_id
                            .as_deref()
                            .is_some_and(|id| after.iter().any(|prerequisite| prerequisite == id))
                    })
                    .cloned()
                    .collect(),
                None => results.clone(),
            };
            let context = StepContext {
                plan_id: plan.id.clone(),
                step_id: step.id.clone(),
                context: plan.context.clone(),
                previous,
            };

            if let Some(observer) = on_step {
                observer(step, &context);
            }

            let result = self.execute_step(&plan, step, context).await.for_step(&step.id);
            if result.ok {
                debug!("Step '{}' succeeded in {} ms", step.title, result.elapsed_ms);
            } else {
                warn!(
                    "Step '{}' failed: {}",
                    step.title,
                    result.error.as_deref().unwrap_or("non-zero exit")
                );
            }

            let halt = !result.ok && step.block_on_fail;
            self.record_result(id, result.clone());
            results.push(result);

            if halt {
                failed = true;
                break;
            }
        }

        let plan = self.finish_run(id, plan, results, failed);
        guard.finished = true;
        info!(
            "Plan {} finished: {} ({} of {} steps attempted)",
            plan.id,
            plan.status.as_str(),
            plan.results.len(),
            plan.steps.len()
        );

        Ok(RunOutcome {
            ok: plan.status == PlanStatus::Completed,
            plan,
        })
    }

    /// Mark the plan running and snapshot it with its execution order.
    fn start_run(&self, id: &str) -> Result<(Plan, Vec<String>)> {
        let mut plans = self.plans_mut();
        let plan = plans
            .get_mut(id)
            .ok_or_else(|| KeelError::PlanNotFound { id: id.to_string() })?;

        if plan.status == PlanStatus::Running {
            return Err(KeelError::validation("id").with_reason("Plan is already running"));
        }

        let order = plan.graph.execution_order()?;
        plan.status = PlanStatus::Running;
        plan.started_at = Some(Timestamp::now());
        plan.finished_at = None;
        plan.results.clear();
        Ok((plan.clone(), order))
    }

    fn record_result(&self, id: &str, result: ExecutionResult) {
        if let Some(plan) = self.plans_mut().get_mut(id) {
            plan.results.push(result);
        }
    }

    fn finish_run(
        &self,
        id: &str,
        mut plan: Plan,
        results: Vec<ExecutionResult>,
        failed: bool,
    ) -> Plan {
        plan.status = if failed {
            PlanStatus::Failed
        } else {
            PlanStatus::Completed
        };
        plan.finished_at = Some(Timestamp::now());
        plan.results = results;

        // The plan may have been deleted mid-run; the caller still gets it
        if let Some(stored) = self.plans_mut().get_mut(id) {
            stored.clone_from(&plan);
        }
        plan
    }

    async fn execute_step(&self, plan: &Plan, step: &Step, context: StepContext) -> ExecutionResult {
        let tracking_id = uuid::Uuid::new_v4().to_string();
        let timeout = Duration::from_secs(step.timeout_secs);
        let work_dir = plan
            .context
            .get(WORK_DIR_CONTEXT_KEY)
            .and_then(|value| value.as_str())
            .map(PathBuf::from);

        match &step.action {
            StepAction::Command { command } => {
                let verdict = self.gate.classify(command);
                if !verdict.allow {
                    warn!("Step '{}' denied: {}", step.title, verdict.reason);
                    return ExecutionResult::denied(tracking_id, command, verdict);
                }
                self.executor
                    .run_shell(command, work_dir.as_deref(), Some(timeout))
                    .await
            }
            StepAction::Code { language, source } => {
                let verdict = self.gate.classify_code(*language, source);
                if !verdict.allow {
                    warn!("Step '{}' denied: {}", step.title, verdict.reason);
                    return ExecutionResult::denied(
                        tracking_id,
                        format!("{} snippet", language.as_str()),
                        verdict,
                    );
                }
                let options = RunOptions {
                    timeout: Some(timeout),
                    work_dir,
                    ..RunOptions::default()
                };
                self.executor.execute_code(*language, source, &options).await
            }
            StepAction::Callback { label, handler } => {
                let Some(handler) = handler else {
                    return ExecutionResult::failure(
                        tracking_id,
                        label,
                        "Callback has no handler attached",
                    );
                };
                let started = Instant::now();
                let handler = handler.clone();
                let mut task = tokio::spawn(async move { handler.call(context).await });
                let outcome = tokio::time::timeout(timeout, &mut task).await;
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let result = match outcome {
                    Ok(Ok(Ok(output))) => ExecutionResult::success(tracking_id, label, output),
                    Ok(Ok(Err(message))) => ExecutionResult::failure(tracking_id, label, message),
                    Ok(Err(e)) => {
                        warn!("Callback '{label}' did not finish: {e}");
                        let reason = if e.is_panic() { "panicked" } else { "was cancelled" };
                        ExecutionResult::failure(tracking_id, label, format!("Callback {reason}"))
                    }
                    Err(_) => {
                        task.abort();
                        let mut result = ExecutionResult::failure(
                            tracking_id,
                            label,
                            format!("Timed out after {} ms", timeout.as_millis()),
                        );
                        result.killed = true;
                        result
                    }
                };
                result.with_elapsed_ms(elapsed_ms)
            }
            StepAction::Noop { note } => {
                ExecutionResult::success(tracking_id, note.as_deref().unwrap_or(&step.title), "done")
            }
        }
    }
}

/// Leaves a plan `Failed` when its run ends without reaching
/// `finish_run`, e.g. because the run future was dropped.
struct RunGuard<'a> {
    planner: &'a Planner,
    id: &'a str,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(plan) = self.planner.plans_mut().get_mut(self.id) {
            if plan.status == PlanStatus::Running {
                warn!("Run of plan {} was interrupted", self.id);
                plan.status = PlanStatus::Failed;
                plan.finished_at = Some(Timestamp::now());
            }
        }
    }
}
