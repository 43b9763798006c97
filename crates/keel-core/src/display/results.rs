//! Result wrapper types for displaying operation outcomes.
//!
//! These wrap the resource an operation produced or removed and prefix it
//! with a one-line confirmation.

use std::fmt;

use crate::{
    models::{Plan, ProcessRecord},
    planner::RunOutcome,
};

/// Result of building a plan.
///
/// # Examples
///
/// ```rust
/// use keel_core::{display::CreateResult, gate::SecurityGate};
/// # use keel_core::{config::SandboxSettings, sandbox::Executor, Planner};
/// # use std::sync::Arc;
/// # let executor = Executor::new(SandboxSettings::default(), std::env::temp_dir());
/// # let planner = Planner::new(Arc::new(SecurityGate::new()), Arc::new(executor));
///
/// let plan = planner.build_plan(serde_json::json!("echo hi"), Default::default(), None)?;
/// let output = CreateResult::new(plan).to_string();
/// assert!(output.starts_with("Created plan with ID: "));
/// # Ok::<(), keel_core::KeelError>(())
/// ```
pub struct CreateResult<T> {
    pub resource: T,
}

impl<T> CreateResult<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for CreateResult<Plan> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created plan with ID: {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

/// Result of deleting a plan.
pub struct DeleteResult<T> {
    pub resource: T,
}

impl<T> DeleteResult<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for DeleteResult<Plan> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deleted plan '{}' (ID: {}, {} steps)",
            self.resource.title,
            self.resource.id,
            self.resource.steps.len()
        )
    }
}

/// Result of a kill request: the process as it was when the request landed.
pub struct KillResult(pub ProcessRecord);

impl fmt::Display for KillResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Termination requested for process {} (`{}`)",
            self.0.pid, self.0.command
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "The process receives SIGTERM now and SIGKILL if it is still alive after the grace period."
        )
    }
}

/// Result of running a plan: a headline followed by the full plan.
pub struct RunReport(pub RunOutcome);

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = &self.0.plan;
        let succeeded = plan.results.iter().filter(|result| result.ok).count();
        if self.0.ok {
            writeln!(
                f,
                "Plan completed: {succeeded}/{} steps succeeded",
                plan.steps.len()
            )?;
        } else {
            writeln!(
                f,
                "Plan failed: {} of {} steps attempted, {succeeded} succeeded",
                plan.results.len(),
                plan.steps.len()
            )?;
        }
        writeln!(f)?;
        write!(f, "{plan}")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use jiff::Timestamp;
    use serde_json::Map;

    use super::*;
    use crate::{
        models::{Estimate, ExecutionResult, PlanStatus, Step, StepAction},
        planner::DependencyGraph,
    };

    fn create_test_plan() -> Plan {
        let steps: Vec<Step> = ["echo one", "echo two"]
            .iter()
            .enumerate()
            .map(|(index, command)| Step {
                id: format!("s{index}"),
                key: None,
                order: index as u32,
                title: command.to_string(),
                action: StepAction::command(*command),
                after: None,
                timeout_secs: 30,
                block_on_fail: true,
                cost: 1.0,
            })
            .collect();
        let graph = DependencyGraph::build(&steps).unwrap();

        Plan {
            id: "plan-1".to_string(),
            title: "Echoes".to_string(),
            status: PlanStatus::Ready,
            steps,
            graph,
            context: Map::new(),
            estimate: Estimate {
                time_secs: 60,
                risk: 0.0,
                cost: 2.0,
            },
            results: Vec::new(),
            created_at: Timestamp::from_second(1640995200).unwrap(),
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn test_create_result_display() {
        let output = CreateResult::new(create_test_plan()).to_string();
        assert!(output.starts_with("Created plan with ID: plan-1\n"));
        assert!(output.contains("# Echoes"));
        assert!(output.contains("### 2. echo two"));
        assert!(output.contains("- After: 1"));
    }

    #[test]
    fn test_delete_result_display() {
        let output = DeleteResult::new(create_test_plan()).to_string();
        assert_eq!(output, "Deleted plan 'Echoes' (ID: plan-1, 2 steps)\n");
    }

    #[test]
    fn test_run_report_failed() {
        let mut plan = create_test_plan();
        plan.status = PlanStatus::Failed;
        plan.finished_at = Some(Timestamp::now());
        plan.results = vec![ExecutionResult::failure("t1", "echo one", "Process exit status: 1").for_step("s0")];

        let output = RunReport(RunOutcome { ok: false, plan }).to_string();
        assert!(output.starts_with("Plan failed: 1 of 2 steps attempted, 0 succeeded"));
        assert!(output.contains("- Result: ✗ failed"));
        assert!(output.contains("- Result: not attempted"));
        assert!(output.contains("- Error: Process exit status: 1"));
    }

    #[test]
    fn test_run_report_completed() {
        let mut plan = create_test_plan();
        plan.status = PlanStatus::Completed;
        plan.finished_at = Some(Timestamp::now());
        plan.results = vec![
            ExecutionResult::success("t1", "echo one", "one\n").for_step("s0"),
            ExecutionResult::success("t2", "echo two", "two\n").for_step("s1"),
        ];

        let output = RunReport(RunOutcome { ok: true, plan }).to_string();
        assert!(output.starts_with("Plan completed: 2/2 steps succeeded"));
        assert!(output.contains("#### stdout"));
        assert!(output.contains("two"));
    }

    #[test]
    fn test_kill_result_display() {
        let record = ProcessRecord {
            tracking_id: "t-9".to_string(),
            pid: 77,
            command: "sleep 100".to_string(),
            work_dir: PathBuf::from("/tmp"),
            started_at: Timestamp::now(),
            killed: true,
        };
        let output = KillResult(record).to_string();
        assert!(output.starts_with("Termination requested for process 77 (`sleep 100`)"));
    }
}
