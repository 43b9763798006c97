//! Display implementations for domain models.
//!
//! Every model renders as Markdown so the CLI can hand it to the terminal
//! renderer and the MCP server can return it as text content unchanged.

use std::fmt;

use super::time::{Elapsed, LocalDateTime};
use crate::{
    gate::DangerPattern,
    models::{
        ConfirmationRequest, Estimate, ExecutionResult, HistoryEntry, Language, Plan, PlanStatus,
        PlanSummary, ProcessRecord, RiskLevel, SecurityReport, Step, StepAction, Verdict,
    },
};

/// Longest output excerpt shown inline for a result.
const OUTPUT_EXCERPT_CHARS: usize = 2_000;

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "~{}s, risk {:.2}, cost {}",
            self.time_secs, self.risk, self.cost
        )
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        writeln!(f)?;

        writeln!(f, "- ID: {}", self.id)?;
        writeln!(f, "- Status: {}", self.status.with_icon())?;
        writeln!(f, "- Estimate: {}", self.estimate)?;
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        if let Some(started) = &self.started_at {
            writeln!(f, "- Started: {}", LocalDateTime(started))?;
        }
        if let Some(finished) = &self.finished_at {
            writeln!(f, "- Finished: {}", LocalDateTime(finished))?;
        }

        writeln!(f, "\n## Steps")?;
        writeln!(f)?;
        for step in &self.steps {
            let prerequisites: Vec<String> = self
                .graph
                .prerequisites(&step.id)
                .into_iter()
                .filter_map(|id| self.step(id))
                .map(|prerequisite| (prerequisite.order + 1).to_string())
                .collect();

            write!(f, "{step}")?;
            if !prerequisites.is_empty() {
                writeln!(f, "- After: {}", prerequisites.join(", "))?;
            }
            match self.result_for(&step.id) {
                Some(result) => writeln!(f, "- Result: {}", result_badge(result))?,
                None if self.finished_at.is_some() => writeln!(f, "- Result: not attempted")?,
                None => {}
            }
            writeln!(f)?;
        }

        if !self.results.is_empty() {
            writeln!(f, "## Results")?;
            writeln!(f)?;
            for result in &self.results {
                let title = result
                    .step_id
                    .as_deref()
                    .and_then(|id| self.step(id))
                    .map_or(result.command.as_str(), |step| step.title.as_str());
                writeln!(f, "### {title}")?;
                writeln!(f)?;
                write!(f, "{result}")?;
            }
        }

        Ok(())
    }
}

fn result_badge(result: &ExecutionResult) -> String {
    if result.ok {
        format!("✓ ok ({})", Elapsed(result.elapsed_ms))
    } else if result.was_denied() {
        "✗ denied".to_string()
    } else if result.killed {
        "✗ killed".to_string()
    } else {
        "✗ failed".to_string()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### {}. {}", self.order + 1, self.title)?;
        writeln!(f)?;
        writeln!(f, "- Action: {}", self.action)?;
        if let Some(key) = &self.key {
            writeln!(f, "- Key: `{key}`")?;
        }
        writeln!(f, "- Timeout: {}s", self.timeout_secs)?;
        if !self.block_on_fail {
            writeln!(f, "- Continues on failure")?;
        }
        Ok(())
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Command { command } => write!(f, "`{command}`"),
            StepAction::Code { language, source } => {
                let lines = source.lines().count();
                write!(f, "{language} snippet ({lines} lines)")
            }
            StepAction::Callback { label, .. } => write!(f, "callback `{label}`"),
            StepAction::Noop { note: Some(note) } => write!(f, "{note}"),
            StepAction::Noop { note: None } => write!(f, "nothing to run"),
        }
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## {} (ID: {}) ({}/{})",
            self.title, self.id, self.succeeded_steps, self.total_steps
        )?;
        writeln!(f)?;
        writeln!(f, "- **Status**: {}", self.status.with_icon())?;
        writeln!(f, "- **Risk**: {:.2}", self.risk)?;
        writeln!(f, "- **Created**: {}", LocalDateTime(&self.created_at))?;
        if let Some(finished) = &self.finished_at {
            writeln!(
                f,
                "- **Finished**: {} ({} of {} steps attempted)",
                LocalDateTime(finished),
                self.attempted_steps,
                self.total_steps
            )?;
        }
        writeln!(f)?;
        Ok(())
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decision = if self.allow { "✓ Allowed" } else { "✗ Denied" };
        writeln!(f, "**{decision}** ({})", self.level)?;
        writeln!(f)?;
        writeln!(f, "- Reason: {}", self.reason)?;
        writeln!(
            f,
            "- Confirmation: {}",
            if self.need_confirm { "required" } else { "not needed" }
        )?;

        if !self.mitigations.is_empty() {
            writeln!(f)?;
            writeln!(f, "#### Mitigations")?;
            writeln!(f)?;
            for mitigation in &self.mitigations {
                writeln!(f, "- {mitigation}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Command: `{}`", self.command)?;
        writeln!(f, "- Outcome: {}", result_badge(self))?;
        if let Some(code) = self.exit_code {
            writeln!(f, "- Exit code: {code}")?;
        }
        if let Some(pid) = self.pid {
            writeln!(f, "- PID: {pid}")?;
        }
        writeln!(f, "- Elapsed: {}", Elapsed(self.elapsed_ms))?;
        writeln!(f, "- Tracking ID: {}", self.tracking_id)?;
        if let Some(error) = &self.error {
            writeln!(f, "- Error: {error}")?;
        }
        if let Some(retry) = self.retry_after_ms {
            writeln!(f, "- Retry after: {}", Elapsed(retry))?;
        }
        writeln!(f)?;

        write_output(f, "stdout", &self.stdout)?;
        write_output(f, "stderr", &self.stderr)?;
        if self.truncated {
            writeln!(f, "_Output truncated at the capture limit._")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_output(f: &mut fmt::Formatter<'_>, label: &str, text: &str) -> fmt::Result {
    let text = text.trim_end();
    if text.is_empty() {
        return Ok(());
    }

    writeln!(f, "#### {label}")?;
    writeln!(f)?;
    writeln!(f, "```")?;
    if text.chars().count() > OUTPUT_EXCERPT_CHARS {
        let excerpt: String = text.chars().take(OUTPUT_EXCERPT_CHARS).collect();
        writeln!(f, "{excerpt}")?;
        writeln!(f, "...")?;
    } else {
        writeln!(f, "{text}")?;
    }
    writeln!(f, "```")?;
    writeln!(f)
}

impl fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.killed { " (killing)" } else { "" };
        writeln!(f, "- **{}** `{}`{state}", self.pid, self.command)?;
        writeln!(f, "  - Tracking ID: {}", self.tracking_id)?;
        writeln!(f, "  - Directory: {}", self.work_dir.display())?;
        writeln!(f, "  - Started: {}", LocalDateTime(&self.started_at))
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match (self.ok, self.killed, self.exit_code) {
            (true, _, _) => "✓".to_string(),
            (false, true, _) => "✗ killed".to_string(),
            (false, false, Some(code)) => format!("✗ exit {code}"),
            (false, false, None) => "✗ not started".to_string(),
        };
        writeln!(
            f,
            "- {outcome} `{}` ({}, {} B out, {} B err) at {}",
            self.command,
            Elapsed(self.elapsed_ms),
            self.stdout_len,
            self.stderr_len,
            LocalDateTime(&self.finished_at)
        )
    }
}

impl fmt::Display for DangerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description() == self.pattern() {
            writeln!(f, "- `{}`", self.pattern())
        } else {
            writeln!(f, "- {}: `{}`", self.description(), self.pattern())
        }
    }
}

impl fmt::Display for SecurityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Security Report")?;
        writeln!(f)?;
        writeln!(f, "- Generated: {}", LocalDateTime(&self.generated_at))?;
        writeln!(f, "- Whitelisted commands: {}", self.whitelist_size)?;
        writeln!(f, "- Danger patterns: {}", self.danger_patterns)?;
        writeln!(f, "- Sensitive paths: {}", self.sensitive_paths)?;
        writeln!(f)?;
        writeln!(f, "## Recommendations")?;
        writeln!(f)?;
        for recommendation in &self.recommendations {
            writeln!(f, "- {recommendation}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfirmationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "**{}**", self.message)?;
        writeln!(f)?;
        writeln!(f, "{}", self.warning)?;
        writeln!(f)?;
        writeln!(f, "- Operation: {}", self.operation)?;
        writeln!(f, "- Detail: {}", self.detail)?;
        writeln!(f, "- Requested: {}", LocalDateTime(&self.requested_at))
    }
}
