//! Execution results and process bookkeeping records.

use std::path::PathBuf;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::Verdict;

/// Result of one sandboxed execution or plan step.
///
/// Produced exactly once and never mutated afterwards. Every failure mode
/// (gate denial, spawn error, timeout, non-zero exit) is encoded here rather
/// than returned as an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// Tracking ID assigned when the execution was admitted
    pub tracking_id: String,

    /// Plan step that produced this result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,

    /// Command line or description of what ran
    pub command: String,

    /// True only for a clean zero exit that was not killed
    pub ok: bool,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,

    /// Whether either stream hit the capture limit
    #[serde(default)]
    pub truncated: bool,

    /// Exit code; absent when the process never started or died to a signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Whether the process was terminated by a timeout or a kill request
    #[serde(default)]
    pub killed: bool,

    /// OS process id; absent when the spawn failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub elapsed_ms: u64,

    /// Why the execution failed before or outside the process itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the pool was full; retry after this many milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,

    /// The gate verdict that denied this execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl ExecutionResult {
    /// A result for an execution that never produced a process.
    pub fn failure(
        tracking_id: impl Into<String>,
        command: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            step_id: None,
            command: command.into(),
            ok: false,
            stdout: String::new(),
            stderr: String::new(),
            truncated: false,
            exit_code: None,
            killed: false,
            pid: None,
            elapsed_ms: 0,
            error: Some(error.into()),
            retry_after_ms: None,
            verdict: None,
        }
    }

    /// A successful result carrying only captured output, used for
    /// in-process actions.
    pub fn success(
        tracking_id: impl Into<String>,
        command: impl Into<String>,
        stdout: impl Into<String>,
    ) -> Self {
        Self {
            ok: true,
            stdout: stdout.into(),
            error: None,
            ..Self::failure(tracking_id, command, String::new())
        }
    }

    /// A result for an action the security gate refused.
    pub fn denied(tracking_id: impl Into<String>, command: impl Into<String>, verdict: Verdict) -> Self {
        let mut result = Self::failure(
            tracking_id,
            command,
            format!("Access denied ({}): {}", verdict.level.as_str(), verdict.reason),
        );
        result.verdict = Some(verdict);
        result
    }

    /// Attach the producing step.
    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Whether the gate refused this execution.
    pub fn was_denied(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| !v.allow)
    }
}

/// A process currently tracked by the sandbox registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRecord {
    pub tracking_id: String,
    pub pid: u32,
    pub command: String,
    pub work_dir: PathBuf,
    pub started_at: Timestamp,
    /// Set once a kill has been requested
    pub killed: bool,
}

/// A finished execution as kept in the sandbox history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub tracking_id: String,
    pub command: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub killed: bool,
    pub stdout_len: usize,
    pub stderr_len: usize,
    pub elapsed_ms: u64,
    pub finished_at: Timestamp,
}

impl From<&ExecutionResult> for HistoryEntry {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            tracking_id: result.tracking_id.clone(),
            command: result.command.clone(),
            ok: result.ok,
            exit_code: result.exit_code,
            killed: result.killed,
            stdout_len: result.stdout.len(),
            stderr_len: result.stderr.len(),
            elapsed_ms: result.elapsed_ms,
            finished_at: Timestamp::now(),
        }
    }
}
