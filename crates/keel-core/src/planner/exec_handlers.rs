//! Gate and sandbox handler operations for the Planner.
//!
//! Interfaces reach the security gate and the executor only through these
//! methods, so every command they run is classified first.

use std::time::Duration;

use log::warn;

use super::Planner;
use crate::{
    display::{DangerPatterns, History, KillResult, OperationStatus, Processes, Whitelist},
    error::{KeelError, Result},
    models::{ExecutionResult, SecurityReport, Verdict},
    params::{
        ClassifyCommand, ClassifyOperation, ExecutionHistory, InstallPackages, KillProcess,
        PatternEntry, RunCode, RunSandboxed, WhitelistEntry,
    },
    sandbox::RunOptions,
};

impl Planner {
    /// Handle classifying a shell command line.
    pub fn classify_command(&self, params: &ClassifyCommand) -> Verdict {
        self.gate.classify(&params.command)
    }

    /// Handle classifying a file or process operation.
    pub fn classify_operation(&self, params: &ClassifyOperation) -> Verdict {
        self.gate
            .classify_operation(params.operation, params.target.as_deref())
    }

    pub fn list_whitelist(&self) -> Whitelist {
        Whitelist(self.gate.whitelist())
    }

    /// Handle adding a whitelist entry.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an empty entry.
    pub fn add_to_whitelist(&self, params: &WhitelistEntry) -> Result<OperationStatus> {
        let command = params.command.trim();
        let added = self.gate.add_to_whitelist(command)?;
        Ok(OperationStatus::changed(
            added,
            format!("Added `{command}` to the whitelist"),
            format!("`{command}` is already whitelisted"),
        ))
    }

    /// Handle removing a whitelist entry.
    pub fn remove_from_whitelist(&self, params: &WhitelistEntry) -> OperationStatus {
        let command = params.command.trim();
        OperationStatus::changed(
            self.gate.remove_from_whitelist(command),
            format!("Removed `{command}` from the whitelist"),
            format!("`{command}` is not whitelisted"),
        )
    }

    pub fn list_danger_patterns(&self) -> DangerPatterns {
        DangerPatterns(self.gate.danger_patterns())
    }

    /// Handle adding a danger pattern.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Pattern` if the pattern is not a valid regex.
    pub fn add_danger_pattern(&self, params: &PatternEntry) -> Result<OperationStatus> {
        let added = self.gate.add_danger_pattern(&params.pattern)?;
        Ok(OperationStatus::changed(
            added,
            format!("Added danger pattern `{}`", params.pattern),
            format!("Danger pattern `{}` already exists", params.pattern),
        ))
    }

    /// Handle removing a danger pattern.
    pub fn remove_danger_pattern(&self, params: &PatternEntry) -> OperationStatus {
        OperationStatus::changed(
            self.gate.remove_danger_pattern(&params.pattern),
            format!("Removed danger pattern `{}`", params.pattern),
            format!("Danger pattern `{}` not found", params.pattern),
        )
    }

    pub fn security_report(&self) -> SecurityReport {
        self.gate.report()
    }

    /// Handle running a command in the sandbox.
    ///
    /// The full command line (program and arguments) is classified first; a
    /// denied command is reported as a failed result carrying the verdict and
    /// never spawned.
    pub async fn run_sandboxed(&self, params: &RunSandboxed) -> ExecutionResult {
        let line = if params.args.is_empty() {
            params.command.clone()
        } else {
            format!("{} {}", params.command, params.args.join(" "))
        };

        let verdict = self.gate.classify(&line);
        if !verdict.allow {
            warn!("Refusing to run `{line}`: {}", verdict.reason);
            return ExecutionResult::denied(uuid::Uuid::new_v4().to_string(), line, verdict);
        }

        let options = RunOptions {
            timeout: params.timeout_ms.map(Duration::from_millis),
            work_dir: params.work_dir.as_ref().map(Into::into),
            env: params.env.clone(),
        };
        self.executor
            .execute_with(&params.command, &params.args, &options)
            .await
    }

    /// Handle running a code snippet in the sandbox.
    ///
    /// Snippets matching a danger pattern are refused without touching the
    /// filesystem.
    pub async fn run_code(&self, params: &RunCode) -> ExecutionResult {
        let verdict = self.gate.classify_code(params.language, &params.source);
        if !verdict.allow {
            warn!(
                "Refusing to run {} snippet: {}",
                params.language, verdict.reason
            );
            return ExecutionResult::denied(
                uuid::Uuid::new_v4().to_string(),
                format!("{} snippet", params.language),
                verdict,
            );
        }

        let options = RunOptions {
            timeout: params.timeout_ms.map(Duration::from_millis),
            work_dir: params.work_dir.as_ref().map(Into::into),
            env: params.env.clone(),
        };
        self.executor
            .execute_code(params.language, &params.source, &options)
            .await
    }

    /// Handle installing packages with a package manager.
    ///
    /// The install command line goes through the gate like any other
    /// command and runs without a shell, under the configured install
    /// timeout unless the caller gives one.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an empty package list or a
    /// package name that is blank, contains whitespace or looks like a flag.
    pub async fn install_packages(&self, params: &InstallPackages) -> Result<ExecutionResult> {
        if params.packages.is_empty() {
            return Err(KeelError::validation("packages").with_reason("No packages given"));
        }
        if let Some(bad) = params.packages.iter().find(|name| {
            name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace)
        }) {
            return Err(KeelError::validation("packages")
                .with_reason(format!("Invalid package name '{bad}'")));
        }

        let program = params.manager.program();
        let args = params.manager.install_args(&params.packages);
        let line = format!("{program} {}", args.join(" "));

        let verdict = self.gate.classify(&line);
        if !verdict.allow {
            warn!("Refusing to run `{line}`: {}", verdict.reason);
            return Ok(ExecutionResult::denied(
                uuid::Uuid::new_v4().to_string(),
                line,
                verdict,
            ));
        }

        let install_timeout = Duration::from_secs(self.executor.settings().install_timeout_secs);
        let options = RunOptions {
            timeout: Some(
                params
                    .timeout_ms
                    .map_or(install_timeout, Duration::from_millis),
            ),
            work_dir: params.work_dir.as_ref().map(Into::into),
            ..RunOptions::default()
        };
        Ok(self.executor.execute_with(program, &args, &options).await)
    }

    pub fn list_processes(&self) -> Processes {
        Processes(self.executor.list_running())
    }

    /// Handle a kill request by tracking ID or pid.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::ProcessNotFound` if nothing running matches.
    pub fn kill_process(&self, params: &KillProcess) -> Result<KillResult> {
        self.executor.kill(params.target.trim()).map(KillResult)
    }

    pub fn execution_history(&self, params: &ExecutionHistory) -> History {
        History(self.executor.history(params.limit))
    }

    pub fn clear_history(&self) -> OperationStatus {
        let cleared = self.executor.clear_history();
        OperationStatus::success(format!("Cleared {cleared} history entries"))
    }
}
