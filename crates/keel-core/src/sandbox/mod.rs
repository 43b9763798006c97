//! Sandboxed execution of commands and code snippets.
//!
//! The [`Executor`] spawns child processes with piped, size-capped output,
//! enforces a per-execution timeout and tracks every live child in a
//! [`ProcessRegistry`] so it can be listed or killed from elsewhere.
//!
//! Termination always escalates the same way, whether triggered by a
//! timeout or by [`Executor::kill`]: SIGTERM to the child's process group,
//! then SIGKILL once the grace period has passed.
//!
//! The executor does not classify anything. Callers are expected to consult
//! the [`SecurityGate`](crate::gate::SecurityGate) first; the
//! [`Planner`](crate::Planner) does.

use std::{
    collections::{BTreeMap, VecDeque},
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use log::{debug, warn};
use tokio::{process::Command, sync::Semaphore, task::JoinHandle};

use crate::{
    config::SandboxSettings,
    error::Result,
    models::{ExecutionResult, HistoryEntry, Language, ProcessRecord},
};

mod code;
mod output;
mod registry;
mod sanitize;
mod signal;


use code::{Invocation, ScratchScript};
use output::{read_capped, Captured};
pub use registry::ProcessRegistry;
pub use sanitize::sanitize;
use signal::Signal;

/// Suggested back-off when the code pool is full.
pub const POOL_RETRY_AFTER_MS: u64 = 5_000;

/// How long output pipes may stay open after the child has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Per-call options for an execution.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the configured default timeout
    pub timeout: Option<Duration>,
    /// Working directory; defaults to the current directory for commands and
    /// to the scratch directory for code
    pub work_dir: Option<PathBuf>,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
}

impl RunOptions {
    pub fn new(work_dir: Option<&Path>, timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            work_dir: work_dir.map(Path::to_path_buf),
            env: BTreeMap::new(),
        }
    }
}

/// Why the wait on a child ended.
#[derive(Debug)]
enum Stop {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Killed,
}

/// Runs child processes under the configured limits.
#[derive(Debug)]
pub struct Executor {
    settings: SandboxSettings,
    scratch_dir: PathBuf,
    pool: Arc<Semaphore>,
    registry: ProcessRegistry,
    history: Mutex<VecDeque<HistoryEntry>>,
}

impl Executor {
    /// Creates an executor writing code snippets into `scratch_dir`, which
    /// must already exist.
    pub fn new(settings: SandboxSettings, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool: Arc::new(Semaphore::new(settings.max_concurrency)),
            scratch_dir: scratch_dir.into(),
            registry: ProcessRegistry::new(),
            history: Mutex::new(VecDeque::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Code executions currently holding a pool slot.
    pub fn in_flight(&self) -> usize {
        self.settings
            .max_concurrency
            .saturating_sub(self.pool.available_permits())
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.default_timeout_secs)
    }

    /// Run a program with arguments.
    ///
    /// See [`Executor::execute_with`].
    pub async fn execute(
        &self,
        command: &str,
        args: &[String],
        work_dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        self.execute_with(command, args, &RunOptions::new(work_dir, timeout))
            .await
    }

    /// Run a program with arguments under `options`.
    ///
    /// With no arguments and whitespace in `command`, the command is treated
    /// as a shell line and handed to [`Executor::run_shell_with`]. Otherwise
    /// the program is spawned directly, without a shell.
    pub async fn execute_with(
        &self,
        command: &str,
        args: &[String],
        options: &RunOptions,
    ) -> ExecutionResult {
        let command = command.trim();
        if args.is_empty() && command.contains(char::is_whitespace) {
            return self.run_shell_with(command, options).await;
        }

        let tracking_id = new_tracking_id();
        if command.is_empty() {
            return ExecutionResult::failure(tracking_id, command, "Empty command");
        }

        let invocation = Invocation::new(command, args.to_vec());
        self.run_in(&tracking_id, invocation, options.work_dir.as_deref(), options)
            .await
    }

    /// Run a command line through the configured shell after sanitizing it.
    pub async fn run_shell(
        &self,
        line: &str,
        work_dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        self.run_shell_with(line, &RunOptions::new(work_dir, timeout))
            .await
    }

    pub async fn run_shell_with(&self, line: &str, options: &RunOptions) -> ExecutionResult {
        let tracking_id = new_tracking_id();
        let invocation = Invocation::new(
            self.settings.shell.clone(),
            vec!["-c".to_string(), sanitize(line)],
        )
        .displayed_as(line.trim());
        self.run_in(&tracking_id, invocation, options.work_dir.as_deref(), options)
            .await
    }

    /// Write a snippet to a scratch file and run it with the language's
    /// interpreter.
    ///
    /// At most `max_concurrency` snippets run at once; beyond that the call
    /// fails immediately with a retry hint instead of queueing. Results are
    /// labelled `<language> snippet`, since the scratch file is gone by the
    /// time the caller sees them.
    pub async fn execute_code(
        &self,
        language: Language,
        source: &str,
        options: &RunOptions,
    ) -> ExecutionResult {
        let tracking_id = new_tracking_id();
        let description = format!("{} snippet", language.as_str());

        let Ok(_permit) = Arc::clone(&self.pool).try_acquire_owned() else {
            warn!("Code pool full, rejecting {description}");
            let mut result = ExecutionResult::failure(
                tracking_id,
                description,
                format!(
                    "Pool full ({} executions in flight), retry after {POOL_RETRY_AFTER_MS} ms",
                    self.settings.max_concurrency
                ),
            );
            result.retry_after_ms = Some(POOL_RETRY_AFTER_MS);
            return result;
        };

        let mut script = match ScratchScript::write(&self.scratch_dir, language, source).await {
            Ok(script) => script,
            Err(e) => return ExecutionResult::failure(tracking_id, description, e.to_string()),
        };

        let work_dir = options.work_dir.as_deref().unwrap_or(&self.scratch_dir);

        if let Some(compile) = script.compile() {
            let compile = compile.displayed_as(description.clone());
            let compiled = self.run_in(&tracking_id, compile, Some(work_dir), options).await;
            if !compiled.ok {
                debug!("Compilation of {} failed", script.path().display());
                return compiled;
            }
        }

        let run = script.run().displayed_as(description);
        let result = self.run_in(&tracking_id, run, Some(work_dir), options).await;
        drop(script);
        result
    }

    async fn run_in(
        &self,
        tracking_id: &str,
        invocation: Invocation,
        work_dir: Option<&Path>,
        options: &RunOptions,
    ) -> ExecutionResult {
        let work_dir = match resolve_work_dir(work_dir).await {
            Ok(dir) => dir,
            Err(message) => {
                return self.record(ExecutionResult::failure(
                    tracking_id,
                    invocation.display,
                    message,
                ))
            }
        };
        let timeout = options.timeout.unwrap_or_else(|| self.default_timeout());
        let result = self
            .spawn_and_wait(tracking_id, invocation, work_dir, timeout, &options.env)
            .await;
        self.record(result)
    }

    async fn spawn_and_wait(
        &self,
        tracking_id: &str,
        invocation: Invocation,
        work_dir: PathBuf,
        timeout: Duration,
        env: &BTreeMap<String, String>,
    ) -> ExecutionResult {
        let started = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(env)
            .current_dir(&work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn `{}`: {e}", invocation.display);
                return ExecutionResult::failure(
                    tracking_id,
                    invocation.display,
                    format!("Failed to spawn {}: {e}", invocation.program.display()),
                )
                .with_elapsed_ms(elapsed_ms(started));
            }
        };

        let pid = child.id();
        debug!("Spawned `{}` as pid {pid:?} ({tracking_id})", invocation.display);

        let limit = self.settings.max_output_bytes;
        let mut stdout_task = child.stdout.take().map(|s| tokio::spawn(read_capped(s, limit)));
        let mut stderr_task = child.stderr.take().map(|s| tokio::spawn(read_capped(s, limit)));

        let registration = self.registry.register(
            tracking_id,
            pid.unwrap_or_default(),
            &invocation.display,
            work_dir,
        );

        let stop = tokio::select! {
            status = child.wait() => Stop::Exited(status),
            () = tokio::time::sleep(timeout) => Stop::TimedOut,
            () = registration.cancel().notified() => Stop::Killed,
        };

        let (status, killed, error) = match stop {
            Stop::Exited(status) => (status, false, None),
            Stop::TimedOut => {
                warn!("`{}` timed out after {} ms", invocation.display, timeout.as_millis());
                let status = self.terminate(&mut child).await;
                let message = format!("Timed out after {} ms", timeout.as_millis());
                (status, true, Some(message))
            }
            Stop::Killed => {
                warn!("Killing `{}` on request", invocation.display);
                let status = self.terminate(&mut child).await;
                (status, true, Some("Killed on request".to_string()))
            }
        };

        let (stdout, stderr) = collect_output(pid, &mut stdout_task, &mut stderr_task).await;
        drop(registration);

        let (exit_code, ok, error) = match status {
            Ok(status) => {
                let ok = !killed && status.success();
                let error = error.or_else(|| (!ok).then(|| format!("Process {status}")));
                (status.code(), ok, error)
            }
            Err(e) => (None, false, Some(format!("Failed to wait for process: {e}"))),
        };

        debug!(
            "`{}` finished: ok={ok} exit={exit_code:?} killed={killed}",
            invocation.display
        );

        ExecutionResult {
            tracking_id: tracking_id.to_string(),
            step_id: None,
            command: invocation.display,
            ok,
            truncated: stdout.truncated || stderr.truncated,
            stdout: stdout.text,
            stderr: stderr.text,
            exit_code,
            killed,
            pid,
            elapsed_ms: elapsed_ms(started),
            error,
            retry_after_ms: None,
            verdict: None,
        }
    }

    /// SIGTERM, wait out the grace period, then SIGKILL.
    async fn terminate(&self, child: &mut tokio::process::Child) -> io::Result<ExitStatus> {
        if let Err(e) = signal::signal_child(child, Signal::Terminate) {
            debug!("SIGTERM failed: {e}");
        }

        let grace = Duration::from_millis(self.settings.grace_period_ms);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!("Process {:?} outlived the grace period, sending SIGKILL", child.id());
                if let Err(e) = signal::signal_child(child, Signal::Kill) {
                    debug!("SIGKILL failed: {e}");
                }
                child.wait().await
            }
        }
    }

    fn record(&self, result: ExecutionResult) -> ExecutionResult {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_back(HistoryEntry::from(&result));
        while history.len() > self.settings.history_limit {
            history.pop_front();
        }
        result
    }

    /// Processes that are still running.
    pub fn list_running(&self) -> Vec<ProcessRecord> {
        self.registry.list()
    }

    /// Terminate a running process by tracking ID or pid.
    ///
    /// Returns once the request is registered; the execution that owns the
    /// process reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::ProcessNotFound` if nothing running matches.
    pub fn kill(&self, target: &str) -> Result<ProcessRecord> {
        self.registry.kill(target)
    }

    /// Completed executions, most recent first.
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Drop the history, returning how many entries were removed.
    pub fn clear_history(&self) -> usize {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let cleared = history.len();
        history.clear();
        cleared
    }
}

fn new_tracking_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn resolve_work_dir(work_dir: Option<&Path>) -> std::result::Result<PathBuf, String> {
    let dir = match work_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| format!("Cannot determine working directory: {e}"))?,
    };
    match tokio::fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => Ok(dir),
        _ => Err(format!("Working directory does not exist: {}", dir.display())),
    }
}

/// Wait for both reader tasks.
///
/// A pipe can outlive the child when a grandchild inherited it, so the group
/// is killed if the readers do not finish shortly after exit.
async fn collect_output(
    pid: Option<u32>,
    stdout_task: &mut Option<JoinHandle<Captured>>,
    stderr_task: &mut Option<JoinHandle<Captured>>,
) -> (Captured, Captured) {
    async fn join(task: &mut Option<JoinHandle<Captured>>) -> Captured {
        match task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Captured::default(),
        }
    }

    let drained = {
        let readers = async { tokio::join!(join(stdout_task), join(stderr_task)) };
        tokio::pin!(readers);

        match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut readers).await {
            Ok(captured) => Some(captured),
            Err(_) => {
                debug!("Output still open after exit, killing process group");
                if let Some(pid) = pid {
                    let _ = signal::signal_group(pid, Signal::Kill);
                }
                tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, readers).await.ok()
            }
        }
    };

    drained.unwrap_or_else(|| {
        for handle in [stdout_task.as_ref(), stderr_task.as_ref()].into_iter().flatten() {
            handle.abort();
        }
        (Captured::default(), Captured::default())
    })
}
