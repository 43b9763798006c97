//! MCP server implementation for keel
//!
//! Exposes plan building and running, the security gate and the sandbox to
//! AI assistants over the Model Context Protocol.

use std::sync::Arc;

use anyhow::Result;
use keel_core::Planner;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use handlers::{
    BuildPlan, ClassifyCommand, ClassifyOperation, ExecutionHistory, Id, InstallPackages,
    KillProcess, McpHandlers, McpResult, PatternEntry, RunCode, RunSandboxed, WhitelistEntry,
};

const INSTRUCTIONS: &str = r#"keel builds dependency-ordered plans from loose task specifications and runs their commands behind a security gate, in sandboxed child processes with timeouts and capped output.

## Plans
- `build_plan` accepts a list of steps, a single command string, an object with a `steps` list, or a single step object. Steps may carry `key`, `title`, `cmd` (or `code` with `language`), `after` (keys or 0-based positions), `timeout` (seconds), `block_on_fail` and `cost`.
- `run_plan` runs the steps one at a time in dependency order and stops at the first failing step unless it was built with `block_on_fail: false`.
- A `work_dir` entry in the plan context sets the working directory of command steps.

## Security Gate
Every command is checked before it runs: danger patterns first (CRITICAL, refused), then the whitelist (LOW, allowed), otherwise it is refused as unrecognized (MEDIUM). Use `classify_command` to check without running, and `add_to_whitelist` to allow a new command prefix.

## Sandbox
`run_sandboxed`, `run_code` and `install_packages` return an execution result even when the command fails or is refused; read its outcome. `env` adds variables to the process environment. Long-running processes show up in `list_processes` and can be stopped with `kill_process` (SIGTERM, then SIGKILL after a grace period).

## Tool Categories
- **Plans**: build_plan, run_plan, show_plan, list_plans, delete_plan
- **Gate**: classify_command, classify_operation, list_whitelist, add_to_whitelist, remove_from_whitelist, list_danger_patterns, add_danger_pattern, remove_danger_pattern, security_report
- **Sandbox**: run_sandboxed, run_code, install_packages, list_processes, kill_process, execution_history, clear_history"#;

/// MCP server for keel
///
/// The planner synchronizes internally, so handlers share it without a lock
/// and `kill_process` can reach a process started by a `run_plan` still in
/// flight.
#[derive(Clone)]
pub struct KeelMcpServer {
    planner: Arc<Planner>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl KeelMcpServer {
    pub fn new(planner: Planner) -> Self {
        Self {
            planner: Arc::new(planner),
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> McpHandlers {
        McpHandlers::new(Arc::clone(&self.planner))
    }

    #[tool(
        name = "build_plan",
        description = "Build a plan from a task specification without running it. `spec` is a list of steps (strings or step objects), a single command string, an object with `title` and `steps`, or a single step object. Step objects take `key`, `title`, `cmd` (or `code` with `language`), `after` (keys or 0-based positions), `timeout` (seconds), `block_on_fail` and `cost`. Returns the plan ID, the ordered steps and an estimate."
    )]
    async fn build_plan(&self, params: Parameters<BuildPlan>) -> McpResult {
        self.handlers().build_plan(params)
    }

    #[tool(
        name = "run_plan",
        description = "Run a built plan to completion. Steps run one at a time in dependency order; every command passes the security gate first. A failing step halts the plan unless it was marked non-blocking. Returns the outcome and every step result."
    )]
    async fn run_plan(&self, params: Parameters<Id>) -> McpResult {
        self.handlers().run_plan(params).await
    }

    #[tool(
        name = "show_plan",
        description = "Show a plan with its steps, estimate and the results of its latest run."
    )]
    async fn show_plan(&self, params: Parameters<Id>) -> McpResult {
        self.handlers().show_plan(params)
    }

    #[tool(
        name = "list_plans",
        description = "List every plan built in this session with its status and how many steps succeeded."
    )]
    async fn list_plans(&self) -> McpResult {
        self.handlers().list_plans()
    }

    #[tool(
        name = "delete_plan",
        description = "Delete a plan that is not running."
    )]
    async fn delete_plan(&self, params: Parameters<Id>) -> McpResult {
        self.handlers().delete_plan(params)
    }

    #[tool(
        name = "classify_command",
        description = "Check a command line against the security gate without running it. Returns whether it is allowed, its risk level (LOW, MEDIUM, HIGH, CRITICAL), the reason, whether confirmation is advised and mitigations."
    )]
    async fn classify_command(&self, params: Parameters<ClassifyCommand>) -> McpResult {
        self.handlers().classify_command(params)
    }

    #[tool(
        name = "classify_operation",
        description = "Classify a file or process operation (delete_file, delete_dir, write_file, move_file, copy_file, read_file, create_directory, run_command, execute_code) on an optional target path. HIGH-risk operations are only allowed under safe roots; system locations are always refused."
    )]
    async fn classify_operation(&self, params: Parameters<ClassifyOperation>) -> McpResult {
        self.handlers().classify_operation(params)
    }

    #[tool(
        name = "list_whitelist",
        description = "List the command prefixes the security gate allows."
    )]
    async fn list_whitelist(&self) -> McpResult {
        self.handlers().list_whitelist()
    }

    #[tool(
        name = "add_to_whitelist",
        description = "Allow a command prefix, e.g. `terraform plan`. Danger patterns still take precedence over the whitelist."
    )]
    async fn add_to_whitelist(&self, params: Parameters<WhitelistEntry>) -> McpResult {
        self.handlers().add_to_whitelist(params)
    }

    #[tool(
        name = "remove_from_whitelist",
        description = "Stop allowing a command prefix."
    )]
    async fn remove_from_whitelist(&self, params: Parameters<WhitelistEntry>) -> McpResult {
        self.handlers().remove_from_whitelist(params)
    }

    #[tool(
        name = "list_danger_patterns",
        description = "List the regular expressions that make a command CRITICAL and refused."
    )]
    async fn list_danger_patterns(&self) -> McpResult {
        self.handlers().list_danger_patterns()
    }

    #[tool(
        name = "add_danger_pattern",
        description = "Refuse every command line matching a regular expression, even whitelisted ones."
    )]
    async fn add_danger_pattern(&self, params: Parameters<PatternEntry>) -> McpResult {
        self.handlers().add_danger_pattern(params)
    }

    #[tool(
        name = "remove_danger_pattern",
        description = "Remove a danger pattern by its exact regular expression text."
    )]
    async fn remove_danger_pattern(&self, params: Parameters<PatternEntry>) -> McpResult {
        self.handlers().remove_danger_pattern(params)
    }

    #[tool(
        name = "security_report",
        description = "Summarize the gate configuration: whitelist size, danger pattern count, sensitive paths and recommendations."
    )]
    async fn security_report(&self) -> McpResult {
        self.handlers().security_report()
    }

    #[tool(
        name = "run_sandboxed",
        description = "Run a command in a sandboxed child process after the security gate allows it. With `args`, the program runs without a shell; without them, `command` is a full shell command line. Optional `work_dir`, `timeout_ms` and `env` (extra environment variables). Refusals, timeouts and failures are reported in the result, not as errors."
    )]
    async fn run_sandboxed(&self, params: Parameters<RunSandboxed>) -> McpResult {
        self.handlers().run_sandboxed(params).await
    }

    #[tool(
        name = "run_code",
        description = "Run a snippet of python, javascript, typescript or shell code in the sandbox after the security gate checks its source. The snippet is written to a scratch file that is removed afterwards. Optional `work_dir`, `timeout_ms` and `env`."
    )]
    async fn run_code(&self, params: Parameters<RunCode>) -> McpResult {
        self.handlers().run_code(params).await
    }

    #[tool(
        name = "install_packages",
        description = "Install packages with npm (default), yarn, pnpm, pip or pip3 after the security gate allows the install command. Package names may not be blank, contain whitespace or start with `-`. Runs under the install timeout unless `timeout_ms` is given."
    )]
    async fn install_packages(&self, params: Parameters<InstallPackages>) -> McpResult {
        self.handlers().install_packages(params).await
    }

    #[tool(
        name = "list_processes",
        description = "List sandboxed processes that are still running, with their tracking IDs and pids."
    )]
    async fn list_processes(&self) -> McpResult {
        self.handlers().list_processes()
    }

    #[tool(
        name = "kill_process",
        description = "Stop a running sandboxed process by tracking ID or pid: SIGTERM first, SIGKILL if it is still alive after the grace period."
    )]
    async fn kill_process(&self, params: Parameters<KillProcess>) -> McpResult {
        self.handlers().kill_process(params)
    }

    #[tool(
        name = "execution_history",
        description = "Show completed executions, most recent first. Use `limit` to cap the number of entries."
    )]
    async fn execution_history(&self, params: Parameters<ExecutionHistory>) -> McpResult {
        self.handlers().execution_history(params)
    }

    #[tool(
        name = "clear_history",
        description = "Forget every completed execution."
    )]
    async fn clear_history(&self) -> McpResult {
        self.handlers().clear_history()
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for KeelMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "keel".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

/// Run the MCP server with stdio transport
pub async fn run_stdio_server(server: KeelMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting keel MCP server on stdio");
    debug!(
        "Server created with {} tools",
        server.tool_router.list_all().len()
    );

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}
