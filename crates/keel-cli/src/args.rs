//! Command-line argument definitions using clap
//!
//! Argument structs stay in this module and convert into `keel_core::params`
//! types with `From`, so the planner never sees clap types:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Planner
//! ```

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use keel_core::{
    models::PackageManager,
    params::{ClassifyCommand, ClassifyOperation, InstallPackages},
    Language, OperationKind,
};
use serde_json::Value;

/// Run dependency-ordered task plans behind a command risk gate
///
/// keel builds a plan from a loose task specification, orders its steps by
/// their dependencies, checks every command against a security gate and runs
/// what the gate allows in a sandboxed child process. Use `serve` to expose
/// the same operations to AI assistants over MCP (Model Context Protocol).
#[derive(Parser)]
#[command(version, about, name = "keel")]
pub struct Args {
    /// Path to a JSON settings file. Defaults to
    /// $XDG_CONFIG_HOME/keel/config.json when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for code snippets written by `code` and plan code steps.
    /// Defaults to $XDG_CACHE_HOME/keel/sandbox
    #[arg(long, global = true)]
    pub scratch_dir: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for the keel CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Build and run plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Classify a command line without running it
    Check(CheckArgs),
    /// Classify a file or process operation
    CheckOp(CheckOpArgs),
    /// List the effective command whitelist
    Whitelist,
    /// List the danger patterns
    Patterns,
    /// Show a summary of the security configuration
    Report,
    /// Run a command in the sandbox after the gate allows it
    #[command(alias = "x")]
    Exec(ExecArgs),
    /// Run a code snippet in the sandbox after the gate allows it
    Code(CodeArgs),
    /// Install packages with npm, yarn, pnpm or pip
    Install(InstallArgs),
    /// Start the MCP server
    Serve,
}

/// Plan operations
#[derive(Subcommand)]
pub enum PlanCommands {
    /// Build a plan and show its steps and estimate without running it
    Show(PlanArgs),
    /// Build a plan and run it; exits non-zero when the plan fails
    Run(PlanArgs),
}

/// A plan specification and its context
#[derive(ClapArgs)]
pub struct PlanArgs {
    /// JSON spec file, `-` for stdin, or an inline JSON spec or command line
    pub spec: String,

    /// Plan title; derived from the spec when omitted
    #[arg(short, long)]
    pub title: Option<String>,

    /// Context entry handed to every step, e.g. `work_dir=/srv/app`.
    /// Values that parse as JSON are kept as JSON
    #[arg(short, long = "context", value_name = "KEY=VALUE", value_parser = parse_context)]
    pub context: Vec<(String, Value)>,
}

/// Classify a command line
#[derive(ClapArgs)]
pub struct CheckArgs {
    /// The command line; several words are joined with spaces
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl From<CheckArgs> for ClassifyCommand {
    fn from(val: CheckArgs) -> Self {
        ClassifyCommand {
            command: val.command.join(" "),
        }
    }
}

/// Classify an operation on a path
#[derive(ClapArgs)]
pub struct CheckOpArgs {
    /// Operation kind: delete_file, delete_dir, write_file, move_file,
    /// copy_file, read_file, create_directory, run_command or execute_code
    pub operation: OperationKind,

    /// Path the operation acts on
    pub target: Option<String>,
}

impl From<CheckOpArgs> for ClassifyOperation {
    fn from(val: CheckOpArgs) -> Self {
        ClassifyOperation {
            operation: val.operation,
            target: val.target,
        }
    }
}

/// Run a command
#[derive(ClapArgs)]
pub struct ExecArgs {
    /// Working directory; defaults to the current directory
    #[arg(long)]
    pub cwd: Option<String>,

    /// Timeout in milliseconds; defaults to the configured timeout
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Environment variable for the process, e.g. `RUST_LOG=debug`
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Program to run, or a full command line when no arguments follow
    pub command: String,

    /// Arguments passed to the program without a shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Run a code snippet
#[derive(ClapArgs)]
pub struct CodeArgs {
    /// Language of the snippet; detected from the file name or source when
    /// omitted
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Working directory; defaults to the scratch directory
    #[arg(long)]
    pub cwd: Option<String>,

    /// Timeout in milliseconds; defaults to the configured timeout
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Environment variable for the snippet, e.g. `DEBUG=1`
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Source file, or `-` for stdin
    pub file: String,
}

/// Install packages
#[derive(ClapArgs)]
pub struct InstallArgs {
    /// Package manager: npm, yarn, pnpm, pip or pip3
    #[arg(short, long, default_value = "npm")]
    pub manager: PackageManager,

    /// Working directory; defaults to the current directory
    #[arg(long)]
    pub cwd: Option<String>,

    /// Timeout in milliseconds; defaults to the configured install timeout
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Packages to install
    #[arg(required = true, num_args = 1..)]
    pub packages: Vec<String>,
}

impl From<InstallArgs> for InstallPackages {
    fn from(val: InstallArgs) -> Self {
        InstallPackages {
            packages: val.packages,
            manager: val.manager,
            work_dir: val.cwd,
            timeout_ms: val.timeout_ms,
        }
    }
}

/// Parse a `KEY=VALUE` context entry.
fn parse_context(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid context entry `{s}`: expected KEY=VALUE"))?;
    if key.is_empty() {
        return Err(format!("invalid context entry `{s}`: empty key"));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Parse a `KEY=VALUE` environment variable.
fn parse_env(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid environment variable `{s}`: expected KEY=VALUE")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_context() {
        assert_eq!(
            parse_context("work_dir=/srv/app").unwrap(),
            ("work_dir".to_string(), json!("/srv/app"))
        );
        assert_eq!(
            parse_context("retries=3").unwrap(),
            ("retries".to_string(), json!(3))
        );
        assert_eq!(
            parse_context("expr=a=b").unwrap(),
            ("expr".to_string(), json!("a=b"))
        );
        assert!(parse_context("missing").is_err());
        assert!(parse_context("=value").is_err());
    }

    #[test]
    fn test_parse_env() {
        assert_eq!(
            parse_env("MODE=a=b").unwrap(),
            ("MODE".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_env("EMPTY=").unwrap(), ("EMPTY".to_string(), String::new()));
        assert!(parse_env("=x").is_err());
        assert!(parse_env("MODE").is_err());
    }

    #[test]
    fn test_install_defaults_to_npm() {
        let args = Args::parse_from(["keel", "install", "left-pad", "is-odd"]);
        let Some(Commands::Install(install)) = args.command else {
            panic!("expected install command");
        };
        let params = InstallPackages::from(install);
        assert_eq!(params.manager, PackageManager::Npm);
        assert_eq!(params.packages, ["left-pad", "is-odd"]);

        let args = Args::parse_from(["keel", "install", "--manager", "pip", "requests"]);
        let Some(Commands::Install(install)) = args.command else {
            panic!("expected install command");
        };
        assert_eq!(install.manager, PackageManager::Pip);
    }

    #[test]
    fn test_check_joins_words() {
        let args = Args::parse_from(["keel", "check", "rm", "-rf", "build"]);
        let Some(Commands::Check(check)) = args.command else {
            panic!("expected check command");
        };
        let params = ClassifyCommand::from(check);
        assert_eq!(params.command, "rm -rf build");
    }

    #[test]
    fn test_check_op_parses_kind() {
        let args = Args::parse_from(["keel", "check-op", "delete-file", "/tmp/x"]);
        let Some(Commands::CheckOp(op)) = args.command else {
            panic!("expected check-op command");
        };
        let params = ClassifyOperation::from(op);
        assert_eq!(params.operation, OperationKind::DeleteFile);
        assert_eq!(params.target.as_deref(), Some("/tmp/x"));
    }
}
