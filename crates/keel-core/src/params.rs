//! Parameter structures for keel operations
//!
//! These structures are shared by every interface (CLI, MCP) and carry no
//! framework-specific derives beyond serde. JSON schema generation for the
//! MCP layer is available behind the `schema` feature.
//!
//! ## Parameter Wrapper Pattern
//!
//! Interface layers wrap these types instead of redefining them:
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI Args      │    │   MCP Params    │    │  Core Params    │
//! │  (clap derives) │───▶│ (serde derives) │───▶│ (minimal deps)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! CLI argument structs convert into core parameters with `From`, and the MCP
//! server deserializes them through a transparent wrapper, so the planner
//! only ever sees the types below.

use std::collections::BTreeMap;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    gate::OperationKind,
    models::{Language, PackageManager},
};

/// Parameters for building a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct BuildPlan {
    /// The steps: a list of step objects, a single command string, an object
    /// with a `steps` list, or a single step object
    pub spec: Value,

    /// Key/value context handed to every step
    #[serde(default)]
    pub context: Map<String, Value>,

    /// Plan title; derived from the spec when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Generic parameters for operations requiring just an ID.
///
/// Used for show_plan, run_plan and delete_plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Id {
    /// The ID of the plan to operate on
    pub id: String,
}

/// Parameters for classifying a shell command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ClassifyCommand {
    /// The full command line
    pub command: String,
}

/// Parameters for classifying a non-shell operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ClassifyOperation {
    /// Kind of operation (delete_file, write_file, read_file, ...)
    pub operation: OperationKind,

    /// Path the operation acts on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A whitelist entry to add or remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct WhitelistEntry {
    /// Command prefix, e.g. `terraform`
    pub command: String,
}

/// A danger pattern to add or remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PatternEntry {
    /// Regular expression matched against full command lines
    pub pattern: String,
}

/// Parameters for running a command in the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RunSandboxed {
    /// Program to run, or a full command line when `args` is empty
    pub command: String,

    /// Arguments passed to the program without a shell
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory; defaults to the current directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,

    /// Timeout in milliseconds; defaults to the configured timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Extra environment variables for the process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Parameters for running a code snippet in the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RunCode {
    /// Language of the snippet
    pub language: Language,

    /// Source code
    pub source: String,

    /// Working directory; defaults to the scratch directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,

    /// Timeout in milliseconds; defaults to the configured timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Extra environment variables for the process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Parameters for installing packages in the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct InstallPackages {
    /// Package names, optionally with version specifiers
    pub packages: Vec<String>,

    /// Package manager to install with; defaults to npm
    #[serde(default)]
    pub manager: PackageManager,

    /// Working directory; defaults to the current directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,

    /// Timeout in milliseconds; defaults to the configured install timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Parameters for killing a running process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct KillProcess {
    /// Tracking ID or OS pid of the process
    pub target: String,
}

/// Parameters for reading the execution history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ExecutionHistory {
    /// Maximum number of entries, most recent first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}
