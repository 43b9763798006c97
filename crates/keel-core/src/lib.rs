//! Core library for the keel task runner.
//!
//! keel turns a loose task specification into a dependency-ordered plan,
//! checks every command against a security gate and runs what the gate
//! allows in a sandboxed child process with a timeout and capped output.
//!
//! - [`planner`]: plan building, dependency resolution and sequential runs
//! - [`gate`]: risk classification of commands, code and file operations
//! - [`sandbox`]: process spawning, timeouts, kills and execution history
//! - [`display`]: Markdown formatting shared by the CLI and the MCP server
//!
//! # Display Architecture
//!
//! Domain models ([`models`]) implement [`std::fmt::Display`] directly,
//! while collections and operation outcomes go through wrappers in
//! [`display`]. The CLI hands that Markdown to its terminal renderer; the
//! MCP server returns it as text.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use keel_core::{params::{BuildPlan, Id}, PlannerBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let planner = PlannerBuilder::new().build().await?;
//!
//! let created = planner.build_plan_result(&BuildPlan {
//!     spec: serde_json::json!({
//!         "title": "Release",
//!         "steps": [
//!             {"key": "test", "cmd": "cargo test"},
//!             {"key": "tag", "cmd": "git tag v1.0.0", "after": ["test"]}
//!         ]
//!     }),
//!     context: Default::default(),
//!     title: None,
//! })?;
//! println!("{created}");
//!
//! let report = planner.run_plan_report(&Id { id: created.resource.id.clone() }).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod gate;
pub mod models;
pub mod params;
pub mod planner;
pub mod sandbox;

// Re-export commonly used types
pub use config::{GateSettings, SandboxSettings, Settings};
pub use display::{
    CreateResult, DeleteResult, LocalDateTime, OperationStatus, PlanSummaries, RunReport,
};
pub use error::{KeelError, Result};
pub use gate::{OperationKind, SecurityGate};
pub use models::{
    ExecutionResult, Language, Plan, PlanStatus, PlanSummary, RiskLevel, Step, StepAction,
    Verdict,
};
pub use planner::{Planner, PlannerBuilder, RunOutcome};
pub use sandbox::Executor;
