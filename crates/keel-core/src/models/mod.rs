//! Data models for plans, steps, verdicts and executions.
//!
//! Display implementations for these models live in
//! [`crate::display::models`], keeping presentation apart from the data
//! structures. Every model formats as Markdown.
//!
//! # Examples
//!
//! ```rust
//! use keel_core::models::{RiskLevel, Verdict};
//!
//! let verdict = Verdict::deny(RiskLevel::Medium, "unrecognized command", ["Verify the command"]);
//! assert!(!verdict.allow);
//! assert!(verdict.need_confirm);
//! println!("{}", verdict); // Markdown with level and mitigations
//! ```

pub mod execution;
pub mod language;
pub mod package;
pub mod plan;
pub mod status;
pub mod step;
pub mod summary;
pub mod verdict;


pub use execution::{ExecutionResult, HistoryEntry, ProcessRecord};
pub use language::Language;
pub use package::PackageManager;
pub use plan::{Estimate, Plan};
pub use status::{PlanStatus, RiskLevel};
pub use step::{
    ActionFuture, ActionHandler, ActionOutcome, Step, StepAction, StepContext,
    DEFAULT_STEP_COST, DEFAULT_STEP_TIMEOUT_SECS,
};
pub use summary::PlanSummary;
pub use verdict::{ConfirmationRequest, SecurityReport, Verdict};
