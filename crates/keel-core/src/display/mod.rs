//! Display formatting for models, collections and operation results.
//!
//! Domain models implement `Display` directly (see [`models`]); collections
//! and operation outcomes go through newtype wrappers so each context can
//! format them its own way. Everything renders as Markdown, which the CLI
//! passes to its terminal renderer and the MCP server returns verbatim.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │    Wrappers     │    │    Markdown     │
//! │ (Plan, Verdict) │───▶│ (PlanSummaries, │───▶│ (Terminal/MCP)  │
//! │                 │    │  RunReport)     │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`collections`]: Collection wrappers (PlanSummaries, Processes, History,
//!   Whitelist, DangerPatterns)
//! - [`results`]: Operation results (CreateResult, DeleteResult, RunReport,
//!   KillResult)
//! - [`status`]: Success and failure lines (OperationStatus)
//! - [`time`]: Timestamp and duration formatting
//! - [`models`]: Display implementations for domain models
//!
//! ## Usage Examples
//!
//! ```rust
//! use keel_core::{display::OperationStatus, gate::SecurityGate};
//!
//! let gate = SecurityGate::new();
//! let added = gate.add_to_whitelist("terraform")?;
//! let status = OperationStatus::changed(
//!     added,
//!     "Added `terraform` to the whitelist",
//!     "`terraform` is already whitelisted",
//! );
//! assert_eq!(status.to_string(), "Success: Added `terraform` to the whitelist\n");
//! println!("{}", gate.classify("terraform plan"));
//! # Ok::<(), keel_core::KeelError>(())
//! ```

pub mod collections;
pub mod models;
pub mod results;
pub mod status;
pub mod time;

pub use collections::{DangerPatterns, History, PlanSummaries, Processes, Whitelist};
pub use results::{CreateResult, DeleteResult, KillResult, RunReport};
pub use status::OperationStatus;
pub use time::{Elapsed, LocalDateTime};
