//! High-level planner API for building and running plans.
//!
//! This module provides the main [`Planner`] interface. The planner owns the
//! in-memory plan store and shares a [`SecurityGate`] and an [`Executor`]
//! with every run.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │    Handlers     │    │   Operations    │    │  Gate/Sandbox   │
//! │ (plan_handlers, │───▶│ (plan_ops,      │───▶│ (classify,      │
//! │  exec_handlers) │    │  runner)        │    │  execute)       │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!     User Interface      Business Logic          Side Effects
//! ```
//!
//! ## Submodules
//!
//! - [`builder`]: Factory for creating [`Planner`] instances with configuration
//! - [`spec`]: Normalization of the accepted plan spec shapes
//! - [`graph`]: Dependency graph and topological execution order
//! - [`estimate`]: Keyword risk, time and cost estimate
//! - [`plan_ops`]: Building, looking up and deleting plans
//! - [`runner`]: Running a plan step by step
//! - [`plan_handlers`]: Parameter-based plan operations returning display types
//! - [`exec_handlers`]: Gate and sandbox operations exposed to interfaces
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use keel_core::PlannerBuilder;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let planner = PlannerBuilder::new().build().await?;
//!
//! let plan = planner.build_plan(
//!     json!([
//!         {"key": "list", "cmd": "ls -la"},
//!         {"cmd": "echo done", "after": "list"}
//!     ]),
//!     Default::default(),
//!     None,
//! )?;
//! println!("Estimated risk: {:.2}", plan.estimate.risk);
//!
//! let outcome = planner.run_plan(&plan.id).await?;
//! assert!(outcome.ok);
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{gate::SecurityGate, models::Plan, sandbox::Executor};

// Module declarations
pub mod builder;
pub mod estimate;
pub mod exec_handlers;
pub mod graph;
pub mod plan_handlers;
pub mod plan_ops;
pub mod runner;
pub mod spec;


// Re-export the main types
pub use builder::PlannerBuilder;
pub use graph::DependencyGraph;
pub use runner::{RunOutcome, StepObserver};
pub use spec::{PlanSpec, StepRef, StepSpec};

/// Main planner interface for building, running and inspecting plans.
#[derive(Debug)]
pub struct Planner {
    plans: RwLock<HashMap<String, Plan>>,
    gate: Arc<SecurityGate>,
    executor: Arc<Executor>,
}

impl Planner {
    /// Creates a planner around an existing gate and executor.
    pub fn new(gate: Arc<SecurityGate>, executor: Arc<Executor>) -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
            gate,
            executor,
        }
    }

    pub fn gate(&self) -> &Arc<SecurityGate> {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    fn plans(&self) -> RwLockReadGuard<'_, HashMap<String, Plan>> {
        self.plans.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn plans_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Plan>> {
        self.plans.write().unwrap_or_else(PoisonError::into_inner)
    }
}
