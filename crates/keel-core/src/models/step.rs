//! Step model definition and the actions a step can carry.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ExecutionResult, Language};

/// Default per-step timeout and declared time budget, in seconds.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 30;

/// Default per-step cost weight.
pub const DEFAULT_STEP_COST: f64 = 1.0;

/// Represents one unit of work within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Generated identifier, unique within the plan
    pub id: String,

    /// Caller-supplied name that other steps' `after` lists may refer to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Position in the plan spec (0-indexed)
    pub order: u32,

    /// Short human-readable title
    pub title: String,

    /// What the step does when executed
    pub action: StepAction,

    /// Resolved prerequisite step IDs, when the spec declared them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Vec<String>>,

    /// Wall-clock budget in seconds; also the declared time estimate
    pub timeout_secs: u64,

    /// Whether a failure of this step halts the plan
    pub block_on_fail: bool,

    /// Relative cost weight
    pub cost: f64,
}

impl Step {
    /// Text scanned for risk keywords when estimating a plan.
    pub fn risk_text(&self) -> &str {
        self.action.text().unwrap_or(&self.title)
    }
}

/// The action descriptor of a step.
///
/// Commands and code snippets are *gated*: the runner asks the security gate
/// before handing them to the sandbox. Callbacks are opaque and run as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    /// A literal shell command line
    Command { command: String },

    /// A snippet executed through a scratch file
    Code { language: Language, source: String },

    /// An in-process action supplied through the library API
    Callback {
        label: String,
        #[serde(skip)]
        handler: Option<ActionHandler>,
    },

    /// Nothing to execute; the step succeeds immediately
    Noop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

impl StepAction {
    /// Creates a gated shell command action.
    pub fn command(command: impl Into<String>) -> Self {
        StepAction::Command {
            command: command.into(),
        }
    }

    /// Creates an opaque callback action.
    pub fn callback(label: impl Into<String>, handler: ActionHandler) -> Self {
        StepAction::Callback {
            label: label.into(),
            handler: Some(handler),
        }
    }

    /// Whether the security gate must approve this action before it runs.
    pub fn is_gated(&self) -> bool {
        matches!(self, StepAction::Command { .. } | StepAction::Code { .. })
    }

    /// The descriptive text of the action, if it has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            StepAction::Command { command } => Some(command),
            StepAction::Code { source, .. } => Some(source),
            StepAction::Callback { label, .. } => Some(label),
            StepAction::Noop { note } => note.as_deref(),
        }
    }
}

/// Outcome of an opaque action: captured output on success, a message on
/// failure.
pub type ActionOutcome = std::result::Result<String, String>;

/// Boxed future returned by an [`ActionHandler`].
pub type ActionFuture = Pin<Box<dyn Future<Output = ActionOutcome> + Send>>;

type HandlerFn = dyn Fn(StepContext) -> ActionFuture + Send + Sync;

/// Shareable async function backing a [`StepAction::Callback`].
///
/// # Examples
///
/// ```rust
/// use keel_core::models::{ActionHandler, StepAction};
///
/// let handler = ActionHandler::new(|ctx| async move {
///     Ok::<_, String>(format!("ran step {}", ctx.step_id))
/// });
/// let action = StepAction::callback("report", handler);
/// assert!(!action.is_gated());
/// ```
#[derive(Clone)]
pub struct ActionHandler(Arc<HandlerFn>);

impl ActionHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionOutcome> + Send + 'static,
    {
        Self(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    /// Invoke the handler.
    pub fn call(&self, ctx: StepContext) -> ActionFuture {
        (self.0)(ctx)
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActionHandler(..)")
    }
}

/// What a step sees while it runs.
#[derive(Debug, Clone, Serialize)]
pub struct StepContext {
    pub plan_id: String,
    pub step_id: String,
    /// The plan's execution context
    pub context: Map<String, Value>,
    /// Results of the step's prerequisites that have already run
    pub previous: Vec<ExecutionResult>,
}
