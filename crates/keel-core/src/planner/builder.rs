//! Builder for creating and configuring Planner instances.

use std::{path::PathBuf, sync::Arc};

use tokio::task;

use super::Planner;
use crate::{
    config::Settings,
    error::{Result, ResultExt},
    gate::SecurityGate,
    sandbox::Executor,
};

/// Builder for creating and configuring Planner instances.
#[derive(Debug, Clone, Default)]
pub struct PlannerBuilder {
    settings: Settings,
    scratch_dir: Option<PathBuf>,
}

impl PlannerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `settings` instead of the defaults.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the directory code snippets are written to.
    ///
    /// If not specified, uses `sandbox.scratch_dir` from the settings, then
    /// the XDG cache directory: `$XDG_CACHE_HOME/keel/sandbox` or
    /// `~/.cache/keel/sandbox`.
    pub fn with_scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    /// Builds the configured planner instance.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::FileSystem` if the scratch directory cannot be
    /// created and `KeelError::Pattern` if a configured danger pattern is not
    /// a valid regex.
    pub async fn build(self) -> Result<Planner> {
        let mut sandbox = self.settings.sandbox;
        if let Some(dir) = self.scratch_dir {
            sandbox.scratch_dir = Some(dir);
        }

        let resolver = sandbox.clone();
        let scratch_dir = task::spawn_blocking(move || resolver.resolve_scratch_dir())
            .await
            .with_context("Task join error")??;

        let gate = SecurityGate::from_settings(&self.settings.gate)?.with_safe_root(&scratch_dir);
        log::debug!("Sandbox scratch directory: {}", scratch_dir.display());
        let executor = Executor::new(sandbox, scratch_dir);

        Ok(Planner::new(Arc::new(gate), Arc::new(executor)))
    }
}
