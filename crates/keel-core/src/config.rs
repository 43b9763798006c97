//! Runtime settings for the sandbox and the security gate.
//!
//! Settings are read from JSON. Every field has a default, so an empty object
//! (or no file at all) yields a working configuration:
//!
//! ```json
//! {
//!   "sandbox": { "max_concurrency": 5, "default_timeout_secs": 60 },
//!   "gate": { "extra_whitelist": ["terraform"] }
//! }
//! ```

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{KeelError, Result};

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sandbox: SandboxSettings,
    pub gate: GateSettings,
}

/// Limits applied by the sandboxed executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Maximum in-flight code executions
    pub max_concurrency: usize,

    /// Timeout used when a caller does not give one
    pub default_timeout_secs: u64,

    /// Timeout for package installs when the caller does not give one
    pub install_timeout_secs: u64,

    /// Time between SIGTERM and SIGKILL
    pub grace_period_ms: u64,

    /// Per-stream capture limit
    pub max_output_bytes: usize,

    /// Completed executions kept in memory
    pub history_limit: usize,

    /// Where code snippets are written before they run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Shell used for command lines
    pub shell: PathBuf,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            default_timeout_secs: 60,
            install_timeout_secs: 300,
            grace_period_ms: 5_000,
            max_output_bytes: 10 * 1024 * 1024,
            history_limit: 200,
            scratch_dir: None,
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

/// Additions to the gate's built-in sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub extra_whitelist: Vec<String>,
    pub extra_danger_patterns: Vec<String>,
    /// Directories where HIGH-level operations are allowed
    pub safe_roots: Vec<PathBuf>,
}

impl Settings {
    /// Load settings from `path`, or from the XDG config location when no
    /// path is given.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::FileSystem` if an explicit path cannot be read and
    /// `KeelError::Serialization` if the file is not valid JSON.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_config_path() {
                Some(path) => path,
                None => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading settings from {}", path.display());
        let contents =
            std::fs::read_to_string(&path).map_err(|e| KeelError::file_system(&path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// `$XDG_CONFIG_HOME/keel/config.json`, if it exists.
    fn default_config_path() -> Option<PathBuf> {
        xdg::BaseDirectories::with_prefix("keel").find_config_file("config.json")
    }
}

impl SandboxSettings {
    /// The configured scratch directory, or the XDG cache default.
    ///
    /// The directory is created if it does not exist yet.
    pub fn resolve_scratch_dir(&self) -> Result<PathBuf> {
        let dir = match &self.scratch_dir {
            Some(dir) => dir.clone(),
            None => Self::default_scratch_dir(),
        };
        std::fs::create_dir_all(&dir).map_err(|e| KeelError::file_system(&dir, e))?;
        Ok(dir)
    }

    fn default_scratch_dir() -> PathBuf {
        xdg::BaseDirectories::with_prefix("keel")
            .create_cache_directory("sandbox")
            .unwrap_or_else(|e| {
                debug!("XDG cache directory unavailable ({e}), using temp dir");
                std::env::temp_dir().join("keel-sandbox")
            })
    }
}
