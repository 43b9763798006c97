//! Risk classification for commands and file operations.
//!
//! The [`SecurityGate`] is the authoritative check in front of the sandbox.
//! It owns two mutable sets, a whitelist of known-safe command prefixes and
//! a list of danger patterns, and classifies text against them without
//! touching the filesystem.
//!
//! Checks run in a fixed order and the first match wins:
//!
//! 1. any danger pattern matches: denied, [`RiskLevel::Critical`]
//! 2. the command starts with a whitelisted prefix: allowed, [`RiskLevel::Low`]
//! 3. anything else: denied, [`RiskLevel::Medium`], "unrecognized command"
//!
//! ```rust
//! use keel_core::{gate::SecurityGate, models::RiskLevel};
//!
//! let gate = SecurityGate::new();
//! assert_eq!(gate.classify("rm -rf /").level, RiskLevel::Critical);
//! assert!(gate.classify("ls -la").allow);
//! assert!(!gate.classify("frobnicate --now").allow);
//! ```

use std::{
    collections::BTreeSet,
    path::{Component, Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use jiff::Timestamp;
use log::{debug, warn};
use regex::Regex;

use crate::{
    config::GateSettings,
    error::{KeelError, Result},
    models::{ConfirmationRequest, Language, RiskLevel, SecurityReport, Verdict},
};

pub mod operation;
pub mod patterns;

#[cfg(test)]
mod tests;

pub use operation::OperationKind;
use patterns::{
    COMMAND_MITIGATIONS, DEFAULT_DANGER_PATTERNS, DEFAULT_WHITELIST, RECOMMENDATIONS,
    SENSITIVE_FRAGMENTS, SENSITIVE_PREFIXES,
};

/// A compiled danger pattern.
#[derive(Debug, Clone)]
pub struct DangerPattern {
    regex: Regex,
    description: String,
}

impl DangerPattern {
    /// Compile a pattern; the description defaults to the pattern text.
    pub fn new(pattern: &str, description: Option<&str>) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| KeelError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            description: description.unwrap_or(pattern).to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Classifies commands and operations against mutable whitelist and danger
/// pattern sets.
///
/// Mutations take effect on the next call; nothing is cached. The gate is
/// meant to be constructed once and shared by reference (usually inside an
/// `Arc`).
#[derive(Debug)]
pub struct SecurityGate {
    whitelist: RwLock<BTreeSet<String>>,
    danger: RwLock<Vec<DangerPattern>>,
    safe_roots: Vec<PathBuf>,
}

impl SecurityGate {
    /// Creates a gate with the built-in whitelist and danger patterns.
    ///
    /// Safe roots default to the current directory, `$HOME` and the
    /// temporary directories.
    pub fn new() -> Self {
        let danger = DEFAULT_DANGER_PATTERNS
            .iter()
            .filter_map(|(pattern, description)| {
                DangerPattern::new(pattern, Some(description))
                    .inspect_err(|e| warn!("Skipping built-in danger pattern: {e}"))
                    .ok()
            })
            .collect();

        Self {
            whitelist: RwLock::new(DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect()),
            danger: RwLock::new(danger),
            safe_roots: Self::default_safe_roots(),
        }
    }

    /// Creates a gate with the built-ins extended by `settings`.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Pattern` if an extra danger pattern does not
    /// compile.
    pub fn from_settings(settings: &GateSettings) -> Result<Self> {
        let mut gate = Self::new();
        for entry in &settings.extra_whitelist {
            gate.add_to_whitelist(entry)?;
        }
        for pattern in &settings.extra_danger_patterns {
            gate.add_danger_pattern(pattern)?;
        }
        gate.safe_roots.extend(settings.safe_roots.iter().cloned());
        Ok(gate)
    }

    /// Adds a directory under which HIGH-level operations are still allowed.
    pub fn with_safe_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.safe_roots.push(root.into());
        self
    }

    fn default_safe_roots() -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            roots.push(cwd);
        }
        if let Some(home) = std::env::var_os("HOME") {
            roots.push(PathBuf::from(home));
        }
        roots.push(std::env::temp_dir());
        roots.push(PathBuf::from("/tmp"));
        roots.push(PathBuf::from("/var/tmp"));
        roots
    }

    /// Classify a shell command line.
    pub fn classify(&self, command: &str) -> Verdict {
        let trimmed = command.trim();

        if let Some(pattern) = self.matching_danger_pattern(trimmed) {
            warn!("Command matched danger pattern '{pattern}': {trimmed}");
            return Verdict::deny(
                RiskLevel::Critical,
                format!("Danger: {pattern}"),
                COMMAND_MITIGATIONS.iter().copied(),
            );
        }

        let normalized = trimmed.to_lowercase();
        let base = normalized.split_whitespace().next().unwrap_or_default();

        if !base.is_empty() && self.is_whitelisted(&normalized) {
            debug!("Command allowed by whitelist: {base}");
            return Verdict::safe(format!("Whitelisted command `{base}`"));
        }

        Verdict::deny(
            RiskLevel::Medium,
            format!("unrecognized command `{base}`"),
            ["Verify the command", "Use a whitelisted alternative"],
        )
    }

    /// Classify a code snippet about to run in the sandbox.
    ///
    /// Each line of the source is scanned with the danger patterns first;
    /// otherwise the verdict is that of [`OperationKind::ExecuteCode`].
    pub fn classify_code(&self, language: Language, source: &str) -> Verdict {
        if let Some(pattern) = source
            .lines()
            .find_map(|line| self.matching_danger_pattern(line))
        {
            warn!("{} snippet matched danger pattern '{pattern}'", language.as_str());
            return Verdict::deny(
                RiskLevel::Critical,
                format!("Danger: {pattern}"),
                OperationKind::ExecuteCode.mitigations().iter().copied(),
            );
        }
        self.classify_operation(OperationKind::ExecuteCode, None)
    }

    /// Classify a non-shell operation on an optional target path.
    ///
    /// The target is normalized lexically first, so `.` and `..` components
    /// cannot step around either check. A target inside a sensitive system
    /// location is refused at [`RiskLevel::High`] whatever the operation.
    /// Otherwise the operation's own level applies, and HIGH-level operations
    /// are only allowed on targets under a safe root (or with no target).
    pub fn classify_operation(&self, kind: OperationKind, target: Option<&str>) -> Verdict {
        let target = target.map(normalize_target);
        let target = target.as_deref();

        if let Some(location) = target.and_then(Self::sensitive_location) {
            warn!("{kind} targets sensitive location {location}");
            return Verdict::deny(
                RiskLevel::High,
                format!("Sensitive location: {location}"),
                ["Avoid system directories", "Work in user space", "Confirm access explicitly"],
            );
        }

        let (level, reason) = kind.risk();
        let allow = level != RiskLevel::High || target.map_or(true, |t| self.is_safe_path(t));

        Verdict {
            allow,
            level,
            reason: reason.to_string(),
            need_confirm: level != RiskLevel::Low,
            mitigations: kind.mitigations().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// `target` is already normalized, so a directory is matched with a
    /// separator appended.
    fn sensitive_location(target: &str) -> Option<&'static str> {
        let lowered = target.to_lowercase();
        let as_dir = format!("{}/", lowered.trim_end_matches('/'));
        SENSITIVE_PREFIXES
            .iter()
            .find(|prefix| {
                as_dir.starts_with(*prefix) || lowered == prefix.trim_end_matches(['/', '\\'])
            })
            .or_else(|| SENSITIVE_FRAGMENTS.iter().find(|frag| as_dir.contains(*frag)))
            .copied()
    }

    fn is_safe_path(&self, target: &str) -> bool {
        let target = Path::new(target);
        self.safe_roots.iter().any(|root| target.starts_with(root))
    }

    fn matching_danger_pattern(&self, text: &str) -> Option<String> {
        self.danger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.is_match(text))
            .map(|p| p.description().to_string())
    }

    fn is_whitelisted(&self, normalized: &str) -> bool {
        self.whitelist
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| normalized.starts_with(&entry.to_lowercase()))
    }

    /// Sorted whitelist entries.
    pub fn whitelist(&self) -> Vec<String> {
        self.whitelist
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Add a whitelist entry. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an empty entry, which would
    /// otherwise whitelist every command.
    pub fn add_to_whitelist(&self, entry: &str) -> Result<bool> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(KeelError::validation("command").with_reason("Whitelist entry cannot be empty"));
        }
        debug!("Whitelisting '{entry}'");
        Ok(self
            .whitelist
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.to_string()))
    }

    /// Remove a whitelist entry. Returns `false` if it was not present.
    pub fn remove_from_whitelist(&self, entry: &str) -> bool {
        debug!("Removing '{}' from whitelist", entry.trim());
        self.whitelist
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entry.trim())
    }

    /// Patterns with their descriptions, in match order.
    pub fn danger_patterns(&self) -> Vec<DangerPattern> {
        self.danger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append a danger pattern. Returns `false` if the same pattern text is
    /// already present.
    pub fn add_danger_pattern(&self, pattern: &str) -> Result<bool> {
        let compiled = DangerPattern::new(pattern, None)?;
        let mut danger = self.danger.write().unwrap_or_else(PoisonError::into_inner);
        if danger.iter().any(|p| p.pattern() == pattern) {
            return Ok(false);
        }
        debug!("Adding danger pattern '{pattern}'");
        danger.push(compiled);
        Ok(true)
    }

    /// Remove a danger pattern by its exact text.
    pub fn remove_danger_pattern(&self, pattern: &str) -> bool {
        let mut danger = self.danger.write().unwrap_or_else(PoisonError::into_inner);
        let before = danger.len();
        danger.retain(|p| p.pattern() != pattern);
        danger.len() != before
    }

    /// Build a confirmation request for a human reviewer.
    pub fn confirmation_request(&self, kind: OperationKind, detail: &str) -> ConfirmationRequest {
        ConfirmationRequest {
            id: uuid::Uuid::new_v4().to_string(),
            operation: kind.to_string(),
            detail: detail.to_string(),
            requested_at: Timestamp::now(),
            message: format!("Operation \"{kind}\" needs confirmation"),
            warning: kind.warning().to_string(),
        }
    }

    pub fn report(&self) -> SecurityReport {
        SecurityReport {
            generated_at: Timestamp::now(),
            whitelist_size: self.whitelist.read().unwrap_or_else(PoisonError::into_inner).len(),
            danger_patterns: self.danger.read().unwrap_or_else(PoisonError::into_inner).len(),
            sensitive_paths: SENSITIVE_PREFIXES.len() + SENSITIVE_FRAGMENTS.len(),
            recommendations: RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Resolve `.` and `..` components and repeated separators without touching
/// the filesystem.
///
/// `..` at the root stays at the root; leading `..` of a relative path are
/// kept.
///
/// ```rust
/// use keel_core::gate::normalize_target;
///
/// assert_eq!(normalize_target("/tmp/../etc//shadow"), "/etc/shadow");
/// assert_eq!(normalize_target("/../root/./.bashrc"), "/root/.bashrc");
/// assert_eq!(normalize_target("../a/b/.."), "../a");
/// ```
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    let mut normalized = PathBuf::new();
    for component in Path::new(target).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }

    let mut normalized = normalized.to_string_lossy().into_owned();
    if normalized.is_empty() && !target.is_empty() {
        normalized.push('.');
    }
    normalized
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self::new()
    }
}
