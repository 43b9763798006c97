//! Security gate output types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::RiskLevel;

/// The security gate's decision about a command or operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the action may run without further confirmation
    pub allow: bool,

    pub level: RiskLevel,

    /// Human-readable rationale
    pub reason: String,

    /// True whenever the action is not provably safe
    pub need_confirm: bool,

    /// Suggestions for doing the same thing more safely
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitigations: Vec<String>,
}

impl Verdict {
    /// A verdict for a provably safe action.
    pub fn safe(reason: impl Into<String>) -> Self {
        Self {
            allow: true,
            level: RiskLevel::Low,
            reason: reason.into(),
            need_confirm: false,
            mitigations: Vec::new(),
        }
    }

    /// A refusal that always requires confirmation.
    pub fn deny<I, S>(level: RiskLevel, reason: impl Into<String>, mitigations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: false,
            level,
            reason: reason.into(),
            need_confirm: true,
            mitigations: mitigations.into_iter().map(Into::into).collect(),
        }
    }
}

/// A request for a human to confirm a risky operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub id: String,
    pub operation: String,
    pub detail: String,
    pub requested_at: Timestamp,
    pub message: String,
    pub warning: String,
}

/// Snapshot of the gate's configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityReport {
    pub generated_at: Timestamp,
    pub whitelist_size: usize,
    pub danger_patterns: usize,
    pub sensitive_paths: usize,
    pub recommendations: Vec<String>,
}
