//! Status and severity enumerations.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Built and waiting to run
    #[default]
    Ready,

    /// A run is in flight
    Running,

    /// Every step in the execution order finished
    Completed,

    /// A blocking step failed and the walk halted
    Failed,
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ready" => Ok(PlanStatus::Ready),
            "running" => Ok(PlanStatus::Running),
            "completed" => Ok(PlanStatus::Completed),
            "failed" => Ok(PlanStatus::Failed),
            _ => Err(format!("Invalid plan status: {s}")),
        }
    }
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Ready => "ready",
            PlanStatus::Running => "running",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
        }
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keel_core::models::PlanStatus;
    ///
    /// assert_eq!(PlanStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(PlanStatus::Failed.with_icon(), "✗ Failed");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            PlanStatus::Ready => "○ Ready",
            PlanStatus::Running => "➤ Running",
            PlanStatus::Completed => "✓ Completed",
            PlanStatus::Failed => "✗ Failed",
        }
    }
}

/// Severity attached to a [`Verdict`](super::Verdict).
///
/// Ordered from least to most severe, so `RiskLevel::High > RiskLevel::Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" | "MED" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" | "CRIT" => Ok(RiskLevel::Critical),
            _ => Err(format!("Invalid risk level: {s}")),
        }
    }
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}
