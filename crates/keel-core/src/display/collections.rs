//! Collection wrapper types for displaying groups of domain objects.
//!
//! Each wrapper formats its items with their own `Display` impl and prints a
//! single "No ... found." line when empty.

use std::{fmt, ops::Index};

use crate::{
    gate::DangerPattern,
    models::{HistoryEntry, PlanSummary, ProcessRecord},
};

/// Implements the read-only `Vec` accessors shared by every wrapper.
macro_rules! collection_accessors {
    ($wrapper:ident, $item:ty) => {
        impl $wrapper {
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn get(&self, index: usize) -> Option<&$item> {
                self.0.get(index)
            }

            pub fn iter(&self) -> std::slice::Iter<'_, $item> {
                self.0.iter()
            }
        }

        impl Index<usize> for $wrapper {
            type Output = $item;

            fn index(&self, index: usize) -> &Self::Output {
                &self.0[index]
            }
        }

        impl IntoIterator for $wrapper {
            type Item = $item;
            type IntoIter = std::vec::IntoIter<Self::Item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $wrapper {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

/// Plan summaries, as returned by `list_plans`.
///
/// # Examples
///
/// ```rust
/// use keel_core::{
///     display::PlanSummaries,
///     models::{PlanStatus, PlanSummary},
/// };
/// use jiff::Timestamp;
///
/// let summary = PlanSummary {
///     id: "b0c1".to_string(),
///     title: "Deploy".to_string(),
///     status: PlanStatus::Ready,
///     created_at: Timestamp::now(),
///     finished_at: None,
///     total_steps: 3,
///     attempted_steps: 0,
///     succeeded_steps: 0,
///     risk: 0.0,
/// };
///
/// let output = PlanSummaries(vec![summary]).to_string();
/// assert!(output.contains("## Deploy (ID: b0c1)"));
/// ```
pub struct PlanSummaries(pub Vec<PlanSummary>);

collection_accessors!(PlanSummaries, PlanSummary);

impl fmt::Display for PlanSummaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No plans found.")
        } else {
            for plan in &self.0 {
                write!(f, "{plan}")?;
            }
            Ok(())
        }
    }
}

/// Processes currently running in the sandbox.
pub struct Processes(pub Vec<ProcessRecord>);

collection_accessors!(Processes, ProcessRecord);

impl fmt::Display for Processes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No running processes found.")
        } else {
            for process in &self.0 {
                write!(f, "{process}")?;
            }
            Ok(())
        }
    }
}

/// Completed executions, most recent first.
pub struct History(pub Vec<HistoryEntry>);

collection_accessors!(History, HistoryEntry);

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No executions found.")
        } else {
            for entry in &self.0 {
                write!(f, "{entry}")?;
            }
            Ok(())
        }
    }
}

/// Whitelisted command prefixes, sorted.
pub struct Whitelist(pub Vec<String>);

collection_accessors!(Whitelist, String);

impl fmt::Display for Whitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No whitelisted commands found.")
        } else {
            for entry in &self.0 {
                writeln!(f, "- `{entry}`")?;
            }
            Ok(())
        }
    }
}

/// Danger patterns in evaluation order.
pub struct DangerPatterns(pub Vec<DangerPattern>);

collection_accessors!(DangerPatterns, DangerPattern);

impl fmt::Display for DangerPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No danger patterns found.")
        } else {
            for pattern in &self.0 {
                write!(f, "{pattern}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use jiff::Timestamp;

    use super::*;
    use crate::models::PlanStatus;

    fn create_test_plan_summary() -> PlanSummary {
        PlanSummary {
            id: "plan-1".to_string(),
            title: "Test Plan".to_string(),
            status: PlanStatus::Completed,
            created_at: Timestamp::from_second(1640995200).unwrap(), // 2022-01-01 00:00:00 UTC
            finished_at: Some(Timestamp::from_second(1640995260).unwrap()),
            total_steps: 3,
            attempted_steps: 3,
            succeeded_steps: 3,
            risk: 0.25,
        }
    }

    #[test]
    fn test_plan_summaries_display() {
        let summaries = PlanSummaries(vec![create_test_plan_summary()]);
        let output = summaries.to_string();
        assert!(output.contains("## Test Plan (ID: plan-1) (3/3)"));
        assert!(output.contains("✓ Completed"));
        assert!(output.contains("0.25"));
        assert!(!output.starts_with("# "));

        let mut second = create_test_plan_summary();
        second.id = "plan-2".to_string();
        second.title = "Second Plan".to_string();
        let summaries = PlanSummaries(vec![create_test_plan_summary(), second]);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].title, "Second Plan");
        let output = summaries.to_string();
        assert!(output.contains("ID: plan-1"));
        assert!(output.contains("ID: plan-2"));
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(PlanSummaries(vec![]).to_string(), "No plans found.\n");
        assert_eq!(Processes(vec![]).to_string(), "No running processes found.\n");
        assert_eq!(History(vec![]).to_string(), "No executions found.\n");
        assert_eq!(
            Whitelist(vec![]).to_string(),
            "No whitelisted commands found.\n"
        );
        assert_eq!(
            DangerPatterns(vec![]).to_string(),
            "No danger patterns found.\n"
        );
    }

    #[test]
    fn test_processes_display() {
        let processes = Processes(vec![ProcessRecord {
            tracking_id: "t-1".to_string(),
            pid: 4242,
            command: "sleep 10".to_string(),
            work_dir: PathBuf::from("/tmp"),
            started_at: Timestamp::now(),
            killed: true,
        }]);
        let output = processes.to_string();
        assert!(output.contains("**4242** `sleep 10` (killing)"));
        assert!(output.contains("Tracking ID: t-1"));
    }

    #[test]
    fn test_history_display() {
        let entry = HistoryEntry {
            tracking_id: "t-2".to_string(),
            command: "false".to_string(),
            ok: false,
            exit_code: Some(1),
            killed: false,
            stdout_len: 0,
            stderr_len: 12,
            elapsed_ms: 40,
            finished_at: Timestamp::now(),
        };
        let output = History(vec![entry]).to_string();
        assert!(output.contains("✗ exit 1 `false`"));
        assert!(output.contains("40 ms"));
    }

    #[test]
    fn test_whitelist_and_patterns_display() {
        let whitelist = Whitelist(vec!["git".to_string(), "ls".to_string()]);
        assert_eq!(whitelist.to_string(), "- `git`\n- `ls`\n");

        let patterns = DangerPatterns(vec![
            DangerPattern::new(r"\bshutdown\b", Some("System shutdown")).unwrap(),
            DangerPattern::new("curl.*evil", None).unwrap(),
        ]);
        let output = patterns.to_string();
        assert!(output.contains("- System shutdown: `\\bshutdown\\b`"));
        assert!(output.contains("- `curl.*evil`"));
        assert_eq!(patterns.iter().count(), 2);
    }
}
