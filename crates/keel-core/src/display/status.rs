//! Status messages for operations that have no richer result to show.

use std::fmt;

/// Success or failure line for a mutation such as a whitelist change.
pub struct OperationStatus {
    pub message: String,
    pub success: bool,
}

impl OperationStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }

    /// Picks the success or failure message depending on `changed`.
    ///
    /// Used for idempotent set operations, where "already present" and "not
    /// present" are reported but are not errors.
    pub fn changed(changed: bool, done: impl Into<String>, unchanged: impl Into<String>) -> Self {
        if changed {
            Self::success(done)
        } else {
            Self::failure(unchanged)
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.success { "Success:" } else { "Error:" };
        writeln!(f, "{label} {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_status_display() {
        let success = OperationStatus::success("Added `terraform` to the whitelist");
        assert_eq!(
            success.to_string(),
            "Success: Added `terraform` to the whitelist\n"
        );

        let failure = OperationStatus::failure("Pattern not found");
        assert!(failure.to_string().starts_with("Error:"));
    }

    #[test]
    fn test_changed_selects_message() {
        let status = OperationStatus::changed(false, "added", "already present");
        assert!(!status.success);
        assert_eq!(status.message, "already present");

        let status = OperationStatus::changed(true, "added", "already present");
        assert!(status.success);
        assert_eq!(status.message, "added");
    }
}
