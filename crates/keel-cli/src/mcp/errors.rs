//! Error handling utilities for MCP server

use keel_core::KeelError;
use rmcp::ErrorData;

/// Convert a keel error into an MCP error.
///
/// Rejected input and missing plans or processes are the caller's problem
/// and map to `invalid_params`; everything else is an internal error.
pub fn to_mcp_error(message: &str, error: &KeelError) -> ErrorData {
    let message = format!("{message}: {error}");
    match error {
        KeelError::Validation { .. }
        | KeelError::PlanNotFound { .. }
        | KeelError::ProcessNotFound { .. }
        | KeelError::Pattern { .. } => ErrorData::invalid_params(message, None),
        _ => ErrorData::internal_error(message, None),
    }
}

#[cfg(test)]
mod tests {
    use rmcp::model::ErrorCode;

    use super::*;

    #[test]
    fn test_lookup_misses_are_invalid_params() {
        let error = KeelError::PlanNotFound {
            id: "missing".to_string(),
        };
        let data = to_mcp_error("Failed to get plan", &error);
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(data.message, "Failed to get plan: Plan with ID missing not found");
    }

    #[test]
    fn test_other_errors_are_internal() {
        let error = KeelError::Configuration {
            message: "no scratch dir".to_string(),
        };
        let data = to_mcp_error("Failed to run plan", &error);
        assert_eq!(data.code, ErrorCode::INTERNAL_ERROR);
    }
}
