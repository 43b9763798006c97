//! MCP tool handlers implementation

use std::sync::Arc;

use keel_core::{params as core, Planner};
use log::debug;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};
use schemars::JsonSchema;
use serde::Deserialize;

use super::errors::to_mcp_error;

/// Generic MCP wrapper for core parameter types
///
/// Deserializes transparently into the wrapped core type and forwards its
/// JSON schema, so core parameters need no MCP-specific definitions.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

pub type BuildPlan = McpParams<core::BuildPlan>;
pub type Id = McpParams<core::Id>;
pub type ClassifyCommand = McpParams<core::ClassifyCommand>;
pub type ClassifyOperation = McpParams<core::ClassifyOperation>;
pub type WhitelistEntry = McpParams<core::WhitelistEntry>;
pub type PatternEntry = McpParams<core::PatternEntry>;
pub type RunSandboxed = McpParams<core::RunSandboxed>;
pub type RunCode = McpParams<core::RunCode>;
pub type InstallPackages = McpParams<core::InstallPackages>;
pub type KillProcess = McpParams<core::KillProcess>;
pub type ExecutionHistory = McpParams<core::ExecutionHistory>;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn text(result: impl ToString) -> McpResult {
    Ok(CallToolResult::success(vec![Content::text(
        result.to_string(),
    )]))
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    planner: Arc<Planner>,
}

impl McpHandlers {
    pub fn new(planner: Arc<Planner>) -> Self {
        Self { planner }
    }

    pub fn build_plan(&self, Parameters(params): Parameters<BuildPlan>) -> McpResult {
        debug!("build_plan: {:?}", params);

        let created = self
            .planner
            .build_plan_result(params.as_ref())
            .map_err(|e| to_mcp_error("Failed to build plan", &e))?;
        text(created)
    }

    pub async fn run_plan(&self, Parameters(params): Parameters<Id>) -> McpResult {
        debug!("run_plan: {:?}", params);

        let report = self
            .planner
            .run_plan_report(params.as_ref())
            .await
            .map_err(|e| to_mcp_error("Failed to run plan", &e))?;
        text(report)
    }

    pub fn show_plan(&self, Parameters(params): Parameters<Id>) -> McpResult {
        debug!("show_plan: {:?}", params);

        let plan = self
            .planner
            .show_plan(params.as_ref())
            .map_err(|e| to_mcp_error("Failed to get plan", &e))?;
        text(plan)
    }

    pub fn list_plans(&self) -> McpResult {
        debug!("list_plans");

        let summaries = self.planner.list_plans_summary();
        let title = if summaries.is_empty() {
            "No plans built yet"
        } else {
            "Plans"
        };
        text(format!("# {title}\n\n{summaries}"))
    }

    pub fn delete_plan(&self, Parameters(params): Parameters<Id>) -> McpResult {
        debug!("delete_plan: {:?}", params);

        let deleted = self
            .planner
            .delete_plan_result(params.as_ref())
            .map_err(|e| to_mcp_error("Failed to delete plan", &e))?;
        text(deleted)
    }

    pub fn classify_command(&self, Parameters(params): Parameters<ClassifyCommand>) -> McpResult {
        debug!("classify_command: {:?}", params);
        text(self.planner.classify_command(params.as_ref()))
    }

    pub fn classify_operation(
        &self,
        Parameters(params): Parameters<ClassifyOperation>,
    ) -> McpResult {
        debug!("classify_operation: {:?}", params);
        text(self.planner.classify_operation(params.as_ref()))
    }

    pub fn add_to_whitelist(&self, Parameters(params): Parameters<WhitelistEntry>) -> McpResult {
        debug!("add_to_whitelist: {:?}", params);

        let status = self
            .planner
            .add_to_whitelist(params.as_ref())
            .map_err(|e| to_mcp_error("Failed to update whitelist", &e))?;
        text(status)
    }

    pub fn remove_from_whitelist(
        &self,
        Parameters(params): Parameters<WhitelistEntry>,
    ) -> McpResult {
        debug!("remove_from_whitelist: {:?}", params);
        text(self.planner.remove_from_whitelist(params.as_ref()))
    }

    pub fn list_whitelist(&self) -> McpResult {
        debug!("list_whitelist");
        text(self.planner.list_whitelist())
    }

    pub fn add_danger_pattern(&self, Parameters(params): Parameters<PatternEntry>) -> McpResult {
        debug!("add_danger_pattern: {:?}", params);

        let status = self
            .planner
            .add_danger_pattern(params.as_ref())
            .map_err(|e| to_mcp_error("Failed to add danger pattern", &e))?;
        text(status)
    }

    pub fn remove_danger_pattern(
        &self,
        Parameters(params): Parameters<PatternEntry>,
    ) -> McpResult {
        debug!("remove_danger_pattern: {:?}", params);
        text(self.planner.remove_danger_pattern(params.as_ref()))
    }

    pub fn list_danger_patterns(&self) -> McpResult {
        debug!("list_danger_patterns");
        text(self.planner.list_danger_patterns())
    }

    pub fn security_report(&self) -> McpResult {
        debug!("security_report");
        text(self.planner.security_report())
    }

    pub async fn run_sandboxed(&self, Parameters(params): Parameters<RunSandboxed>) -> McpResult {
        debug!("run_sandboxed: {:?}", params);
        text(self.planner.run_sandboxed(params.as_ref()).await)
    }

    pub async fn run_code(&self, Parameters(params): Parameters<RunCode>) -> McpResult {
        debug!("run_code: {:?}", params);
        text(self.planner.run_code(params.as_ref()).await)
    }

    pub async fn install_packages(
        &self,
        Parameters(params): Parameters<InstallPackages>,
    ) -> McpResult {
        debug!("install_packages: {:?}", params);

        let result = self
            .planner
            .install_packages(params.as_ref())
            .await
            .map_err(|e| to_mcp_error("Failed to install packages", &e))?;
        text(result)
    }

    pub fn list_processes(&self) -> McpResult {
        debug!("list_processes");
        text(self.planner.list_processes())
    }

    pub fn kill_process(&self, Parameters(params): Parameters<KillProcess>) -> McpResult {
        debug!("kill_process: {:?}", params);

        let killed = self
            .planner
            .kill_process(params.as_ref())
            .map_err(|e| to_mcp_error("Failed to kill process", &e))?;
        text(killed)
    }

    pub fn execution_history(
        &self,
        Parameters(params): Parameters<ExecutionHistory>,
    ) -> McpResult {
        debug!("execution_history: {:?}", params);
        text(self.planner.execution_history(params.as_ref()))
    }

    pub fn clear_history(&self) -> McpResult {
        debug!("clear_history");
        text(self.planner.clear_history())
    }
}

#[cfg(test)]
mod tests {
    use keel_core::{PlannerBuilder, Settings};
    use rmcp::model::RawContent;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    async fn create_test_handlers() -> (TempDir, McpHandlers) {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.sandbox.grace_period_ms = 200;
        let planner = PlannerBuilder::new()
            .with_settings(settings)
            .with_scratch_dir(temp_dir.path().join("scratch"))
            .build()
            .await
            .unwrap();
        (temp_dir, McpHandlers::new(Arc::new(planner)))
    }

    fn params<T: JsonSchema + serde::de::DeserializeOwned>(
        value: serde_json::Value,
    ) -> Parameters<McpParams<T>> {
        Parameters(serde_json::from_value(value).unwrap())
    }

    fn result_text(result: CallToolResult) -> String {
        match &result.content[0].raw {
            RawContent::Text(text) => text.text.clone(),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_build_and_run_plan() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let built = handlers
            .build_plan(params(json!({"spec": ["echo one", "echo two"], "title": "Two"})))
            .unwrap();
        let text = result_text(built);
        assert!(text.starts_with("Created plan with ID: "));

        let id = handlers.planner.list_plans()[0].id.clone();
        let ran = handlers
            .run_plan(params(json!({ "id": id })))
            .await
            .unwrap();
        assert!(result_text(ran).starts_with("Plan completed: 2/2 steps succeeded"));

        let listed = result_text(handlers.list_plans().unwrap());
        assert!(listed.starts_with("# Plans"));
        assert!(listed.contains("(2/2)"));
    }

    #[tokio::test]
    async fn test_unknown_plan_is_an_error() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let error = handlers
            .show_plan(params(json!({"id": "nope"})))
            .unwrap_err();
        assert!(error.message.contains("Plan with ID nope not found"));
    }

    #[tokio::test]
    async fn test_denied_command_is_reported_not_raised() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let result = handlers
            .run_sandboxed(params(json!({"command": "rm -rf /"})))
            .await
            .unwrap();
        let text = result_text(result);
        assert!(text.contains("✗ denied"));
        assert!(text.contains("Access denied (CRITICAL)"));
    }

    #[tokio::test]
    async fn test_install_packages_rejects_bad_names() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let error = handlers
            .install_packages(params(json!({"packages": ["-g"], "manager": "pnpm"})))
            .await
            .unwrap_err();
        assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(error.message.contains("Invalid package name '-g'"));
    }

    #[tokio::test]
    async fn test_classify_operation_params() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let result = handlers
            .classify_operation(params(json!({"operation": "read_file", "target": "notes/todo.md"})))
            .unwrap();
        assert!(result_text(result).starts_with("**✓ Allowed** (LOW)"));
    }
}
