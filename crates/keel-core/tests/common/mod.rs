use keel_core::{PlannerBuilder, SandboxSettings, Settings};
use tempfile::TempDir;

/// Helper function to create a test planner with its own scratch directory
/// and a short kill grace period
pub async fn create_test_planner() -> (TempDir, keel_core::Planner) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = Settings {
        sandbox: SandboxSettings {
            grace_period_ms: 200,
            ..SandboxSettings::default()
        },
        ..Settings::default()
    };
    let planner = PlannerBuilder::new()
        .with_settings(settings)
        .with_scratch_dir(temp_dir.path().join("scratch"))
        .build()
        .await
        .expect("Failed to create planner");
    (temp_dir, planner)
}
