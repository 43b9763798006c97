mod common;

use std::io::Write;

use keel_core::{
    params::{BuildPlan, ClassifyOperation, Id},
    KeelError, OperationKind, PlanStatus, PlannerBuilder, RiskLevel, Settings,
};
use serde_json::{json, Map};
use tempfile::{NamedTempFile, TempDir};

use common::create_test_planner;

#[tokio::test]
#[allow(clippy::too_many_lines)]
async fn test_complete_plan_workflow() {
    let (temp_dir, planner) = create_test_planner().await;
    let output = temp_dir.path().join("greeting.txt");

    let mut context = Map::new();
    context.insert(
        "work_dir".to_string(),
        json!(temp_dir.path().display().to_string()),
    );

    // Build a keyed plan from the object shape
    let created = planner
        .build_plan_result(&BuildPlan {
            spec: json!({
                "title": "Greeting",
                "steps": [
                    {"key": "write", "title": "Write greeting", "cmd": "echo hello > greeting.txt"},
                    {"key": "read", "title": "Read greeting", "cmd": "cat greeting.txt", "after": ["write"]},
                    {"key": "count", "title": "Count words", "cmd": "wc -w greeting.txt", "after": ["write"]}
                ]
            }),
            context,
            title: None,
        })
        .expect("Failed to build plan");
    let plan = created.resource;
    assert_eq!(plan.title, "Greeting");
    assert_eq!(plan.status, PlanStatus::Ready);
    assert_eq!(plan.steps.len(), 3);
    assert_eq!(plan.graph.edge_count(), 2);

    // Summaries list the new plan
    let summaries = planner.list_plans_summary();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_steps, 3);
    assert_eq!(summaries[0].attempted_steps, 0);

    // Run it
    let id = Id {
        id: plan.id.clone(),
    };
    let report = planner.run_plan_report(&id).await.expect("Failed to run plan");
    let outcome = report.0;
    assert!(outcome.ok, "{:?}", outcome.plan.results);
    assert_eq!(outcome.plan.status, PlanStatus::Completed);
    assert_eq!(outcome.plan.results.len(), 3);
    assert!(output.exists());

    let read = outcome
        .plan
        .result_for(&plan.steps[1].id)
        .expect("Read step should have run");
    assert_eq!(read.stdout.trim(), "hello");

    // The stored plan reflects the run
    let shown = planner.show_plan(&id).expect("Plan should exist");
    assert_eq!(shown.status, PlanStatus::Completed);
    let summaries = planner.list_plans_summary();
    assert_eq!(summaries[0].succeeded_steps, 3);

    // Markdown rendering carries the results
    let markdown = shown.to_string();
    assert!(markdown.contains("# Greeting"));
    assert!(markdown.contains("### Read greeting"));
    assert!(markdown.contains("hello"));

    // Plans serialize for the MCP and JSON output paths
    let value = serde_json::to_value(&shown).expect("Plan should serialize");
    assert_eq!(value["status"], "completed");
    assert_eq!(value["steps"][0]["action"]["kind"], "command");

    // Delete it
    let deleted = planner.delete_plan_result(&id).expect("Failed to delete");
    assert!(deleted.to_string().contains("Deleted plan 'Greeting'"));
    assert!(matches!(
        planner.show_plan(&id),
        Err(KeelError::PlanNotFound { .. })
    ));
}

#[tokio::test]
async fn test_failed_plan_reports_unattempted_steps() {
    let (_temp_dir, planner) = create_test_planner().await;

    let plan = planner
        .build_plan(
            json!(["echo start", "ls /definitely/not/here", "echo never"]),
            Map::new(),
            Some("Broken".to_string()),
        )
        .unwrap();
    let report = planner
        .run_plan_report(&Id {
            id: plan.id.clone(),
        })
        .await
        .unwrap();

    assert!(!report.0.ok);
    let text = report.to_string();
    assert!(text.starts_with("Plan failed: 2 of 3 steps attempted, 1 succeeded"));
    assert!(text.contains("- Result: not attempted"));

    let summary = &planner.list_plans_summary()[0];
    assert_eq!(summary.status, PlanStatus::Failed);
    assert_eq!(summary.attempted_steps, 2);
}

#[tokio::test]
async fn test_settings_extend_the_gate() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = NamedTempFile::new().unwrap();
    write!(
        config,
        r#"{{
            "sandbox": {{"grace_period_ms": 100}},
            "gate": {{
                "extra_whitelist": ["frobnicate"],
                "extra_danger_patterns": ["\\bdeploy\\s+--prod\\b"]
            }}
        }}"#
    )
    .unwrap();

    let settings = Settings::load(Some(config.path())).expect("Failed to load settings");
    assert_eq!(settings.sandbox.grace_period_ms, 100);
    assert_eq!(settings.sandbox.max_concurrency, 5);

    let planner = PlannerBuilder::new()
        .with_settings(settings)
        .with_scratch_dir(temp_dir.path())
        .build()
        .await
        .unwrap();

    assert!(planner.gate().classify("frobnicate --all").allow);
    let verdict = planner.gate().classify("make deploy --prod");
    assert!(!verdict.allow);
    assert_eq!(verdict.level, RiskLevel::Critical);

    // The scratch directory is always a safe root
    let inside = temp_dir.path().join("old.log");
    let verdict = planner.classify_operation(&ClassifyOperation {
        operation: OperationKind::DeleteFile,
        target: Some(inside.display().to_string()),
    });
    assert!(verdict.allow);
    assert!(verdict.need_confirm);
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
    let mut config = NamedTempFile::new().unwrap();
    write!(config, r#"{{"gate": {{"extra_danger_patterns": ["(unclosed"]}}}}"#).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let settings = Settings::load(Some(config.path())).unwrap();
    let result = PlannerBuilder::new()
        .with_settings(settings)
        .with_scratch_dir(temp_dir.path())
        .build()
        .await;
    assert!(matches!(result, Err(KeelError::Pattern { .. })));

    let mut broken = NamedTempFile::new().unwrap();
    write!(broken, "not json").unwrap();
    assert!(matches!(
        Settings::load(Some(broken.path())),
        Err(KeelError::Serialization { .. })
    ));
}
