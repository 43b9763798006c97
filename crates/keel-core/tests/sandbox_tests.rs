mod common;

use std::{sync::Arc, time::Duration};

use keel_core::{
    params::{ExecutionHistory, KillProcess, RunCode, RunSandboxed},
    KeelError, Language, RiskLevel,
};

use common::create_test_planner;

fn sandboxed(command: &str, timeout_ms: Option<u64>) -> RunSandboxed {
    RunSandboxed {
        command: command.to_string(),
        args: Vec::new(),
        work_dir: None,
        timeout_ms,
        env: Default::default(),
    }
}

#[tokio::test]
async fn test_kill_running_process_by_tracking_id() {
    let (_temp_dir, planner) = create_test_planner().await;
    let planner = Arc::new(planner);

    let running = {
        let planner = Arc::clone(&planner);
        tokio::spawn(async move { planner.run_sandboxed(&sandboxed("sleep 30", None)).await })
    };

    let record = loop {
        if let Some(record) = planner.list_processes().into_iter().next() {
            break record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(record.command, "sleep 30");

    let killed = planner
        .kill_process(&KillProcess {
            target: record.tracking_id.clone(),
        })
        .expect("Process should be running");
    assert!(killed.0.killed);

    let result = running.await.unwrap();
    assert!(!result.ok);
    assert!(result.killed);
    assert_eq!(result.error.as_deref(), Some("Killed on request"));
    assert!(planner.list_processes().is_empty());
}

#[tokio::test]
async fn test_kill_running_process_by_pid() {
    let (_temp_dir, planner) = create_test_planner().await;
    let planner = Arc::new(planner);

    let running = {
        let planner = Arc::clone(&planner);
        tokio::spawn(async move { planner.run_sandboxed(&sandboxed("sleep 30", None)).await })
    };

    let pid = loop {
        if let Some(record) = planner.list_processes().get(0) {
            break record.pid;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    planner
        .kill_process(&KillProcess {
            target: pid.to_string(),
        })
        .unwrap();
    let result = running.await.unwrap();
    assert!(result.killed);
    assert_eq!(result.pid, Some(pid));

    // The process is gone now
    assert!(matches!(
        planner.kill_process(&KillProcess {
            target: pid.to_string()
        }),
        Err(KeelError::ProcessNotFound { .. })
    ));
}

#[tokio::test]
async fn test_timeout_through_handler() {
    let (_temp_dir, planner) = create_test_planner().await;

    let result = planner.run_sandboxed(&sandboxed("sleep 30", Some(100))).await;

    assert!(!result.ok);
    assert!(result.killed);
    assert_eq!(result.error.as_deref(), Some("Timed out after 100 ms"));
    assert!(result.elapsed_ms < 5_000);
}

#[tokio::test]
async fn test_dangerous_line_is_not_spawned() {
    let (_temp_dir, planner) = create_test_planner().await;

    let result = planner
        .run_sandboxed(&sandboxed("ls; rm -rf ~/projects", None))
        .await;

    assert!(result.was_denied());
    assert_eq!(
        result.verdict.as_ref().map(|verdict| verdict.level),
        Some(RiskLevel::Critical)
    );
    assert!(planner
        .execution_history(&ExecutionHistory::default())
        .is_empty());
}

#[tokio::test]
async fn test_run_shell_code() {
    let (temp_dir, planner) = create_test_planner().await;

    let result = planner
        .run_code(&RunCode {
            language: Language::Shell,
            source: "greeting=hello\necho \"$greeting from the snippet\"".to_string(),
            work_dir: Some(temp_dir.path().display().to_string()),
            timeout_ms: Some(5_000),
            env: Default::default(),
        })
        .await;

    assert!(result.ok, "{result:?}");
    assert_eq!(result.stdout.trim(), "hello from the snippet");
    assert_eq!(result.command, "shell snippet");
}

#[tokio::test]
async fn test_dangerous_code_is_refused() {
    let (temp_dir, planner) = create_test_planner().await;

    let result = planner
        .run_code(&RunCode {
            language: Language::Shell,
            source: "rm -rf /".to_string(),
            work_dir: None,
            timeout_ms: None,
            env: Default::default(),
        })
        .await;

    assert!(result.was_denied());
    let scratch = temp_dir.path().join("scratch");
    assert_eq!(std::fs::read_dir(scratch).unwrap().count(), 0);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let (_temp_dir, planner) = create_test_planner().await;

    for word in ["first", "second", "third"] {
        let result = planner
            .run_sandboxed(&RunSandboxed {
                command: "echo".to_string(),
                args: vec![word.to_string()],
                work_dir: None,
                timeout_ms: None,
                env: Default::default(),
            })
            .await;
        assert!(result.ok);
    }

    let history = planner.execution_history(&ExecutionHistory { limit: Some(2) });
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].command, "echo third");
    assert_eq!(history[1].command, "echo second");
    assert_eq!(history[0].stdout_len, "third\n".len());

    planner.clear_history();
    assert!(planner
        .execution_history(&ExecutionHistory::default())
        .is_empty());
}

#[tokio::test]
async fn test_run_code_with_env() {
    let (_temp_dir, planner) = create_test_planner().await;

    let mut params = RunCode {
        language: Language::Shell,
        source: "echo \"stage=$KEEL_STAGE\"".to_string(),
        work_dir: None,
        timeout_ms: Some(5_000),
        env: Default::default(),
    };
    params
        .env
        .insert("KEEL_STAGE".to_string(), "review".to_string());

    let result = planner.run_code(&params).await;
    assert!(result.ok, "{result:?}");
    assert_eq!(result.stdout.trim(), "stage=review");
}
