// tests/command_backend.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use dagrun::exec::backend::ExecutionBackend;
use dagrun::exec::command::{CommandBackend, CommandRunnerFactory};
use dagrun::run::driver::{RunDriver, RunOptions};
use dagrun::run::result::{NodeResult, NodeStatus, RunOutcome};
use dagrun::run::sink::TracingSink;
use dagrun_test_utils::builders::{select_all, GraphBuilder};
use dagrun_test_utils::init_tracing;

fn result_of<'a>(outcome: &'a RunOutcome, id: &str) -> &'a NodeResult {
    outcome
        .results
        .iter()
        .find(|r| r.node_id == id)
        .unwrap_or_else(|| panic!("no result for node {id}"))
}

#[tokio::test]
async fn namespaces_are_directories_under_the_workspace() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let backend = CommandBackend::new(dir.path());

    backend.create_namespace("db1", "s1").await.unwrap();
    assert!(dir.path().join("db1").join("s1").is_dir());

    let mut names = backend.list_namespaces("db1").await.unwrap();
    names.sort();
    assert_eq!(names, vec!["s1".to_string()]);

    // A container that was never created lists as empty.
    assert!(backend.list_namespaces("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn command_exit_codes_map_to_statuses() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(CommandBackend::new(dir.path()));
    let factory = Arc::new(CommandRunnerFactory::new(Arc::clone(&backend)));

    // a succeeds; b errors (skipping c); the independent check fails
    // recoverably.
    let graph = Arc::new(
        GraphBuilder::new()
            .cmd_node("a", "true", &[])
            .cmd_node("b", "false", &["a"])
            .cmd_node("c", "true", &["b"])
            .check_node("chk", "false", &[])
            .build(),
    );

    let mut driver = RunDriver::new(
        Arc::clone(&graph),
        select_all(&graph),
        RunOptions {
            threads: 1,
            single_threaded: true,
            fail_fast: false,
            raise_on_first_error: false,
        },
        factory,
        backend,
        Arc::new(TracingSink),
    );
    driver.initialize().unwrap();

    let outcome = timeout(Duration::from_secs(10), driver.execute())
        .await
        .expect("run did not finish in time")
        .unwrap();

    assert!(!outcome.success());
    assert!(matches!(result_of(&outcome, "a").status, NodeStatus::Success));

    match &result_of(&outcome, "b").status {
        NodeStatus::Error(msg) => assert!(msg.contains("status 1")),
        other => panic!("expected b to error, got {other:?}"),
    }

    assert!(result_of(&outcome, "c").status.is_skipped());

    match &result_of(&outcome, "chk").status {
        NodeStatus::Fail(msg) => assert!(msg.contains("status 1")),
        other => panic!("expected chk to fail, got {other:?}"),
    }
}

#[tokio::test]
async fn node_output_is_consumed_without_blocking() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(CommandBackend::new(dir.path()));
    let factory = Arc::new(CommandRunnerFactory::new(Arc::clone(&backend)));

    // Enough output to fill a pipe buffer if nobody were draining it.
    let graph = Arc::new(
        GraphBuilder::new()
            .cmd_node("noisy", "seq 1 100000", &[])
            .build(),
    );

    let mut driver = RunDriver::new(
        Arc::clone(&graph),
        select_all(&graph),
        RunOptions::default(),
        factory,
        backend,
        Arc::new(TracingSink),
    );
    driver.initialize().unwrap();

    let outcome = timeout(Duration::from_secs(10), driver.execute())
        .await
        .expect("noisy command should not deadlock on full pipes")
        .unwrap();
    assert!(outcome.success());
}
