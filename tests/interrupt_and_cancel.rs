// tests/interrupt_and_cancel.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use dagrun::errors::DagrunError;
use dagrun::run::driver::{RunDriver, RunOptions};
use dagrun::run::sink::TracingSink;
use dagrun_test_utils::builders::{select_all, GraphBuilder};
use dagrun_test_utils::fake::{FakeBackend, FakeRunnerFactory};
use dagrun_test_utils::init_tracing;

#[tokio::test]
async fn interrupt_aborts_the_run_and_cancels_open_sessions() {
    init_tracing();

    let graph = Arc::new(GraphBuilder::new().node("a").node_after("b", &["a"]).build());
    let factory = Arc::new(FakeRunnerFactory::new());
    factory.gate("a");

    let backend = Arc::new(FakeBackend::new().with_sessions(&["a"]));

    let mut driver = RunDriver::new(
        Arc::clone(&graph),
        select_all(&graph),
        RunOptions {
            threads: 2,
            single_threaded: false,
            fail_fast: false,
            raise_on_first_error: false,
        },
        Arc::clone(&factory) as Arc<dyn dagrun::exec::RunnerFactory>,
        Arc::clone(&backend) as Arc<dyn dagrun::exec::ExecutionBackend>,
        Arc::new(TracingSink),
    );
    driver.initialize().unwrap();
    let abort = driver.abort_handle().unwrap();

    let run = tokio::spawn(driver.execute());

    // Interrupt while a is in flight; b must never be dispatched.
    factory.wait_for_start("a").await;
    abort.interrupt();

    tokio::time::sleep(Duration::from_millis(50)).await;
    factory.release("a");

    match timeout(Duration::from_secs(3), run).await.unwrap().unwrap() {
        Err(DagrunError::Interrupted) => {}
        other => panic!("expected interrupt, got {other:?}"),
    }

    assert_eq!(backend.cancel_calls(), 1);
    assert_eq!(factory.executed(), vec!["a".to_string()]);
}

#[tokio::test]
async fn interrupt_during_drain_phase_is_surfaced() {
    init_tracing();

    // Single root, already dispatched: the driver sits in its drain wait
    // when the interrupt arrives.
    let graph = Arc::new(GraphBuilder::new().node("a").build());
    let factory = Arc::new(FakeRunnerFactory::new());
    factory.gate("a");

    let backend = Arc::new(FakeBackend::new());

    let mut driver = RunDriver::new(
        Arc::clone(&graph),
        select_all(&graph),
        RunOptions {
            threads: 2,
            single_threaded: false,
            fail_fast: true,
            raise_on_first_error: false,
        },
        Arc::clone(&factory) as Arc<dyn dagrun::exec::RunnerFactory>,
        Arc::clone(&backend) as Arc<dyn dagrun::exec::ExecutionBackend>,
        Arc::new(TracingSink),
    );
    driver.initialize().unwrap();
    let abort = driver.abort_handle().unwrap();

    let run = tokio::spawn(driver.execute());

    factory.wait_for_start("a").await;
    abort.interrupt();

    tokio::time::sleep(Duration::from_millis(50)).await;
    factory.release("a");

    match timeout(Duration::from_secs(3), run).await.unwrap().unwrap() {
        Err(DagrunError::Interrupted) => {}
        other => panic!("expected interrupt, got {other:?}"),
    }
}
