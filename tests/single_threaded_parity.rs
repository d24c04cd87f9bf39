// tests/single_threaded_parity.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use dagrun::graph::NodeGraph;
use dagrun::run::driver::{RunDriver, RunOptions};
use dagrun::run::result::NodeStatus;
use dagrun::run::sink::TracingSink;
use dagrun_test_utils::builders::{select_all, GraphBuilder};
use dagrun_test_utils::fake::{FakeBackend, FakeRunnerFactory};
use dagrun_test_utils::init_tracing;

fn graph() -> Arc<NodeGraph> {
    Arc::new(
        GraphBuilder::new()
            .ephemeral_after("e", &[])
            .node_after("x", &["e"])
            .node("y")
            .node_after("z", &["y"])
            .build(),
    )
}

fn factory_with_outcomes() -> Arc<FakeRunnerFactory> {
    let factory = Arc::new(FakeRunnerFactory::new());
    factory.error("e", "ephemeral boom");
    factory
}

/// Sorted (node id, status label, skip-cause node id) triples.
async fn run_shape(single_threaded: bool) -> Vec<(String, String, Option<String>)> {
    let graph = graph();
    let factory = factory_with_outcomes();

    let mut driver = RunDriver::new(
        Arc::clone(&graph),
        select_all(&graph),
        RunOptions {
            threads: 4,
            single_threaded,
            fail_fast: false,
            raise_on_first_error: false,
        },
        factory,
        Arc::new(FakeBackend::new()),
        Arc::new(TracingSink),
    );
    driver.initialize().unwrap();

    let outcome = timeout(Duration::from_secs(3), driver.execute())
        .await
        .expect("run did not finish in time")
        .unwrap();

    let mut shape: Vec<_> = outcome
        .results
        .iter()
        .map(|r| {
            let cause = match &r.status {
                NodeStatus::Skipped { cause } => cause.as_ref().map(|c| c.node_id.clone()),
                _ => None,
            };
            (r.node_id.clone(), r.status.label().to_string(), cause)
        })
        .collect();
    shape.sort();
    shape
}

#[tokio::test]
async fn pool_and_single_threaded_modes_agree() {
    init_tracing();

    let pooled = run_shape(false).await;
    let inline = run_shape(true).await;

    assert_eq!(pooled, inline);

    // And both picked the expected statuses.
    assert_eq!(
        inline,
        vec![
            (
                "x".to_string(),
                "skipped".to_string(),
                Some("e".to_string())
            ),
            ("y".to_string(), "success".to_string(), None),
            ("z".to_string(), "success".to_string(), None),
        ]
    );
}
