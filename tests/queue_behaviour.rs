// tests/queue_behaviour.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use dagrun::errors::DagrunError;
use dagrun::graph::GraphQueue;
use dagrun_test_utils::builders::{select_all, GraphBuilder};
use dagrun_test_utils::init_tracing;

#[tokio::test]
async fn chain_releases_nodes_in_dependency_order() {
    init_tracing();

    let graph = GraphBuilder::new()
        .node("a")
        .node_after("b", &["a"])
        .node_after("c", &["b"])
        .build();
    let queue = GraphQueue::new(&graph, &select_all(&graph)).unwrap();

    assert_eq!(queue.get().await, Some("a".to_string()));
    assert_eq!(queue.ready_len(), 0);
    assert!(!queue.empty());

    queue.mark_done("a");
    assert_eq!(queue.get().await, Some("b".to_string()));
    queue.mark_done("b");
    assert_eq!(queue.get().await, Some("c".to_string()));

    // Everything is handed out; nothing more to dispatch.
    assert!(queue.empty());
    assert_eq!(queue.get().await, None);

    queue.mark_done("c");
    assert_eq!(queue.completed(), 3);
    timeout(Duration::from_secs(1), queue.join())
        .await
        .expect("join should return once all nodes are done");
}

#[tokio::test]
async fn diamond_waits_for_both_branches() {
    init_tracing();

    let graph = GraphBuilder::new()
        .node("a")
        .node_after("b", &["a"])
        .node_after("c", &["a"])
        .node_after("d", &["b", "c"])
        .build();
    let queue = GraphQueue::new(&graph, &select_all(&graph)).unwrap();

    assert_eq!(queue.get().await, Some("a".to_string()));
    queue.mark_done("a");

    assert_eq!(queue.get().await, Some("b".to_string()));
    assert_eq!(queue.get().await, Some("c".to_string()));
    assert_eq!(queue.ready_len(), 0);

    queue.mark_done("b");
    // d still has one outstanding dependency.
    assert_eq!(queue.ready_len(), 0);

    queue.mark_done("c");
    assert_eq!(queue.get().await, Some("d".to_string()));
    queue.mark_done("d");

    assert_eq!(queue.completed(), 4);
}

#[tokio::test]
async fn duplicate_mark_done_is_ignored() {
    init_tracing();

    let graph = GraphBuilder::new().node("a").node_after("b", &["a"]).build();
    let queue = GraphQueue::new(&graph, &select_all(&graph)).unwrap();

    assert_eq!(queue.get().await, Some("a".to_string()));
    queue.mark_done("a");
    queue.mark_done("a");

    assert_eq!(queue.completed(), 1);
    assert_eq!(queue.get().await, Some("b".to_string()));
    assert_eq!(queue.get().await, None);
}

#[tokio::test]
async fn dependencies_outside_the_selection_are_treated_as_satisfied() {
    init_tracing();

    let graph = GraphBuilder::new().node("a").node_after("b", &["a"]).build();
    let selected: BTreeSet<String> = ["b".to_string()].into_iter().collect();
    let queue = GraphQueue::new(&graph, &selected).unwrap();

    assert_eq!(queue.get().await, Some("b".to_string()));
    queue.mark_done("b");
    assert_eq!(queue.completed(), 1);
}

#[tokio::test]
async fn unknown_selected_node_is_an_internal_error() {
    init_tracing();

    let graph = GraphBuilder::new().node("a").build();
    let selected: BTreeSet<String> = ["a".to_string(), "zz".to_string()].into_iter().collect();

    match GraphQueue::new(&graph, &selected) {
        Err(DagrunError::Internal(msg)) => assert!(msg.contains("zz")),
        other => panic!("expected internal error, got {other:?}"),
    }
}

#[tokio::test]
async fn wait_until_reports_incremental_completions() {
    init_tracing();

    let graph = GraphBuilder::new().node("a").node_after("b", &["a"]).build();
    let queue = Arc::new(GraphQueue::new(&graph, &select_all(&graph)).unwrap());

    assert_eq!(queue.get().await, Some("a".to_string()));

    let marker = Arc::clone(&queue);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        marker.mark_done("a");
    });

    let more_to_come = timeout(Duration::from_secs(1), queue.wait_until_something_was_done())
        .await
        .expect("wait should wake on completion");
    assert!(more_to_come);

    assert_eq!(queue.get().await, Some("b".to_string()));
    queue.mark_done("b");

    // Fully drained now; further waits return immediately.
    assert!(!queue.wait_until_something_was_done().await);
    assert!(!queue.wait_until_something_was_done().await);
}

#[tokio::test]
async fn abort_wakes_blocked_waiters() {
    init_tracing();

    let graph = GraphBuilder::new().node("a").node_after("b", &["a"]).build();
    let queue = Arc::new(GraphQueue::new(&graph, &select_all(&graph)).unwrap());

    assert_eq!(queue.get().await, Some("a".to_string()));

    // b is not ready, so this get() blocks until the abort.
    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.get().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.abort();

    let woken = timeout(Duration::from_secs(1), waiter)
        .await
        .expect("get should wake on abort")
        .unwrap();
    assert_eq!(woken, None);

    assert!(queue.empty());
    timeout(Duration::from_secs(1), queue.join())
        .await
        .expect("join should return after abort");
    assert!(!queue.wait_until_something_was_done().await);
}
