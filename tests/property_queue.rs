// tests/property_queue.rs

use std::collections::{BTreeSet, HashSet};

use futures::executor::block_on;
use proptest::prelude::*;

use dagrun::graph::{GraphQueue, NodeGraph, NodeInfo};
use dagrun::types::NodeKind;

// Strategy to generate a valid DAG: node N may only depend on nodes 0..N-1,
// which guarantees acyclicity.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_nodes),
            num_nodes,
        )
        .prop_map(move |raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential_deps)| {
                    let mut seen = HashSet::new();
                    potential_deps
                        .into_iter()
                        .filter_map(|d| if i > 0 { Some(d % i) } else { None })
                        .filter(|d| seen.insert(*d))
                        .collect()
                })
                .collect()
        })
    })
}

fn build_graph(deps: &[Vec<usize>]) -> NodeGraph {
    let nodes = deps
        .iter()
        .enumerate()
        .map(|(i, ds)| NodeInfo {
            id: format!("node_{i}"),
            kind: NodeKind::Command,
            cmd: String::new(),
            deps: ds.iter().map(|d| format!("node_{d}")).collect(),
            ephemeral: false,
            namespace: None,
        })
        .collect();
    NodeGraph::new(nodes)
}

proptest! {
    // Drive the queue to completion with arbitrary completion interleavings:
    // every node must be handed out exactly once, never before its selected
    // dependencies completed, and the queue must drain.
    #[test]
    fn every_node_dispatched_once_after_its_dependencies(
        deps in dag_strategy(8),
        picks in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let graph = build_graph(&deps);
        let selected: BTreeSet<String> = graph.ids().map(str::to_string).collect();
        let queue = GraphQueue::new(&graph, &selected).unwrap();

        let mut dispatched: Vec<String> = Vec::new();
        let mut in_flight: Vec<String> = Vec::new();
        let mut completed: HashSet<String> = HashSet::new();
        let mut pick_at = 0usize;

        loop {
            // get() cannot block here: we only call it while something is
            // ready.
            while queue.ready_len() > 0 {
                let id = block_on(queue.get()).expect("a ready node");
                for dep in graph.dependencies_of(&id) {
                    prop_assert!(
                        completed.contains(dep),
                        "node {} dispatched before dependency {}",
                        id,
                        dep
                    );
                }
                prop_assert!(!dispatched.contains(&id), "node {} dispatched twice", id);
                dispatched.push(id.clone());
                in_flight.push(id);
            }

            if in_flight.is_empty() {
                break;
            }

            // Complete an arbitrary in-flight node next.
            let pick = if picks.is_empty() {
                0
            } else {
                picks[pick_at % picks.len()] % in_flight.len()
            };
            pick_at += 1;

            let id = in_flight.swap_remove(pick);
            queue.mark_done(&id);
            completed.insert(id);
        }

        prop_assert!(queue.empty());
        prop_assert_eq!(queue.completed(), selected.len());
        prop_assert_eq!(dispatched.len(), selected.len());
    }
}
