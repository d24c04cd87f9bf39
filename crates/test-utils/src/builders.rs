#![allow(dead_code)]

use std::collections::BTreeSet;

use dagrun::graph::{NodeGraph, NodeInfo};
use dagrun::types::{Namespace, NodeKind};

/// Builder for in-memory node graphs to simplify test setup.
///
/// Built graphs are assumed valid (no cycles, known dependencies), matching
/// what `config::validate` would enforce for config-driven graphs.
pub struct GraphBuilder {
    nodes: Vec<NodeInfo>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Plain node with no dependencies.
    pub fn node(self, id: &str) -> Self {
        self.node_after(id, &[])
    }

    /// Plain node with dependencies.
    pub fn node_after(self, id: &str, after: &[&str]) -> Self {
        self.push(id, "", NodeKind::Command, after, false, None)
    }

    /// Ephemeral node with dependencies.
    pub fn ephemeral_after(self, id: &str, after: &[&str]) -> Self {
        self.push(id, "", NodeKind::Command, after, true, None)
    }

    /// Node that materializes into `namespace` (as `"container.name"`).
    pub fn node_in_namespace(self, id: &str, after: &[&str], namespace: &str) -> Self {
        self.push(id, "", NodeKind::Command, after, false, Some(namespace))
    }

    /// Node backed by a real shell command.
    pub fn cmd_node(self, id: &str, cmd: &str, after: &[&str]) -> Self {
        self.push(id, cmd, NodeKind::Command, after, false, None)
    }

    /// Check node backed by a real shell command (nonzero exit = fail).
    pub fn check_node(self, id: &str, cmd: &str, after: &[&str]) -> Self {
        self.push(id, cmd, NodeKind::Check, after, false, None)
    }

    fn push(
        mut self,
        id: &str,
        cmd: &str,
        kind: NodeKind,
        after: &[&str],
        ephemeral: bool,
        namespace: Option<&str>,
    ) -> Self {
        self.nodes.push(NodeInfo {
            id: id.to_string(),
            kind,
            cmd: cmd.to_string(),
            deps: after.iter().map(|s| s.to_string()).collect(),
            ephemeral,
            namespace: namespace
                .map(|ns| Namespace::parse(ns).expect("valid namespace in test builder")),
        });
        self
    }

    pub fn build(self) -> NodeGraph {
        NodeGraph::new(self.nodes)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Selected set containing every node of the graph.
pub fn select_all(graph: &NodeGraph) -> BTreeSet<String> {
    graph.ids().map(str::to_string).collect()
}
