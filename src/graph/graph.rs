// src/graph/graph.rs

use std::collections::BTreeMap;

use crate::config::model::ConfigFile;
use crate::graph::node::NodeInfo;
use crate::graph::NodeId;

/// Full in-memory dependency graph keyed by node id.
///
/// This is intentionally lightweight; acyclicity is validated in
/// `config::validate` (or by the embedder constructing the graph), so here we
/// just keep adjacency information for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    nodes: BTreeMap<NodeId, NodeInfo>,
    /// Direct dependents of each node (nodes that list it in `after`).
    dependents: BTreeMap<NodeId, Vec<NodeId>>,
}

impl NodeGraph {
    /// Build a graph from already-validated nodes.
    ///
    /// Assumes that all dependency references are valid and that there are
    /// no cycles.
    pub fn new(nodes: Vec<NodeInfo>) -> Self {
        let nodes: BTreeMap<NodeId, NodeInfo> =
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        let mut dependents: BTreeMap<NodeId, Vec<NodeId>> =
            nodes.keys().map(|id| (id.clone(), Vec::new())).collect();

        for (id, node) in nodes.iter() {
            for dep in node.deps.iter() {
                if let Some(entries) = dependents.get_mut(dep) {
                    entries.push(id.clone());
                }
            }
        }

        Self { nodes, dependents }
    }

    /// Build a graph from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let nodes = cfg
            .node
            .iter()
            .map(|(id, nc)| NodeInfo::from_config(id.clone(), nc))
            .collect();
        Self::new(nodes)
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&NodeInfo> {
        self.nodes.get(id)
    }

    /// All node ids, in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependencies of a node (the nodes listed in its `after`).
    pub fn dependencies_of(&self, id: &str) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a node (nodes that list this one in their
    /// `after`).
    pub fn dependents_of(&self, id: &str) -> &[NodeId] {
        self.dependents
            .get(id)
            .map(|n| n.as_slice())
            .unwrap_or(&[])
    }
}
