// src/run/skip.rs

//! Skip-cause bookkeeping for failed upstream nodes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::graph::{NodeGraph, NodeId};
use crate::run::result::NodeResult;

/// Records which nodes must be skipped and why.
///
/// The first recorded cause for a node wins; later failures upstream of the
/// same node do not overwrite it. Causes are recorded for every transitive
/// dependent in the *full* graph, but only ever consulted for nodes that are
/// about to be dispatched.
#[derive(Debug, Default)]
pub(crate) struct SkipCauses {
    map: HashMap<NodeId, Option<Arc<NodeResult>>>,
}

impl SkipCauses {
    /// Record `cause` for every transitive dependent of `failed`.
    pub fn record_dependents(
        &mut self,
        graph: &NodeGraph,
        failed: &str,
        cause: Option<Arc<NodeResult>>,
    ) {
        let mut stack: Vec<NodeId> = graph.dependents_of(failed).to_vec();
        let mut visited: HashSet<NodeId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }

            if !self.map.contains_key(&id) {
                debug!(node = %id, upstream = %failed, "marking node for skip");
                self.map.insert(id.clone(), cause.clone());
            }

            stack.extend(graph.dependents_of(&id).iter().cloned());
        }
    }

    /// Remove and return the recorded cause for `id`, if any.
    ///
    /// The outer `Option` distinguishes "not marked" from "marked with no
    /// detailed cause".
    pub fn take(&mut self, id: &str) -> Option<Option<Arc<NodeResult>>> {
        self.map.remove(id)
    }
}
