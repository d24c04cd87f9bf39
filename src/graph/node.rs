// src/graph/node.rs

//! Node metadata.

use crate::config::model::NodeConfig;
use crate::graph::NodeId;
use crate::types::{Namespace, NodeKind};

/// A single schedulable unit of work.
///
/// Identity and dependencies are fixed once a run starts; the engine never
/// mutates a node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Shell command executed by the process runner. Embedders with their
    /// own runner factory may leave this empty.
    pub cmd: String,
    /// Direct dependencies (the node ids in `after = [...]`).
    pub deps: Vec<NodeId>,
    /// Ephemeral nodes gate their dependents but are excluded from progress
    /// counters and from the visible result list.
    pub ephemeral: bool,
    /// Namespace the node materializes into, provisioned before the run.
    pub namespace: Option<Namespace>,
}

impl NodeInfo {
    /// Build from a validated `[node.<name>]` config section.
    pub fn from_config(id: NodeId, cfg: &NodeConfig) -> Self {
        Self {
            id,
            kind: cfg.kind,
            cmd: cfg.cmd.clone(),
            deps: cfg.after.clone(),
            ephemeral: cfg.ephemeral,
            // Format was checked in config::validate.
            namespace: cfg.namespace.as_deref().and_then(|ns| Namespace::parse(ns).ok()),
        }
    }
}
