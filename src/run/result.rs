// src/run/result.rs

//! Per-node results and the aggregate run outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::graph::NodeId;

/// Outcome of executing (or skipping) one node.
#[derive(Debug, Clone)]
pub enum NodeStatus {
    Success,
    /// Unrecoverable execution error; transitive dependents are skipped.
    Error(String),
    /// Recoverable validation-style failure; dependents still run.
    Fail(String),
    /// Pre-empted because an upstream dependency errored.
    ///
    /// `cause` carries the upstream result when the failing dependency was
    /// ephemeral (its error would otherwise never be visible); `None` means
    /// the failure was already reported through the upstream node's own
    /// result.
    Skipped { cause: Option<Arc<NodeResult>> },
}

impl NodeStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, NodeStatus::Error(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, NodeStatus::Fail(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, NodeStatus::Skipped { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::Success => "success",
            NodeStatus::Error(_) => "error",
            NodeStatus::Fail(_) => "fail",
            NodeStatus::Skipped { .. } => "skipped",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Success => write!(f, "success"),
            NodeStatus::Error(msg) => write!(f, "error: {msg}"),
            NodeStatus::Fail(msg) => write!(f, "fail: {msg}"),
            NodeStatus::Skipped { .. } => write!(f, "skipped"),
        }
    }
}

/// Result of one node, produced exactly once per selected node.
#[derive(Debug, Clone)]
pub struct NodeResult {
    pub node_id: NodeId,
    pub status: NodeStatus,
    pub execution_time: Duration,
}

impl NodeResult {
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            NodeStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Per-status tallies over a result sequence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub success: usize,
    pub errors: usize,
    pub fails: usize,
    pub skipped: usize,
}

/// Ordered result sequence plus aggregate timing for one run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Results in completion order (not dependency order). Ephemeral nodes
    /// are excluded.
    pub results: Vec<NodeResult>,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// A run succeeds when no recorded result is an error or a failed check.
    pub fn success(&self) -> bool {
        !self
            .results
            .iter()
            .any(|r| r.status.is_error() || r.status.is_fail())
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for result in &self.results {
            match result.status {
                NodeStatus::Success => counts.success += 1,
                NodeStatus::Error(_) => counts.errors += 1,
                NodeStatus::Fail(_) => counts.fails += 1,
                NodeStatus::Skipped { .. } => counts.skipped += 1,
            }
        }
        counts
    }
}
