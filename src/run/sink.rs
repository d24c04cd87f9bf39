// src/run/sink.rs

//! Progress reporting seam.

use tracing::{debug, info, warn};

use crate::run::result::{NodeResult, NodeStatus};

/// Receives node lifecycle updates from the driver.
///
/// The engine publishes every node state change through this trait so
/// embedders can mirror node state into their own views; [`TracingSink`] is
/// the default implementation and emits structured tracing events.
pub trait ProgressSink: Send + Sync {
    /// The dispatch loop is about to start.
    fn run_started(&self, threads: usize, total: usize);

    /// A node was handed to a worker (or is about to run inline).
    fn node_started(&self, node_id: &str, index: usize, total: usize);

    /// A node's result was recorded. Called once per selected node, in
    /// completion order, including skipped and ephemeral nodes.
    fn node_finished(&self, result: &NodeResult, index: usize, total: usize);
}

/// Default sink: structured tracing events.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn run_started(&self, threads: usize, total: usize) {
        info!(threads, total, "concurrency");
    }

    fn node_started(&self, node_id: &str, index: usize, total: usize) {
        debug!(node = %node_id, index, total, "began running node");
    }

    fn node_finished(&self, result: &NodeResult, index: usize, total: usize) {
        let elapsed_ms = result.execution_time.as_millis() as u64;
        match &result.status {
            NodeStatus::Success => {
                info!(node = %result.node_id, index, total, elapsed_ms, "node finished");
            }
            NodeStatus::Error(msg) => {
                warn!(node = %result.node_id, index, total, error = %msg, "node errored");
            }
            NodeStatus::Fail(msg) => {
                warn!(node = %result.node_id, index, total, fail = %msg, "node check failed");
            }
            NodeStatus::Skipped { .. } => {
                info!(node = %result.node_id, index, total, "node skipped");
            }
        }
    }
}
