// src/exec/runner.rs

//! Runner seam between the driver and the per-node work.
//!
//! The driver constructs one runner per dispatched node via a
//! [`RunnerFactory`] (keyed on the node's kind) and either executes it or,
//! when an upstream failure was recorded, asks it to produce a skipped
//! result instead. Tests provide their own factory that doesn't spawn real
//! processes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::graph::NodeInfo;
use crate::run::result::NodeResult;

/// Future type returned by runner implementations.
pub type RunnerFuture = Pin<Box<dyn Future<Output = NodeResult> + Send>>;

/// Per-dispatch bookkeeping handed to a runner.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// 1-based dispatch index among non-ephemeral nodes; 0 for ephemeral
    /// nodes.
    pub index: usize,
    /// Total number of non-ephemeral nodes in the run; 0 for ephemeral
    /// nodes.
    pub total: usize,
}

/// Executes the work of a single node.
pub trait NodeRunner: Send {
    /// Execute the node's work and produce its result.
    ///
    /// Failures are captured in the returned [`NodeResult`]; this never
    /// panics across the worker boundary.
    fn execute(self: Box<Self>) -> RunnerFuture;

    /// Produce a skipped result instead of executing, carrying the upstream
    /// cause when one is known.
    fn skip(self: Box<Self>, cause: Option<Arc<NodeResult>>) -> NodeResult;
}

/// Builds a [`NodeRunner`] for each dispatched node.
pub trait RunnerFactory: Send + Sync {
    fn runner_for(&self, node: &NodeInfo, ctx: RunContext) -> Box<dyn NodeRunner>;
}
