// src/graph/queue.rs

//! Dependency-respecting ready queue over a fixed selected node set.
//!
//! The queue tracks, for every selected node, how many of its selected
//! dependencies are still outstanding, and releases a node the instant that
//! count reaches zero. All mutations to dependency state happen under one
//! internal lock; wakeups for `get` / `join` /
//! `wait_until_something_was_done` are signalled by `mark_done`. This is the
//! engine's sole synchronization point for dependency state.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::errors::{DagrunError, Result};
use crate::graph::{NodeGraph, NodeId};

#[derive(Debug)]
struct QueueState {
    /// Nodes waiting on at least one selected dependency, with the number of
    /// selected dependencies still outstanding.
    blocked: BTreeMap<NodeId, usize>,
    /// Nodes whose dependencies are all satisfied, in release order.
    ready: VecDeque<NodeId>,
    /// Nodes handed out by `get` and not yet marked done.
    in_progress: HashSet<NodeId>,
    /// Completions observed so far.
    completed: usize,
    /// Completions already reported through `wait_until_something_was_done`.
    observed: usize,
    aborted: bool,
}

/// Thread-safe ready queue for one run.
#[derive(Debug)]
pub struct GraphQueue {
    /// Direct dependents within the selected set, fixed at construction.
    dependents: HashMap<NodeId, Vec<NodeId>>,
    total: usize,
    state: Mutex<QueueState>,
    done: Notify,
}

impl GraphQueue {
    /// Build a queue from the full graph and the selected node-id set.
    ///
    /// Only dependencies that are themselves selected count toward a node's
    /// outstanding total; anything outside the selection is treated as
    /// already satisfied.
    pub fn new(graph: &NodeGraph, selected: &BTreeSet<NodeId>) -> Result<Self> {
        let mut blocked = BTreeMap::new();
        let mut ready = VecDeque::new();
        let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for id in selected {
            let node = graph.node(id).ok_or_else(|| {
                DagrunError::Internal(format!("selected node '{id}' is not in the graph"))
            })?;

            let outstanding = node
                .deps
                .iter()
                .filter(|dep| selected.contains(*dep))
                .count();

            if outstanding == 0 {
                ready.push_back(id.clone());
            } else {
                blocked.insert(id.clone(), outstanding);
            }

            for dep in node.deps.iter() {
                if selected.contains(dep) {
                    dependents.entry(dep.clone()).or_default().push(id.clone());
                }
            }
        }

        Ok(Self {
            dependents,
            total: selected.len(),
            state: Mutex::new(QueueState {
                blocked,
                ready,
                in_progress: HashSet::new(),
                completed: 0,
                observed: 0,
                aborted: false,
            }),
            done: Notify::new(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Take the next ready node, waiting until one becomes available.
    ///
    /// Returns `None` once no nodes remain to be dispatched (everything
    /// still incomplete is already in flight), or after [`abort`].
    ///
    /// [`abort`]: GraphQueue::abort
    pub async fn get(&self) -> Option<NodeId> {
        loop {
            let wakeup = self.done.notified();
            {
                let mut state = self.lock_state();
                if state.aborted {
                    return None;
                }
                if let Some(id) = state.ready.pop_front() {
                    state.in_progress.insert(id.clone());
                    debug!(node = %id, "handing out ready node");
                    return Some(id);
                }
                if state.blocked.is_empty() {
                    return None;
                }
            }
            wakeup.await;
        }
    }

    /// True iff no nodes remain to be dispatched.
    pub fn empty(&self) -> bool {
        let state = self.lock_state();
        state.aborted || (state.ready.is_empty() && state.blocked.is_empty())
    }

    /// Record a node's completion and release any dependents whose last
    /// outstanding dependency this was.
    ///
    /// Must be called exactly once per node handed out by `get`; a duplicate
    /// call is ignored with a warning.
    pub fn mark_done(&self, node_id: &str) {
        {
            let mut state = self.lock_state();
            if !state.in_progress.remove(node_id) {
                warn!(node = %node_id, "mark_done for a node that was not in progress; ignoring");
                return;
            }
            state.completed += 1;

            if let Some(dependents) = self.dependents.get(node_id) {
                for dependent in dependents {
                    if let Some(outstanding) = state.blocked.get_mut(dependent) {
                        *outstanding -= 1;
                        if *outstanding == 0 {
                            state.blocked.remove(dependent);
                            state.ready.push_back(dependent.clone());
                            debug!(node = %dependent, "dependencies satisfied; node is ready");
                        }
                    }
                }
            }
        }
        self.done.notify_waiters();
    }

    /// Wait until every selected node has been marked done (or the queue was
    /// aborted).
    pub async fn join(&self) {
        loop {
            let wakeup = self.done.notified();
            {
                let state = self.lock_state();
                if state.completed == self.total || state.aborted {
                    return;
                }
            }
            wakeup.await;
        }
    }

    /// Wait until at least one completion has occurred since the previous
    /// call.
    ///
    /// Returns `false` once the queue is fully drained or aborted, so the
    /// caller can use it as an incremental drain loop:
    ///
    /// ```ignore
    /// while queue.wait_until_something_was_done().await {
    ///     // inspect staged errors between completions
    /// }
    /// ```
    pub async fn wait_until_something_was_done(&self) -> bool {
        loop {
            let wakeup = self.done.notified();
            {
                let mut state = self.lock_state();
                if state.aborted {
                    return false;
                }
                if state.completed > state.observed {
                    state.observed = state.completed;
                    return state.completed < self.total;
                }
                if state.completed == self.total {
                    return false;
                }
            }
            wakeup.await;
        }
    }

    /// Stop handing out nodes and wake every blocked waiter.
    ///
    /// Used on external interrupt and by the cancellation controller.
    pub fn abort(&self) {
        {
            self.lock_state().aborted = true;
        }
        self.done.notify_waiters();
    }

    /// Number of nodes currently ready to be handed out.
    pub fn ready_len(&self) -> usize {
        self.lock_state().ready.len()
    }

    /// Number of completions recorded so far.
    pub fn completed(&self) -> usize {
        self.lock_state().completed
    }

    /// Number of selected nodes this queue was built over.
    pub fn total(&self) -> usize {
        self.total
    }
}
