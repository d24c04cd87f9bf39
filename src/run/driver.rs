// src/run/driver.rs

//! Graph-driven execution driver.
//!
//! The driver owns the worker pool for one run: it pulls ready nodes from
//! the [`GraphQueue`], hands them to runners, and processes completions.
//! Completion callbacks run on whichever worker finished (inline in
//! single-threaded mode) and are serialized behind one lock; they are the
//! only writers of the result sequence and the skip-cause map.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{DagrunError, Result};
use crate::exec::backend::ExecutionBackend;
use crate::exec::runner::{RunContext, RunnerFactory, RunnerFuture};
use crate::graph::{GraphQueue, NodeGraph, NodeId, NodeInfo};
use crate::run::cancel::cancel_in_flight;
use crate::run::fatal::{AbortHandle, FatalCell};
use crate::run::provision::ensure_namespaces;
use crate::run::result::{NodeResult, RunOutcome};
use crate::run::sink::ProgressSink;
use crate::run::skip::SkipCauses;

/// Execution policy for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Worker pool size.
    pub threads: usize,
    /// Execute nodes inline on the driver task instead of the pool.
    pub single_threaded: bool,
    /// Abort the whole run on the first error or failed check.
    pub fail_fast: bool,
    /// Abort the whole run on the first error, without fail-fast reporting.
    pub raise_on_first_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            single_threaded: false,
            fail_fast: false,
            raise_on_first_error: false,
        }
    }
}

#[derive(Default)]
struct CompletionState {
    results: Vec<NodeResult>,
    skip: SkipCauses,
}

/// Completion-side state shared between the driver and its workers.
struct Completions {
    graph: Arc<NodeGraph>,
    queue: Arc<GraphQueue>,
    sink: Arc<dyn ProgressSink>,
    options: RunOptions,
    state: Mutex<CompletionState>,
    fatal: Arc<FatalCell>,
    /// Set by the cancellation path; workers that have not started yet check
    /// it after acquiring their permit and bail out without running.
    discard_pending: AtomicBool,
}

impl Completions {
    fn lock_state(&self) -> MutexGuard<'_, CompletionState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Completion callback, invoked exactly once per dispatched node.
    ///
    /// `mark_done` must happen here, on the completion path, or the run
    /// would deadlock when an upstream failure skips the rest of a branch.
    fn complete(&self, result: NodeResult, ctx: RunContext) {
        let ephemeral = self
            .graph
            .node(&result.node_id)
            .map(|n| n.ephemeral)
            .unwrap_or(false);

        {
            let mut state = self.lock_state();
            if !ephemeral {
                state.results.push(result.clone());
            }

            if result.status.is_error() {
                // An ephemeral result never reaches the visible result list,
                // so its error detail travels downstream as the skip cause.
                // Non-ephemeral failures are already reported through their
                // own result.
                let cause = if ephemeral {
                    Some(Arc::new(result.clone()))
                } else {
                    None
                };
                state
                    .skip
                    .record_dependents(&self.graph, &result.node_id, cause);
            }
        }

        self.sink.node_finished(&result, ctx.index, ctx.total);
        self.queue.mark_done(&result.node_id);

        if self.options.fail_fast && (result.status.is_error() || result.status.is_fail()) {
            self.fatal.set(DagrunError::FailFast {
                node_id: result.node_id.clone(),
                message: result.status.to_string(),
            });
        } else if self.options.raise_on_first_error
            && let Some(message) = result.error_message()
        {
            self.fatal.set(DagrunError::Runtime(message.to_string()));
        }
    }

    fn take_skip_cause(&self, node_id: &str) -> Option<Option<Arc<NodeResult>>> {
        self.lock_state().skip.take(node_id)
    }

    fn take_results(&self) -> Vec<NodeResult> {
        std::mem::take(&mut self.lock_state().results)
    }
}

/// Executes one selected node set over a graph.
pub struct RunDriver {
    graph: Arc<NodeGraph>,
    selected: BTreeSet<NodeId>,
    options: RunOptions,
    factory: Arc<dyn RunnerFactory>,
    backend: Arc<dyn ExecutionBackend>,
    sink: Arc<dyn ProgressSink>,
    fatal: Arc<FatalCell>,
    queue: Option<Arc<GraphQueue>>,
    completions: Option<Arc<Completions>>,
    /// Dispatch counter for non-ephemeral nodes (1-based).
    run_count: usize,
    /// Non-ephemeral nodes in the selected set.
    num_nodes: usize,
}

impl RunDriver {
    pub fn new(
        graph: Arc<NodeGraph>,
        selected: BTreeSet<NodeId>,
        options: RunOptions,
        factory: Arc<dyn RunnerFactory>,
        backend: Arc<dyn ExecutionBackend>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            graph,
            selected,
            options,
            factory,
            backend,
            sink,
            fatal: Arc::new(FatalCell::new()),
            queue: None,
            completions: None,
            run_count: 0,
            num_nodes: 0,
        }
    }

    /// Build the graph queue and progress totals for this run.
    pub fn initialize(&mut self) -> Result<()> {
        let queue = Arc::new(GraphQueue::new(&self.graph, &self.selected)?);

        self.num_nodes = self
            .selected
            .iter()
            .filter(|id| self.graph.node(id).map(|n| !n.ephemeral).unwrap_or(false))
            .count();

        self.completions = Some(Arc::new(Completions {
            graph: Arc::clone(&self.graph),
            queue: Arc::clone(&queue),
            sink: Arc::clone(&self.sink),
            options: self.options,
            state: Mutex::new(CompletionState::default()),
            fatal: Arc::clone(&self.fatal),
            discard_pending: AtomicBool::new(false),
        }));
        self.queue = Some(queue);
        Ok(())
    }

    /// Handle for staging an interrupt from outside the driver.
    pub fn abort_handle(&self) -> Result<AbortHandle> {
        let queue = self.queue.clone().ok_or_else(|| {
            DagrunError::Internal("abort_handle requested before the run was initialized".into())
        })?;
        Ok(AbortHandle::new(Arc::clone(&self.fatal), queue))
    }

    /// Provision namespaces, run the dispatch loop to completion, and return
    /// the accumulated results.
    ///
    /// On a fatal condition (fail-fast, first-error policy, or interrupt),
    /// the cancellation protocol runs and the triggering error is re-raised.
    pub async fn execute(mut self) -> Result<RunOutcome> {
        let queue = self.queue.clone().ok_or_else(|| {
            DagrunError::Internal("execute called before the run was initialized".into())
        })?;
        let completions = self.completions.clone().ok_or_else(|| {
            DagrunError::Internal("execute called before the run was initialized".into())
        })?;

        let started = Instant::now();

        ensure_namespaces(&self.backend, &self.graph, &self.selected, self.options.threads)
            .await?;

        let threads = if self.options.single_threaded {
            1
        } else {
            self.options.threads
        };
        self.sink.run_started(threads, self.num_nodes);

        let limit = Arc::new(Semaphore::new(self.options.threads.max(1)));
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        match self.run_queue(&queue, &completions, &limit, &mut handles).await {
            Ok(()) => {
                for handle in handles.drain(..) {
                    if let Err(err) = handle.await {
                        warn!(error = %err, "worker exited abnormally");
                    }
                }
                Ok(RunOutcome {
                    results: completions.take_results(),
                    elapsed: started.elapsed(),
                })
            }
            Err(err) => {
                completions.discard_pending.store(true, Ordering::SeqCst);
                queue.abort();
                cancel_in_flight(&self.backend, &mut handles).await;
                Err(err)
            }
        }
    }

    async fn run_queue(
        &mut self,
        queue: &Arc<GraphQueue>,
        completions: &Arc<Completions>,
        limit: &Arc<Semaphore>,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> Result<()> {
        loop {
            self.raise_pending()?;

            let Some(node_id) = queue.get().await else {
                break;
            };

            let node = self
                .graph
                .node(&node_id)
                .ok_or_else(|| {
                    DagrunError::Internal(format!("node '{node_id}' vanished from the graph"))
                })?
                .clone();

            let ctx = self.next_context(&node);
            let runner = self.factory.runner_for(&node, ctx);

            // We finally know what we're running. Make sure an upstream
            // failure hasn't decided to skip it in the meantime.
            let work: RunnerFuture = match completions.take_skip_cause(&node_id) {
                Some(cause) => {
                    let result = runner.skip(cause);
                    Box::pin(async move { result })
                }
                None => runner.execute(),
            };

            self.submit(node_id, ctx, work, completions, limit, handles)
                .await;
        }

        // Block until outstanding submissions resolve. In fail-fast mode,
        // poll completion ticks so a staged error surfaces without waiting
        // for a full drain.
        if self.options.fail_fast {
            while queue.wait_until_something_was_done().await {
                self.raise_pending()?;
            }
        } else {
            queue.join().await;
        }
        self.raise_pending()?;

        Ok(())
    }

    /// Assign the dispatch index for a node. Ephemeral nodes get index 0 and
    /// do not advance the counter.
    fn next_context(&mut self, node: &NodeInfo) -> RunContext {
        if node.ephemeral {
            RunContext { index: 0, total: 0 }
        } else {
            self.run_count += 1;
            RunContext {
                index: self.run_count,
                total: self.num_nodes,
            }
        }
    }

    /// Hand `work` to the pool, or run it inline in single-threaded mode.
    ///
    /// Both paths go through the same completion callback, so the caller
    /// sees identical behaviour, just without overlap.
    async fn submit(
        &self,
        node_id: NodeId,
        ctx: RunContext,
        work: RunnerFuture,
        completions: &Arc<Completions>,
        limit: &Arc<Semaphore>,
        handles: &mut Vec<JoinHandle<()>>,
    ) {
        if self.options.single_threaded {
            self.sink.node_started(&node_id, ctx.index, ctx.total);
            let result = work.await;
            completions.complete(result, ctx);
            return;
        }

        let completions = Arc::clone(completions);
        let limit = Arc::clone(limit);
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = limit.acquire_owned().await else {
                return;
            };
            if completions.discard_pending.load(Ordering::SeqCst) {
                debug!(node = %node_id, "discarding queued work after cancellation");
                return;
            }
            completions.sink.node_started(&node_id, ctx.index, ctx.total);
            let result = work.await;
            completions.complete(result, ctx);
        }));
    }

    /// Surface an error staged by a completion callback, if any.
    fn raise_pending(&self) -> Result<()> {
        match self.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
