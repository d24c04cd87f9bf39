use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use dagrun::exec::backend::{BackendFuture, ExecutionBackend};
use dagrun::exec::runner::{NodeRunner, RunContext, RunnerFactory, RunnerFuture};
use dagrun::graph::NodeInfo;
use dagrun::run::result::{NodeResult, NodeStatus};
use dagrun::run::sink::ProgressSink;

/// A runner factory that:
/// - records the order in which runners started executing
/// - returns injected per-node outcomes (default: success)
/// - optionally gates nodes so tests control when they finish.
pub struct FakeRunnerFactory {
    outcomes: Mutex<HashMap<String, NodeStatus>>,
    executed: Arc<Mutex<Vec<String>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeRunnerFactory {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            executed: Arc::new(Mutex::new(Vec::new())),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Inject an outcome for a node (anything not configured succeeds).
    pub fn set_outcome(&self, id: &str, status: NodeStatus) {
        self.outcomes.lock().unwrap().insert(id.to_string(), status);
    }

    /// Make `id` finish with an unrecoverable error.
    pub fn error(&self, id: &str, message: &str) {
        self.set_outcome(id, NodeStatus::Error(message.to_string()));
    }

    /// Make `id` finish with a recoverable check failure.
    pub fn fail_check(&self, id: &str, message: &str) {
        self.set_outcome(id, NodeStatus::Fail(message.to_string()));
    }

    /// Gate a node: its runner will not finish until [`release`] is called.
    ///
    /// [`release`]: FakeRunnerFactory::release
    pub fn gate(&self, id: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(id.to_string(), Arc::new(Notify::new()));
    }

    /// Allow a gated node to finish. Safe to call before the node started;
    /// the permit is kept.
    pub fn release(&self, id: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(id) {
            gate.notify_one();
        }
    }

    /// Node ids in the order their runners started executing.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Poll until `id` has started executing; panics after ~2 seconds.
    pub async fn wait_for_start(&self, id: &str) {
        for _ in 0..200 {
            if self.executed().iter().any(|e| e == id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("node {id} did not start executing");
    }
}

impl Default for FakeRunnerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerFactory for FakeRunnerFactory {
    fn runner_for(&self, node: &NodeInfo, _ctx: RunContext) -> Box<dyn NodeRunner> {
        let status = self
            .outcomes
            .lock()
            .unwrap()
            .get(&node.id)
            .cloned()
            .unwrap_or(NodeStatus::Success);
        let gate = self.gates.lock().unwrap().get(&node.id).cloned();

        Box::new(FakeRunner {
            node_id: node.id.clone(),
            status,
            executed: Arc::clone(&self.executed),
            gate,
        })
    }
}

struct FakeRunner {
    node_id: String,
    status: NodeStatus,
    executed: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl NodeRunner for FakeRunner {
    fn execute(self: Box<Self>) -> RunnerFuture {
        let FakeRunner {
            node_id,
            status,
            executed,
            gate,
        } = *self;

        Box::pin(async move {
            executed.lock().unwrap().push(node_id.clone());
            if let Some(gate) = &gate {
                gate.notified().await;
            }
            NodeResult {
                node_id,
                status,
                execution_time: Duration::ZERO,
            }
        })
    }

    fn skip(self: Box<Self>, cause: Option<Arc<NodeResult>>) -> NodeResult {
        NodeResult {
            node_id: self.node_id,
            status: NodeStatus::Skipped { cause },
            execution_time: Duration::ZERO,
        }
    }
}

/// Backend with canned namespace listings and recorded calls.
pub struct FakeBackend {
    cancelable: bool,
    sessions: Vec<String>,
    existing: HashMap<String, Vec<String>>,
    create_error: Option<String>,
    created: Mutex<Vec<(String, String)>>,
    listed: Mutex<Vec<String>>,
    cancel_calls: Mutex<usize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            cancelable: true,
            sessions: Vec::new(),
            existing: HashMap::new(),
            create_error: None,
            created: Mutex::new(Vec::new()),
            listed: Mutex::new(Vec::new()),
            cancel_calls: Mutex::new(0),
        }
    }

    pub fn not_cancelable(mut self) -> Self {
        self.cancelable = false;
        self
    }

    /// Session ids reported back when the controller cancels.
    pub fn with_sessions(mut self, ids: &[&str]) -> Self {
        self.sessions = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Pretend these namespaces already exist under `container`.
    pub fn with_existing(mut self, container: &str, namespaces: &[&str]) -> Self {
        self.existing.insert(
            container.to_string(),
            namespaces.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Make every `create_namespace` call fail with `message`.
    pub fn fail_creates(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    /// (container, namespace) pairs created, in creation order.
    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }

    /// Containers that were listed.
    pub fn listed(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    /// How many times `cancel_open_sessions` was called.
    pub fn cancel_calls(&self) -> usize {
        *self.cancel_calls.lock().unwrap()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionBackend for FakeBackend {
    fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    fn cancel_open_sessions(&self) -> Vec<String> {
        *self.cancel_calls.lock().unwrap() += 1;
        self.sessions.clone()
    }

    fn list_namespaces<'a>(&'a self, container: &'a str) -> BackendFuture<'a, Vec<String>> {
        self.listed.lock().unwrap().push(container.to_string());
        let names = self.existing.get(container).cloned().unwrap_or_default();
        Box::pin(async move { Ok(names) })
    }

    fn create_namespace<'a>(
        &'a self,
        container: &'a str,
        namespace: &'a str,
    ) -> BackendFuture<'a, ()> {
        let result = match &self.create_error {
            Some(msg) => Err(anyhow::anyhow!("{msg}").into()),
            None => {
                self.created
                    .lock()
                    .unwrap()
                    .push((container.to_string(), namespace.to_string()));
                Ok(())
            }
        };
        Box::pin(async move { result })
    }
}

/// Sink that records every event for assertions.
///
/// Finished events are stored as (node id, status label, index, total).
#[derive(Default)]
pub struct RecordingSink {
    run_started: Mutex<Vec<(usize, usize)>>,
    started: Mutex<Vec<(String, usize, usize)>>,
    finished: Mutex<Vec<(String, String, usize, usize)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_events(&self) -> Vec<(usize, usize)> {
        self.run_started.lock().unwrap().clone()
    }

    pub fn started_events(&self) -> Vec<(String, usize, usize)> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished_events(&self) -> Vec<(String, String, usize, usize)> {
        self.finished.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn run_started(&self, threads: usize, total: usize) {
        self.run_started.lock().unwrap().push((threads, total));
    }

    fn node_started(&self, node_id: &str, index: usize, total: usize) {
        self.started
            .lock()
            .unwrap()
            .push((node_id.to_string(), index, total));
    }

    fn node_finished(&self, result: &NodeResult, index: usize, total: usize) {
        self.finished.lock().unwrap().push((
            result.node_id.clone(),
            result.status.label().to_string(),
            index,
            total,
        ));
    }
}
