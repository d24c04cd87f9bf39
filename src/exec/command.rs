// src/exec/command.rs

//! Process-command implementations of the runner and backend seams.
//!
//! Each node's `cmd` is executed via the platform shell with
//! `tokio::process::Command`. The backend keeps a cancel channel per
//! in-flight process so the cancellation controller can stop them, and
//! provisions namespaces as directories under the workspace root.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::exec::backend::{BackendFuture, ExecutionBackend};
use crate::exec::runner::{NodeRunner, RunContext, RunnerFactory, RunnerFuture};
use crate::graph::NodeInfo;
use crate::run::result::{NodeResult, NodeStatus};
use crate::types::NodeKind;

/// Backend that runs node commands as local child processes.
pub struct CommandBackend {
    root: PathBuf,
    /// Cancel channels for in-flight node processes, keyed by node id.
    sessions: Mutex<HashMap<String, oneshot::Sender<()>>>,
}

impl CommandBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<()>>> {
        self.sessions.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn open_session(&self, node_id: &str) -> oneshot::Receiver<()> {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.lock_sessions().insert(node_id.to_string(), cancel_tx);
        cancel_rx
    }

    fn close_session(&self, node_id: &str) {
        self.lock_sessions().remove(node_id);
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }
}

impl ExecutionBackend for CommandBackend {
    fn is_cancelable(&self) -> bool {
        true
    }

    fn cancel_open_sessions(&self) -> Vec<String> {
        let mut sessions = self.lock_sessions();
        let mut cancelled: Vec<String> = Vec::new();
        for (id, cancel) in sessions.drain() {
            // A send error just means the process already finished.
            let _ = cancel.send(());
            cancelled.push(id);
        }
        cancelled.sort();
        cancelled
    }

    fn list_namespaces<'a>(&'a self, container: &'a str) -> BackendFuture<'a, Vec<String>> {
        let dir = self.container_dir(container);
        Box::pin(async move {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // A container that does not exist yet has no namespaces.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(Vec::new());
                }
                Err(err) => return Err(err.into()),
            };

            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(names)
        })
    }

    fn create_namespace<'a>(
        &'a self,
        container: &'a str,
        namespace: &'a str,
    ) -> BackendFuture<'a, ()> {
        let dir = self.container_dir(container).join(namespace);
        Box::pin(async move {
            tokio::fs::create_dir_all(&dir).await?;
            Ok(())
        })
    }
}

/// Builds a process runner for each dispatched node.
///
/// The node's kind picks how a nonzero exit is classified: `command` nodes
/// error (and skip their dependents), `check` nodes fail recoverably.
pub struct CommandRunnerFactory {
    backend: Arc<CommandBackend>,
}

impl CommandRunnerFactory {
    pub fn new(backend: Arc<CommandBackend>) -> Self {
        Self { backend }
    }
}

impl RunnerFactory for CommandRunnerFactory {
    fn runner_for(&self, node: &NodeInfo, ctx: RunContext) -> Box<dyn NodeRunner> {
        Box::new(ProcessRunner {
            node_id: node.id.clone(),
            cmd: node.cmd.clone(),
            kind: node.kind,
            ctx,
            backend: Arc::clone(&self.backend),
        })
    }
}

/// Executes one node's shell command.
struct ProcessRunner {
    node_id: String,
    cmd: String,
    kind: NodeKind,
    ctx: RunContext,
    backend: Arc<CommandBackend>,
}

enum CommandEnd {
    Exited(std::process::ExitStatus),
    Cancelled,
}

impl NodeRunner for ProcessRunner {
    fn execute(self: Box<Self>) -> RunnerFuture {
        Box::pin(async move {
            let started = Instant::now();
            info!(
                node = %self.node_id,
                index = self.ctx.index,
                total = self.ctx.total,
                cmd = %self.cmd,
                "starting node command"
            );

            let cancel_rx = self.backend.open_session(&self.node_id);
            let end = run_command(&self.node_id, &self.cmd, cancel_rx).await;
            self.backend.close_session(&self.node_id);

            let status = match end {
                Ok(CommandEnd::Exited(exit)) if exit.success() => NodeStatus::Success,
                Ok(CommandEnd::Exited(exit)) => {
                    let code = exit.code().unwrap_or(-1);
                    match self.kind {
                        NodeKind::Check => {
                            NodeStatus::Fail(format!("check exited with status {code}"))
                        }
                        NodeKind::Command => {
                            NodeStatus::Error(format!("command exited with status {code}"))
                        }
                    }
                }
                Ok(CommandEnd::Cancelled) => NodeStatus::Error("cancelled".to_string()),
                Err(err) => NodeStatus::Error(format!("{err:#}")),
            };

            NodeResult {
                node_id: self.node_id,
                status,
                execution_time: started.elapsed(),
            }
        })
    }

    fn skip(self: Box<Self>, cause: Option<Arc<NodeResult>>) -> NodeResult {
        debug!(node = %self.node_id, "skipping node command due to upstream failure");
        NodeResult {
            node_id: self.node_id,
            status: NodeStatus::Skipped { cause },
            execution_time: Duration::ZERO,
        }
    }
}

async fn run_command(
    node_id: &str,
    cmd: &str,
    mut cancel_rx: oneshot::Receiver<()>,
) -> anyhow::Result<CommandEnd> {
    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for node '{node_id}'"))?;

    // Always consume output so buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        spawn_line_logger(node_id.to_string(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_logger(node_id.to_string(), "stderr", stderr);
    }

    // Either the process exits on its own (normal case), or the backend asks
    // us to stop as part of run cancellation.
    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of node '{node_id}'"))?;
            debug!(
                node = %node_id,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "node process exited"
            );
            Ok(CommandEnd::Exited(status))
        }
        _ = &mut cancel_rx => {
            info!(node = %node_id, "cancellation requested; killing node process");
            let _ = child.kill().await;
            Ok(CommandEnd::Cancelled)
        }
    }
}

fn spawn_line_logger<R>(node_id: String, stream: &'static str, reader: R)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(node = %node_id, stream, "{}", line);
        }
    });
}
