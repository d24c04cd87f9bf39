// src/run/provision.rs

//! Concurrent namespace provisioning ahead of the dispatch loop.
//!
//! Nodes assume their target namespaces exist by the time they run, so this
//! runs to completion before any node is dispatched. Two strictly ordered
//! phases: list what already exists (one listing per distinct container),
//! then create whatever is missing, at most once per (container, name) pair.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::errors::{DagrunError, Result};
use crate::exec::backend::ExecutionBackend;
use crate::graph::{NodeGraph, NodeId};

/// Ensure every namespace required by the selected nodes exists.
///
/// Existence is compared case-insensitively; the first creation error
/// encountered is propagated.
pub async fn ensure_namespaces(
    backend: &Arc<dyn ExecutionBackend>,
    graph: &NodeGraph,
    selected: &BTreeSet<NodeId>,
    threads: usize,
) -> Result<()> {
    // Required (container, name) pairs, deduplicated across nodes.
    let mut required: BTreeSet<(String, String)> = BTreeSet::new();
    for id in selected {
        let Some(node) = graph.node(id) else { continue };
        if node.ephemeral {
            continue;
        }
        if let Some(ns) = &node.namespace {
            required.insert((ns.container.clone(), ns.name.clone()));
        }
    }
    if required.is_empty() {
        return Ok(());
    }

    let containers: BTreeSet<&str> = required.iter().map(|(c, _)| c.as_str()).collect();
    let limit = Arc::new(Semaphore::new(threads.max(1)));

    // Phase 1: list what already exists, one listing per container.
    let mut existing: HashSet<(String, String)> = HashSet::new();
    let mut listings = FuturesUnordered::new();
    for container in containers {
        let backend = Arc::clone(backend);
        let limit = Arc::clone(&limit);
        let container = container.to_string();
        listings.push(async move {
            let _permit = limit
                .acquire_owned()
                .await
                .map_err(|_| DagrunError::Internal("worker limit closed".to_string()))?;
            let names = backend.list_namespaces(&container).await?;
            Ok::<_, DagrunError>((container, names))
        });
    }
    while let Some(listed) = listings.next().await {
        let (container, names) = listed?;
        debug!(container = %container, count = names.len(), "listed existing namespaces");
        for name in names {
            existing.insert((container.to_lowercase(), name.to_lowercase()));
        }
    }

    // Phase 2: create whatever is missing, once per pair.
    let mut creations = FuturesUnordered::new();
    for (container, name) in &required {
        let key = (container.to_lowercase(), name.to_lowercase());
        if existing.contains(&key) {
            continue;
        }
        existing.insert(key);

        info!(container = %container, namespace = %name, "creating missing namespace");
        let backend = Arc::clone(backend);
        let limit = Arc::clone(&limit);
        let (container, name) = (container.clone(), name.clone());
        creations.push(async move {
            let _permit = limit
                .acquire_owned()
                .await
                .map_err(|_| DagrunError::Internal("worker limit closed".to_string()))?;
            backend.create_namespace(&container, &name).await
        });
    }
    while let Some(created) = creations.next().await {
        created?;
    }

    Ok(())
}
