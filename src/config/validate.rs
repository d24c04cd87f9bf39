// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DagrunError, Result};
use crate::types::Namespace;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DagrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.run, raw.node))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_run_section(cfg)?;
    validate_node_dependencies(cfg)?;
    validate_namespaces(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(DagrunError::ConfigError(
            "config must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.threads == 0 {
        return Err(DagrunError::ConfigError(
            "[run].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_node_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, node) in cfg.node.iter() {
        for dep in node.after.iter() {
            if !cfg.node.contains_key(dep) {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_namespaces(cfg: &RawConfigFile) -> Result<()> {
    for (name, node) in cfg.node.iter() {
        if let Some(ns) = &node.namespace {
            Namespace::parse(ns).map_err(|err| {
                DagrunError::ConfigError(format!("node '{}': {}", name, err))
            })?;
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Build a simple petgraph graph from the nodes and their dependencies.
    //
    // Edge direction: dep -> node
    // For:
    //   [node.b]
    //   after = ["a"]
    // we add edge a -> b.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.node.keys() {
        graph.add_node(name.as_str());
    }

    for (name, node) in cfg.node.iter() {
        for dep in node.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(DagrunError::DagCycle(format!(
                "cycle detected in node DAG involving node '{}'",
                node
            )))
        }
    }
}
