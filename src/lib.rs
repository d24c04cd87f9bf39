// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod run;
pub mod types;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::{DagrunError, Result};
use crate::exec::command::{CommandBackend, CommandRunnerFactory};
use crate::graph::{NodeGraph, NodeId};
use crate::run::driver::{RunDriver, RunOptions};
use crate::run::result::RunOutcome;
use crate::run::sink::TracingSink;
use crate::types::NodeKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - graph construction and node selection
/// - the run driver with the process-command backend
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<RunOutcome> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(RunOutcome::empty());
    }

    let graph = Arc::new(NodeGraph::from_config(&cfg));
    let selected = select_nodes(&graph, &args.select)?;

    if selected.is_empty() {
        warn!("nothing to do; check the node definitions and --select arguments");
        return Ok(RunOutcome::empty());
    }

    let options = RunOptions {
        threads: args.threads.unwrap_or(cfg.run.threads),
        single_threaded: args.single_threaded || cfg.run.single_threaded,
        fail_fast: args.fail_fast || cfg.run.fail_fast,
        raise_on_first_error: cfg.run.raise_on_first_error,
    };

    let backend = Arc::new(CommandBackend::new(&cfg.run.workspace));
    let factory = Arc::new(CommandRunnerFactory::new(Arc::clone(&backend)));

    let mut driver = RunDriver::new(
        Arc::clone(&graph),
        selected,
        options,
        factory,
        backend,
        Arc::new(TracingSink),
    );
    driver.initialize()?;

    // Ctrl-C → staged interrupt, consumed by the driver at its next check.
    let abort = driver.abort_handle()?;
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            return;
        }
        abort.interrupt();
    });

    let outcome = driver.execute().await?;
    log_summary(&outcome);
    Ok(outcome)
}

/// Resolve `--select` names against the graph; defaults to every node.
fn select_nodes(graph: &NodeGraph, select: &[String]) -> Result<BTreeSet<NodeId>> {
    if select.is_empty() {
        return Ok(graph.ids().map(str::to_string).collect());
    }

    let mut selected = BTreeSet::new();
    for name in select {
        if graph.node(name).is_none() {
            return Err(DagrunError::ConfigError(format!(
                "--select names unknown node '{name}'"
            )));
        }
        selected.insert(name.clone());
    }
    Ok(selected)
}

fn log_summary(outcome: &RunOutcome) {
    let counts = outcome.counts();
    info!(
        success = counts.success,
        errors = counts.errors,
        fails = counts.fails,
        skipped = counts.skipped,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "run finished"
    );
    if !outcome.success() {
        warn!("run completed with errors or failed checks");
    }
}

/// Simple dry-run output: print nodes, deps and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("dagrun dry-run");
    println!("  run.threads = {}", cfg.run.threads);
    println!("  run.fail_fast = {}", cfg.run.fail_fast);
    println!("  run.workspace = {}", cfg.run.workspace);
    println!();

    println!("nodes ({}):", cfg.node.len());
    for (name, node) in cfg.node.iter() {
        println!("  - {name}");
        println!("      cmd: {}", node.cmd);
        if node.kind == NodeKind::Check {
            println!("      kind: check");
        }
        if !node.after.is_empty() {
            println!("      after: {:?}", node.after);
        }
        if node.ephemeral {
            println!("      ephemeral: true");
        }
        if let Some(ref ns) = node.namespace {
            println!("      namespace: {ns}");
        }
    }
}
