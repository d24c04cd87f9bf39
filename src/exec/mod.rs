// src/exec/mod.rs

//! Execution layer.
//!
//! - [`runner`] defines the seam through which the driver hands work to
//!   per-node runners.
//! - [`backend`] defines the capability seam for cancellation and namespace
//!   provisioning.
//! - [`command`] provides the production implementations of both, built on
//!   `tokio::process::Command` and the local filesystem.

pub mod backend;
pub mod command;
pub mod runner;

pub use backend::{BackendFuture, ExecutionBackend};
pub use command::{CommandBackend, CommandRunnerFactory};
pub use runner::{NodeRunner, RunContext, RunnerFactory, RunnerFuture};
