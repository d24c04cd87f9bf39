// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Programming-contract violation. Unreachable in correct use.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Fail-fast abort staged by a completion callback.
    #[error("aborting run early: node '{node_id}' finished with {message}")]
    FailFast { node_id: String, message: String },

    /// First-error abort for runs configured to raise on any node error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("run interrupted")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DagrunError>;
