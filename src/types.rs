use std::fmt;

use serde::Deserialize;

use crate::errors::{DagrunError, Result};

/// How a node's outcome is classified when its work does not succeed.
///
/// - `Command`: a failed execution is an unrecoverable error; transitive
///   dependents are skipped.
/// - `Check`: a nonzero exit is a recoverable validation failure; it is
///   reported but does not skip dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Command,
    Check,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Command
    }
}

/// Target namespace a node materializes into, written as
/// `"container.name"` in config.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Namespace {
    pub container: String,
    pub name: String,
}

impl Namespace {
    /// Parse the `"container.name"` form. Exactly one dot, both parts
    /// non-empty.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once('.') {
            Some((container, name))
                if !container.is_empty() && !name.is_empty() && !name.contains('.') =>
            {
                Ok(Self {
                    container: container.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(DagrunError::ConfigError(format!(
                "invalid namespace '{value}' (expected \"container.name\")"
            ))),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container, self.name)
    }
}
