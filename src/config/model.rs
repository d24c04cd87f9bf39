// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::NodeKind;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [run]
/// threads = 4
/// fail_fast = true
///
/// [node.extract]
/// cmd = "python extract.py"
///
/// [node.stage]
/// cmd = "python stage.py"
/// after = ["extract"]
/// namespace = "warehouse.staging"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Run-level behaviour from `[run]`.
    #[serde(default)]
    pub run: RunSection,

    /// All nodes from `[node.<name>]`.
    ///
    /// Keys are the *node ids* (e.g. `"extract"`, `"stage"`).
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// A configuration that has passed validation (`ConfigFile::try_from`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run: RunSection,
    pub node: BTreeMap<String, NodeConfig>,
}

impl ConfigFile {
    /// Construct without re-running validation. Only `config::validate`
    /// should call this.
    pub(crate) fn new_unchecked(run: RunSection, node: BTreeMap<String, NodeConfig>) -> Self {
        Self { run, node }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Worker pool size.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Abort the run on the first node error or failed check.
    #[serde(default)]
    pub fail_fast: bool,

    /// Execute nodes inline on the driver task (for profiling).
    #[serde(default)]
    pub single_threaded: bool,

    /// Abort the run on the first node error, without fail-fast reporting.
    #[serde(default)]
    pub raise_on_first_error: bool,

    /// Root directory that namespaces are provisioned under.
    #[serde(default = "default_workspace")]
    pub workspace: String,
}

fn default_threads() -> usize {
    4
}

fn default_workspace() -> String {
    ".".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            fail_fast: false,
            single_threaded: false,
            raise_on_first_error: false,
            workspace: default_workspace(),
        }
    }
}

/// `[node.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// The command to execute.
    pub cmd: String,

    /// How a nonzero exit is classified (`"command"` or `"check"`).
    #[serde(default)]
    pub kind: NodeKind,

    /// Dependency list: this node waits for all nodes listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Ephemeral nodes participate in dependency ordering and are executed,
    /// but are excluded from progress counters and the visible result list.
    #[serde(default)]
    pub ephemeral: bool,

    /// Namespace this node materializes into, as `"container.name"`.
    ///
    /// Required namespaces are provisioned before the run starts.
    #[serde(default)]
    pub namespace: Option<String>,
}
