// src/config/mod.rs

//! TOML configuration: raw model, loading, and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, NodeConfig, RawConfigFile, RunSection};
