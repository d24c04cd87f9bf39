// src/run/mod.rs

//! Run engine.
//!
//! - [`driver`] owns the dispatch loop and the worker pool.
//! - [`result`] defines per-node results and the aggregate outcome.
//! - [`skip`] records skip causes for dependents of failed nodes.
//! - [`fatal`] stages worker-detected fatal errors for the driver.
//! - [`cancel`] implements the best-effort cancellation protocol.
//! - [`provision`] creates required namespaces before the dispatch loop.
//! - [`sink`] is the progress/telemetry seam.

pub(crate) mod cancel;
pub mod driver;
pub mod fatal;
pub mod provision;
pub mod result;
pub mod sink;
pub(crate) mod skip;

pub use driver::{RunDriver, RunOptions};
pub use fatal::AbortHandle;
pub use provision::ensure_namespaces;
pub use result::{NodeResult, NodeStatus, RunOutcome, StatusCounts};
pub use sink::{ProgressSink, TracingSink};
