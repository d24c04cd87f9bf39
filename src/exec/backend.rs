// src/exec/backend.rs

//! Execution backend capability seam.
//!
//! The engine talks to an `ExecutionBackend` for the two concerns that
//! outlive a single node: cooperative cancellation of in-flight sessions and
//! namespace provisioning ahead of a run. Production code uses
//! [`CommandBackend`]; tests can provide their own implementation.
//!
//! [`CommandBackend`]: crate::exec::command::CommandBackend

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

/// Future type returned by backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub trait ExecutionBackend: Send + Sync {
    /// Whether in-flight work can be cooperatively cancelled.
    fn is_cancelable(&self) -> bool;

    /// Request cancellation of all open sessions, returning the ids of the
    /// sessions that were asked to stop.
    ///
    /// Only called by the cancellation controller, and only when
    /// [`is_cancelable`] returned true.
    ///
    /// [`is_cancelable`]: ExecutionBackend::is_cancelable
    fn cancel_open_sessions(&self) -> Vec<String>;

    /// List the namespaces that already exist under `container`.
    fn list_namespaces<'a>(&'a self, container: &'a str) -> BackendFuture<'a, Vec<String>>;

    /// Create `namespace` under `container`.
    fn create_namespace<'a>(
        &'a self,
        container: &'a str,
        namespace: &'a str,
    ) -> BackendFuture<'a, ()>;
}
