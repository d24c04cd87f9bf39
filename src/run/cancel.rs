// src/run/cancel.rs

//! Best-effort cancellation of in-flight work after a fatal condition.
//!
//! Cancellation is cooperative, not preemptive: it stops new dispatch,
//! requests termination of the backend side of in-flight operations, and
//! drains the worker tasks. The triggering error is re-raised by the caller
//! afterwards; cancellation itself never replaces it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::backend::ExecutionBackend;

/// Ask the backend to stop all open sessions and wait for every worker task
/// to exit.
///
/// How quickly the workers actually come back is bounded by the backend's
/// cancellation primitive; a backend without one only gets a warning and the
/// workers run to completion.
pub(crate) async fn cancel_in_flight(
    backend: &Arc<dyn ExecutionBackend>,
    handles: &mut Vec<JoinHandle<()>>,
) {
    if backend.is_cancelable() {
        for session in backend.cancel_open_sessions() {
            info!(session = %session, "cancelled open session");
        }
    } else {
        warn!("execution backend does not support cancellation; some work may still be running");
    }

    for handle in handles.drain(..) {
        if let Err(err) = handle.await {
            debug!(error = %err, "worker exited abnormally during cancellation");
        }
    }
}
