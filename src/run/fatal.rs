// src/run/fatal.rs

//! Single-slot deferred-error cell.
//!
//! An error raised inside a worker task would never reach the driver, so
//! completion callbacks *stage* fatal conditions here instead. The driver
//! consumes the cell between dispatch iterations and at each wake from a
//! blocking wait, on its own task, where raising is visible to the caller.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::errors::DagrunError;
use crate::graph::GraphQueue;

#[derive(Debug, Default)]
pub(crate) struct FatalCell {
    slot: Mutex<Option<DagrunError>>,
}

impl FatalCell {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<DagrunError>> {
        self.slot.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Stage an error. The first staged error wins; later ones are dropped.
    pub fn set(&self, err: DagrunError) {
        let mut slot = self.lock_slot();
        if slot.is_none() {
            *slot = Some(err);
        } else {
            debug!(dropped = %err, "a fatal error is already staged; keeping the first");
        }
    }

    /// Consume the staged error, if any.
    pub fn take(&self) -> Option<DagrunError> {
        self.lock_slot().take()
    }
}

/// Handle for aborting a run from outside the driver (e.g. a Ctrl-C task).
#[derive(Clone, Debug)]
pub struct AbortHandle {
    fatal: Arc<FatalCell>,
    queue: Arc<GraphQueue>,
}

impl AbortHandle {
    pub(crate) fn new(fatal: Arc<FatalCell>, queue: Arc<GraphQueue>) -> Self {
        Self { fatal, queue }
    }

    /// Stage an interrupt and wake the driver out of any blocking wait.
    ///
    /// The driver re-raises the interrupt at its next check point, after
    /// running the cancellation protocol.
    pub fn interrupt(&self) {
        self.fatal.set(DagrunError::Interrupted);
        self.queue.abort();
    }
}
