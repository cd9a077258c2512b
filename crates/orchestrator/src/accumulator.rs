//! Latest poll result, shared between the poller and the render loop

use parking_lot::Mutex;
use perfops_common::{PerfOpsError, PerfOpsResult, RunOutput};
use std::sync::Arc;

#[derive(Default)]
struct Slot {
    output: Option<Arc<RunOutput>>,
    error: Option<PerfOpsError>,
}

/// Single slot holding the newest snapshot and the newest error.
///
/// Last write wins and no history is kept. The lock is held only long
/// enough to swap or clone an `Arc`.
#[derive(Default)]
pub struct ResultSlot {
    inner: Mutex<Slot>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the outcome of one fetch.
    pub fn set_output(&self, result: PerfOpsResult<RunOutput>) {
        let mut slot = self.inner.lock();
        match result {
            Ok(output) => {
                slot.output = Some(Arc::new(output));
                slot.error = None;
            }
            Err(err) => slot.error = Some(err),
        }
    }

    /// Read the newest snapshot and take the pending error, if any.
    ///
    /// An error is handed out exactly once.
    pub fn output(&self) -> (Option<Arc<RunOutput>>, Option<PerfOpsError>) {
        let mut slot = self.inner.lock();
        (slot.output.clone(), slot.error.take())
    }
}
