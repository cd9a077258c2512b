//! Background poll loop

use perfops_common::{TestId, TestRunner};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::accumulator::ResultSlot;

/// Default delay between two fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Handle to a running poll loop.
///
/// The loop fetches a fresh snapshot every interval and stores it in the
/// shared [`ResultSlot`]. It ends on the first fetch error or when
/// cancelled; dropping the handle cancels it.
pub struct Poller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn(
        runner: Arc<dyn TestRunner>,
        id: TestId,
        interval: Duration,
        slot: Arc<ResultSlot>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            poll_loop(runner, id, interval, slot, token).await;
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("poll task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    runner: Arc<dyn TestRunner>,
    id: TestId,
    interval: Duration,
    slot: Arc<ResultSlot>,
    cancel: CancellationToken,
) {
    let mut polls = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = runner.fetch(&id) => result,
        };
        polls += 1;

        match &result {
            Ok(output) => debug!(
                test_id = %id,
                poll = polls,
                items = output.items.len(),
                finished = output.is_finished(),
                "fetched snapshot"
            ),
            Err(e) => warn!(test_id = %id, poll = polls, "fetch failed: {}", e),
        }

        let failed = result.is_err();
        slot.set_output(result);
        if failed {
            break;
        }
    }
    debug!(test_id = %id, polls, "poller exited");
}
