//! Test doubles shared by the orchestrator tests

use async_trait::async_trait;
use parking_lot::Mutex;
use perfops_common::{PerfOpsError, PerfOpsResult, RunOutput, TestId, TestRequest, TestRunner};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory writer whose contents stay readable after it is handed out.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runner that replays a scripted sequence of snapshots.
///
/// Each fetch returns the next snapshot; the last one repeats. When
/// `fail_fetch` is set every fetch fails instead.
pub struct FakeRunner {
    pub submit_error: Option<String>,
    pub fail_fetch: Option<String>,
    pub snapshots: Vec<RunOutput>,
    pub fetches: Arc<AtomicUsize>,
}

impl FakeRunner {
    pub fn new(snapshots: Vec<RunOutput>) -> Self {
        Self {
            submit_error: None,
            fail_fetch: None,
            snapshots,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for FakeRunner {
    async fn submit(&self, _request: &TestRequest) -> PerfOpsResult<TestId> {
        match &self.submit_error {
            Some(msg) => Err(PerfOpsError::Api(msg.clone())),
            None => Ok(TestId::new("test-123")),
        }
    }

    async fn fetch(&self, _id: &TestId) -> PerfOpsResult<RunOutput> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.fail_fetch {
            return Err(PerfOpsError::Api(msg.clone()));
        }
        let idx = n.min(self.snapshots.len().saturating_sub(1));
        Ok(self.snapshots.get(idx).cloned().unwrap_or_default())
    }
}

/// Parse a snapshot from JSON.
pub fn snapshot(json: &str) -> RunOutput {
    serde_json::from_str(json).expect("valid snapshot json")
}
