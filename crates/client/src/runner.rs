//! Binds the API client to one test kind

use async_trait::async_trait;
use perfops_common::{PerfOpsResult, RunOutput, TestId, TestKind, TestRequest, TestRunner};
use std::sync::Arc;

use crate::client::ApiClient;

/// [`TestRunner`] that submits and polls tests of a single kind.
#[derive(Debug, Clone)]
pub struct KindRunner {
    client: Arc<ApiClient>,
    kind: TestKind,
}

impl KindRunner {
    pub fn new(client: Arc<ApiClient>, kind: TestKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }
}

#[async_trait]
impl TestRunner for KindRunner {
    async fn submit(&self, request: &TestRequest) -> PerfOpsResult<TestId> {
        self.client.submit(self.kind, request).await
    }

    async fn fetch(&self, id: &TestId) -> PerfOpsResult<RunOutput> {
        self.client.fetch(self.kind, id).await
    }
}
