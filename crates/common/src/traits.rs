//! Core traits for PerfOps components

use crate::error::PerfOpsResult;
use crate::types::{RunOutput, TestId, TestRequest};
use async_trait::async_trait;

/// Submits a test and fetches snapshots of its output.
///
/// The run/poll engine only ever talks to the API through this trait, so
/// any test kind (or a fake in tests) can drive it.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Submit a test and return the identifier to poll it by.
    async fn submit(&self, request: &TestRequest) -> PerfOpsResult<TestId>;

    /// Fetch the full current snapshot of a submitted test.
    async fn fetch(&self, id: &TestId) -> PerfOpsResult<RunOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Finished;

    struct MockRunner;

    #[async_trait]
    impl TestRunner for MockRunner {
        async fn submit(&self, request: &TestRequest) -> PerfOpsResult<TestId> {
            Ok(TestId::new(format!("id-{}", request.target)))
        }

        async fn fetch(&self, id: &TestId) -> PerfOpsResult<RunOutput> {
            Ok(RunOutput {
                id: id.to_string(),
                finished: Finished::Text("true".into()),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_runner_trait() {
        let runner = MockRunner;
        let id = runner.submit(&TestRequest::new("example.com")).await.unwrap();
        assert_eq!(id.as_str(), "id-example.com");

        let output = runner.fetch(&id).await.unwrap();
        assert!(output.is_finished());
    }
}
