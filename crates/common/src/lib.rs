//! PerfOps Common - Shared types, traits and errors
//!
//! This crate provides the data model of the PerfOps API, the error type
//! every crate returns and the [`TestRunner`] seam between the run/poll
//! engine and the HTTP client.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{PerfOpsError, PerfOpsResult};
pub use traits::TestRunner;
pub use types::{
    City, Continent, Country, Finished, IpVersion, Node, NodeIds, OutputPayload, RunItem,
    RunOutput, RunResult, TestId, TestKind, TestParams, TestRequest, NO_DATA, TIMEOUT_MESSAGE,
    TIMEOUT_SENTINEL,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
