//! Error types for PerfOps operations
//!
//! Every failure a test run can hit, from local argument validation to a
//! malformed poll response, is one variant of [`PerfOpsError`].

use std::io;
use thiserror::Error;

/// HTTP status the API answers with when the key is rejected.
pub const STATUS_UNAUTHORIZED: u16 = 401;

#[derive(Error, Debug)]
pub enum PerfOpsError {
    /// A request argument failed local validation; nothing was sent.
    #[error("invalid argument: {name}")]
    InvalidArgument { name: String },

    /// The API answered with a non-2xx status.
    #[error("{}", http_message(.status, .body))]
    Http { status: u16, body: String },

    /// The API accepted the request but reported an error in the body.
    #[error("{0}")]
    Api(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn http_message(status: &u16, body: &str) -> String {
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    }
}

impl PerfOpsError {
    pub fn invalid_argument<S: Into<String>>(name: S) -> Self {
        PerfOpsError::InvalidArgument { name: name.into() }
    }

    /// Whether the API rejected the request's credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PerfOpsError::Http { status, .. } if *status == STATUS_UNAUTHORIZED)
    }

    /// Name of the offending argument for validation failures.
    #[must_use]
    pub fn arg_name(&self) -> Option<&str> {
        match self {
            PerfOpsError::InvalidArgument { name } => Some(name),
            _ => None,
        }
    }
}

/// Result type alias for PerfOps operations
pub type PerfOpsResult<T> = Result<T, PerfOpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display() {
        let with_body = PerfOpsError::Http { status: 500, body: "boom".into() };
        assert_eq!(with_body.to_string(), "500: boom");

        let empty = PerfOpsError::Http { status: 404, body: String::new() };
        assert_eq!(empty.to_string(), "404");
    }

    #[test]
    fn unauthorized_detection() {
        let err = PerfOpsError::Http { status: STATUS_UNAUTHORIZED, body: String::new() };
        assert!(err.is_unauthorized());
        assert!(!PerfOpsError::Http { status: 403, body: String::new() }.is_unauthorized());
        assert!(!PerfOpsError::Api("nope".into()).is_unauthorized());
    }

    #[test]
    fn arg_name_only_for_validation_errors() {
        let err = PerfOpsError::invalid_argument("limit");
        assert_eq!(err.arg_name(), Some("limit"));
        assert_eq!(err.to_string(), "invalid argument: limit");
        assert_eq!(PerfOpsError::Transport("x".into()).arg_name(), None);
    }
}
