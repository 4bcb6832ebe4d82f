use std::time::Duration;

use super::ApiGeneration;

/// Failure of a single runtime call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("runtime returned error: {0}")]
    Status(#[source] Box<tonic::Status>),
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<tonic::Status> for CallError {
    fn from(status: tonic::Status) -> Self {
        CallError::Status(Box::new(status))
    }
}

/// A candidate generation that did not answer the version probe.
#[derive(Debug, thiserror::Error)]
#[error("{generation}: {error}")]
pub struct ProbeFailure {
    pub generation: ApiGeneration,
    #[source]
    pub error: CallError,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid runtime endpoint `{endpoint}`: {reason}")]
    Resolve { endpoint: String, reason: String },
    #[error("failed to connect to runtime socket `{address}`: {source}")]
    Dial {
        address: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("no supported CRI API version answered [{}]", join_failures(.failures))]
    NegotiationExhausted { failures: Vec<ProbeFailure> },
    #[error("runtime service client is not initialized")]
    NotInitialized,
    #[error("{operation} failed: {source}")]
    Call {
        operation: &'static str,
        #[source]
        source: CallError,
    },
}

fn join_failures(failures: &[ProbeFailure]) -> String {
    failures
        .iter()
        .map(ProbeFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
