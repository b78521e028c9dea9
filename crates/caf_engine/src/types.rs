use std::path::PathBuf;

use caf_core::{JobCreationError, JobSnapshot, UploadResult};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("http status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("failed to save result: {0}")]
    Persist(String),
}

/// Results reported by the engine thread back to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UploadFinished(UploadResult),
    JobCreated(Result<JobSnapshot, JobCreationError>),
    PollTick {
        job_id: String,
    },
    PollCompleted {
        job_id: String,
        seq: u64,
        result: Result<JobSnapshot, ServiceError>,
    },
    DownloadFinished {
        job_id: String,
        result: Result<PathBuf, DownloadError>,
    },
}
