//! JSON bodies exchanged with the processing service.

use caf_core::{JobResult, JobSnapshot, JobStatus};
use serde::{Deserialize, Serialize};

/// Fallback name when the service reports a result without a file name.
const UNNAMED_RESULT: &str = "result.bin";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateJobRequest<'a> {
    pub file_id: &'a str,
    pub prompt: &'a str,
}

/// Shared by the creation response (`jobId`, `status`, `createdAt` only) and
/// the full status response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobRecord {
    pub job_id: String,
    pub status: String,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub result: Option<ResultRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultRecord {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl From<JobRecord> for JobSnapshot {
    fn from(record: JobRecord) -> Self {
        JobSnapshot {
            job_id: record.job_id,
            status: JobStatus::parse(&record.status),
            created_at: record.created_at,
            updated_at: record.updated_at,
            file_id: record.file_id,
            original_name: record.original_name,
            prompt: record.prompt,
            logs: record.logs.unwrap_or_default(),
            result: record.result.map(|result| JobResult {
                filename: result
                    .filename
                    .unwrap_or_else(|| UNNAMED_RESULT.to_string()),
                size: result.size.unwrap_or(0),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Extracts the service's `detail` message when it is a non-empty string.
/// Validation errors carry a list there; those fall back to a generic message.
pub(crate) fn detail_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        _ => None,
    }
}
