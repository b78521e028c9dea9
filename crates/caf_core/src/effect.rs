/// Side effects requested by [`crate::update`]; executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    UploadFile { path: String },
    CreateJob { file_id: String, prompt: String },
    /// Acquire the recurring poll timer for `job_id`.
    StartPolling { job_id: String },
    /// Release the poll timer held for `job_id`.
    StopPolling { job_id: String },
    PollJob { job_id: String, seq: u64 },
    DownloadResult {
        job_id: String,
        filename: Option<String>,
    },
}
