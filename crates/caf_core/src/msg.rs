use crate::{JobCreationError, JobSnapshot, UploadResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a local file to upload.
    FileSelected { path: String },
    /// User asked for the selected file to be uploaded.
    UploadClicked,
    /// Engine finished an upload attempt.
    UploadFinished(UploadResult),
    /// User edited the free-text instruction.
    PromptChanged(String),
    /// User asked for a job to be created from the uploaded file.
    CreateJobClicked,
    /// Engine finished the job-creation call.
    JobCreated(Result<JobSnapshot, JobCreationError>),
    /// Poll timer fired for a job.
    PollTick { job_id: String },
    /// Engine finished one status request. `seq` is the value issued with the
    /// matching `Effect::PollJob`.
    PollCompleted {
        job_id: String,
        seq: u64,
        result: Result<JobSnapshot, String>,
    },
    /// User asked for the result file.
    DownloadClicked,
    /// Engine finished the download for `job_id`; `Ok` carries the saved path.
    DownloadFinished {
        job_id: String,
        result: Result<String, String>,
    },
    /// Consumer is going away; release the polling session.
    StopRequested,
    /// Fallback for placeholder wiring.
    NoOp,
}
