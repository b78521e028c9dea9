use thiserror::Error;

use crate::status::{classify_status, JobStatus};
use crate::view_model::{AppViewModel, JobView};

/// Instruction sent with a job when the user leaves the prompt empty.
pub const DEFAULT_PROMPT: &str = "Convert this file.";

/// Outcome of one upload attempt. Never mutated; a later attempt replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Uploaded { file_id: String },
    Failed { message: String },
}

impl UploadResult {
    pub fn uploaded(file_id: impl Into<String>) -> Self {
        UploadResult::Uploaded {
            file_id: file_id.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        UploadResult::Failed {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, UploadResult::Uploaded { .. })
    }

    pub fn file_id(&self) -> Option<&str> {
        match self {
            UploadResult::Uploaded { file_id } => Some(file_id),
            UploadResult::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UploadResult::Uploaded { .. } => None,
            UploadResult::Failed { message } => Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
}

/// Latest known server-side state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    /// Unix seconds.
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub file_id: Option<String>,
    pub original_name: Option<String>,
    pub prompt: Option<String>,
    pub logs: Vec<String>,
    pub result: Option<JobResult>,
}

impl JobSnapshot {
    pub fn new(job_id: impl Into<String>, status: JobStatus, created_at: i64) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            created_at,
            updated_at: None,
            file_id: None,
            original_name: None,
            prompt: None,
            logs: Vec::new(),
            result: None,
        }
    }

    /// Drops any `result` reported alongside a non-completed status.
    pub fn normalized(mut self) -> Self {
        if self.status != JobStatus::Completed {
            self.result = None;
        }
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Last non-blank log line of a failed job.
    pub fn failure_reason(&self) -> Option<&str> {
        if self.status != JobStatus::Failed {
            return None;
        }
        self.logs
            .iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobCreationError {
    #[error("upload a file before creating a job")]
    MissingFileId,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("failed to create job: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    InFlight,
    Finished(UploadResult),
}

/// Logical half of a polling session: which job is observed and which
/// responses may still be applied. The timer itself lives in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSession {
    target_job_id: String,
    active: bool,
    issued: u64,
    last_applied: Option<u64>,
}

impl PollingSession {
    pub(crate) fn start(job_id: impl Into<String>) -> Self {
        Self {
            target_job_id: job_id.into(),
            active: true,
            issued: 0,
            last_applied: None,
        }
    }

    pub fn target_job_id(&self) -> &str {
        &self.target_job_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of status requests issued so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    pub(crate) fn targets(&self, job_id: &str) -> bool {
        self.active && self.target_job_id == job_id
    }

    pub(crate) fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// A response is applicable only while active, for the current target,
    /// and when newer than anything already applied.
    pub(crate) fn accepts(&self, job_id: &str, seq: u64) -> bool {
        self.targets(job_id) && self.last_applied.map_or(true, |last| seq > last)
    }

    pub(crate) fn mark_applied(&mut self, seq: u64) {
        self.last_applied = Some(seq);
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    selected_file: Option<String>,
    upload: UploadState,
    prompt: String,
    creating_job: bool,
    job: Option<JobSnapshot>,
    session: Option<PollingSession>,
    downloading: bool,
    downloaded_to: Option<String>,
    last_error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let job = self.job.as_ref().map(|job| JobView {
            job_id: job.job_id.clone(),
            status: job.status.clone(),
            badge: classify_status(job.status.as_str()),
            created_at: job.created_at,
            logs: job.logs.clone(),
            result: job.result.clone(),
            failure_reason: job.failure_reason().map(ToOwned::to_owned),
        });
        let upload = match &self.upload {
            UploadState::Finished(result) => Some(result.clone()),
            UploadState::Idle | UploadState::InFlight => None,
        };

        AppViewModel {
            selected_file: self.selected_file.clone(),
            uploading: self.upload == UploadState::InFlight,
            can_create_job: self.uploaded_file_id().is_some() && !self.creating_job,
            upload,
            prompt: self.prompt.clone(),
            creating_job: self.creating_job,
            polling: self.session.as_ref().is_some_and(PollingSession::is_active),
            can_download: self.can_download(),
            job,
            downloading: self.downloading,
            downloaded_to: self.downloaded_to.clone(),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn job(&self) -> Option<&JobSnapshot> {
        self.job.as_ref()
    }

    pub fn session(&self) -> Option<&PollingSession> {
        self.session.as_ref()
    }

    pub fn upload(&self) -> &UploadState {
        &self.upload
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn select_file(&mut self, path: String) {
        self.selected_file = Some(path);
        self.mark_dirty();
    }

    pub(crate) fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub(crate) fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
        self.mark_dirty();
    }

    /// Prompt to send with a new job; falls back to [`DEFAULT_PROMPT`].
    pub(crate) fn effective_prompt(&self) -> String {
        let trimmed = self.prompt.trim();
        if trimmed.is_empty() {
            DEFAULT_PROMPT.to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub(crate) fn set_upload(&mut self, upload: UploadState) {
        self.upload = upload;
        self.mark_dirty();
    }

    pub(crate) fn uploaded_file_id(&self) -> Option<&str> {
        match &self.upload {
            UploadState::Finished(result) => result.file_id().filter(|id| !id.is_empty()),
            UploadState::Idle | UploadState::InFlight => None,
        }
    }

    pub(crate) fn creating_job(&self) -> bool {
        self.creating_job
    }

    pub(crate) fn set_creating_job(&mut self, creating: bool) {
        self.creating_job = creating;
        self.mark_dirty();
    }

    pub(crate) fn replace_job(&mut self, job: JobSnapshot) {
        self.job = Some(job.normalized());
        self.mark_dirty();
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut PollingSession> {
        self.session.as_mut()
    }

    /// Installs a new session and returns the previous one if it was still active.
    pub(crate) fn replace_session(&mut self, next: Option<PollingSession>) -> Option<PollingSession> {
        let previous = std::mem::replace(&mut self.session, next);
        self.mark_dirty();
        previous.filter(PollingSession::is_active)
    }

    pub(crate) fn can_download(&self) -> bool {
        !self.downloading
            && self
                .job
                .as_ref()
                .is_some_and(|job| job.status == JobStatus::Completed)
    }

    pub(crate) fn downloading(&self) -> bool {
        self.downloading
    }

    pub(crate) fn set_downloading(&mut self, downloading: bool) {
        self.downloading = downloading;
        self.mark_dirty();
    }

    pub(crate) fn reset_download(&mut self) {
        self.downloading = false;
        self.downloaded_to = None;
        self.mark_dirty();
    }

    pub(crate) fn set_downloaded_to(&mut self, path: String) {
        self.downloaded_to = Some(path);
        self.mark_dirty();
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.mark_dirty();
    }

    pub(crate) fn clear_error(&mut self) {
        if self.last_error.take().is_some() {
            self.mark_dirty();
        }
    }
}
