use crate::{JobResult, JobStatus, StatusBadge, UploadResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub selected_file: Option<String>,
    pub uploading: bool,
    pub upload: Option<UploadResult>,
    pub prompt: String,
    pub creating_job: bool,
    pub can_create_job: bool,
    pub job: Option<JobView>,
    pub polling: bool,
    pub can_download: bool,
    pub downloading: bool,
    pub downloaded_to: Option<String>,
    pub last_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job_id: String,
    pub status: JobStatus,
    pub badge: StatusBadge,
    pub created_at: i64,
    pub logs: Vec<String>,
    pub result: Option<JobResult>,
    pub failure_reason: Option<String>,
}
