//! ChangeAnyFile core: pure job lifecycle state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod status;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    AppState, JobCreationError, JobResult, JobSnapshot, PollingSession, UploadResult,
    UploadState, DEFAULT_PROMPT,
};
pub use status::{classify_status, JobStatus, StatusBadge, VisualCategory};
pub use update::update;
pub use view_model::{AppViewModel, JobView};
