//! ChangeAnyFile engine: remote service client, poll timer and effect execution.
mod client;
mod config;
mod engine;
mod persist;
mod poll;
mod types;
mod wire;

pub use client::{DownloadedResult, JobService, ReqwestJobService, UploadFile};
pub use config::{ConfigError, Endpoints, ServiceConfig, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use engine::{EngineConfig, EngineHandle};
pub use persist::{ensure_output_dir, sanitize_filename, AtomicFileWriter, PersistError};
pub use poll::{ChannelEventSink, EventSink, PollScheduler, PollTimer};
pub use types::{DownloadError, EngineEvent, ServiceError};
