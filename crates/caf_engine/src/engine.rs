use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use caf_logging::{caf_debug, caf_info, caf_warn};

use crate::client::{JobService, ReqwestJobService, UploadFile};
use crate::config::{ConfigError, ServiceConfig};
use crate::persist::AtomicFileWriter;
use crate::poll::{ChannelEventSink, EventSink, PollScheduler};
use crate::{DownloadError, EngineEvent};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub service: ServiceConfig,
    /// Directory downloaded results are written into.
    pub output_dir: PathBuf,
}

enum EngineCommand {
    StartPolling { job_id: String },
    StopPolling { job_id: String },
    Request(Request),
}

enum Request {
    Upload { path: PathBuf },
    CreateJob { file_id: String, prompt: String },
    Poll { job_id: String, seq: u64 },
    Download { job_id: String, filename: Option<String> },
}

/// Runs service calls and the poll timer on a background thread.
///
/// Requests are fire-and-forget; outcomes come back as [`EngineEvent`]s via
/// [`EngineHandle::try_recv`] or [`EngineHandle::recv_timeout`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    service: Arc<dyn JobService>,
    worker: thread::JoinHandle<()>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let service = Arc::new(ReqwestJobService::new(&config.service)?);
        Self::with_service(service, config)
    }

    /// Uses `service` instead of the HTTP client built from `config.service`.
    pub fn with_service(
        service: Arc<dyn JobService>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("caf-engine-rt")
            .build()?;

        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));
        let worker_service = service.clone();
        let writer = AtomicFileWriter::new(config.output_dir);
        let poll_interval = config.service.poll_interval;

        let worker = thread::Builder::new()
            .name("caf-engine".to_string())
            .spawn(move || {
                let mut scheduler =
                    PollScheduler::new(runtime.handle().clone(), poll_interval, sink.clone());
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::StartPolling { job_id } => scheduler.start(&job_id),
                        EngineCommand::StopPolling { job_id } => {
                            if !scheduler.stop_for(&job_id) {
                                caf_debug!("No poll timer running for job {}", job_id);
                            }
                        }
                        EngineCommand::Request(request) => {
                            let service = worker_service.clone();
                            let sink = sink.clone();
                            let writer = writer.clone();
                            runtime.spawn(async move {
                                let event = handle_request(service.as_ref(), &writer, request).await;
                                sink.emit(event);
                            });
                        }
                    }
                }
                scheduler.stop();
                caf_info!("Engine thread stopped");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            service,
            worker,
        })
    }

    pub fn upload(&self, path: PathBuf) {
        self.request(Request::Upload { path });
    }

    pub fn create_job(&self, file_id: impl Into<String>, prompt: impl Into<String>) {
        self.request(Request::CreateJob {
            file_id: file_id.into(),
            prompt: prompt.into(),
        });
    }

    pub fn poll(&self, job_id: impl Into<String>, seq: u64) {
        self.request(Request::Poll {
            job_id: job_id.into(),
            seq,
        });
    }

    pub fn download(&self, job_id: impl Into<String>, filename: Option<String>) {
        self.request(Request::Download {
            job_id: job_id.into(),
            filename,
        });
    }

    /// Starts the recurring timer for `job_id`, replacing any running one.
    pub fn start_polling(&self, job_id: impl Into<String>) {
        self.send(EngineCommand::StartPolling {
            job_id: job_id.into(),
        });
    }

    /// Releases the timer if it belongs to `job_id`.
    pub fn stop_polling(&self, job_id: impl Into<String>) {
        self.send(EngineCommand::StopPolling {
            job_id: job_id.into(),
        });
    }

    pub fn download_url(&self, job_id: &str) -> String {
        self.service.download_url(job_id)
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Closes the command channel and waits for the engine thread, which
    /// releases any running poll timer on its way out.
    pub fn shutdown(self) {
        let Self { cmd_tx, worker, .. } = self;
        drop(cmd_tx);
        if worker.join().is_err() {
            caf_warn!("Engine thread panicked during shutdown");
        }
    }

    fn request(&self, request: Request) {
        self.send(EngineCommand::Request(request));
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            caf_warn!("Engine thread is gone; command dropped");
        }
    }
}

async fn handle_request(
    service: &dyn JobService,
    writer: &AtomicFileWriter,
    request: Request,
) -> EngineEvent {
    match request {
        Request::Upload { path } => {
            let result = match UploadFile::from_path(&path).await {
                Ok(file) => service.submit_upload(file).await,
                Err(err) => caf_core::UploadResult::failed(format!(
                    "failed to read {}: {err}",
                    path.display()
                )),
            };
            EngineEvent::UploadFinished(result)
        }
        Request::CreateJob { file_id, prompt } => {
            let result = service.create_job(&file_id, &prompt).await;
            match &result {
                Ok(job) => caf_info!("Job {} created ({})", job.job_id, job.status),
                Err(err) => caf_warn!("Job creation failed: {}", err),
            }
            EngineEvent::JobCreated(result)
        }
        Request::Poll { job_id, seq } => {
            let result = service.fetch_job(&job_id).await;
            if let Err(err) = &result {
                caf_warn!("Poll #{} for job {} failed: {}", seq, job_id, err);
            }
            EngineEvent::PollCompleted {
                job_id,
                seq,
                result,
            }
        }
        Request::Download { job_id, filename } => {
            let result = download(service, writer, &job_id, filename).await;
            match &result {
                Ok(path) => caf_info!("Saved result of job {} to {}", job_id, path.display()),
                Err(err) => caf_warn!("Download for job {} failed: {}", job_id, err),
            }
            EngineEvent::DownloadFinished { job_id, result }
        }
    }
}

async fn download(
    service: &dyn JobService,
    writer: &AtomicFileWriter,
    job_id: &str,
    hint: Option<String>,
) -> Result<PathBuf, DownloadError> {
    let downloaded = service.download_result(job_id).await?;
    let name = downloaded
        .filename
        .or(hint)
        .unwrap_or_else(|| format!("{job_id}.bin"));
    let writer = writer.clone();
    let bytes = downloaded.bytes;
    tokio::task::spawn_blocking(move || writer.write(&name, &bytes))
        .await
        .map_err(|err| DownloadError::Persist(err.to_string()))?
        .map_err(|err| DownloadError::Persist(err.to_string()))
}
