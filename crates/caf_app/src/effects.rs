use std::path::PathBuf;
use std::time::Duration;

use caf_core::{Effect, Msg};
use caf_engine::{ConfigError, EngineConfig, EngineEvent, EngineHandle};
use caf_logging::caf_debug;

/// Executes [`Effect`]s on the engine and turns its events back into [`Msg`]s.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: EngineHandle::new(config)?,
        })
    }

    #[cfg(test)]
    pub fn with_service(
        service: std::sync::Arc<dyn caf_engine::JobService>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: EngineHandle::with_service(service, config)?,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            caf_debug!("Effect {:?}", effect);
            match effect {
                Effect::UploadFile { path } => self.engine.upload(PathBuf::from(path)),
                Effect::CreateJob { file_id, prompt } => self.engine.create_job(file_id, prompt),
                Effect::StartPolling { job_id } => self.engine.start_polling(job_id),
                Effect::StopPolling { job_id } => self.engine.stop_polling(job_id),
                Effect::PollJob { job_id, seq } => self.engine.poll(job_id, seq),
                Effect::DownloadResult { job_id, filename } => {
                    self.engine.download(job_id, filename)
                }
            }
        }
    }

    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }

    pub fn download_url(&self, job_id: &str) -> String {
        self.engine.download_url(job_id)
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadFinished(result) => Msg::UploadFinished(result),
        EngineEvent::JobCreated(result) => Msg::JobCreated(result),
        EngineEvent::PollTick { job_id } => Msg::PollTick { job_id },
        EngineEvent::PollCompleted {
            job_id,
            seq,
            result,
        } => Msg::PollCompleted {
            job_id,
            seq,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::DownloadFinished { job_id, result } => Msg::DownloadFinished {
            job_id,
            result: result
                .map(|path| path.display().to_string())
                .map_err(|err| err.to_string()),
        },
    }
}
