//! Recurring poll timer for the active job.
//!
//! A [`PollTimer`] owns the spawned ticker task. Dropping it (or calling
//! [`PollTimer::stop`]) cancels the task, so the handle is released exactly
//! once by ownership. [`PollScheduler`] holds at most one timer.

use std::sync::Arc;
use std::time::Duration;

use caf_logging::caf_info;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::EngineEvent;

/// Guards against a zero period, which tokio's interval rejects.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

pub struct PollTimer {
    job_id: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollTimer {
    /// Emits `EngineEvent::PollTick` for `job_id` every `period`, starting one
    /// period from now. Ticks do not wait for earlier polls to finish.
    pub fn start(
        runtime: &Handle,
        job_id: impl Into<String>,
        period: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let job_id = job_id.into();
        let period = period.max(MIN_POLL_INTERVAL);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tick_job_id = job_id.clone();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => sink.emit(EngineEvent::PollTick {
                        job_id: tick_job_id.clone(),
                    }),
                }
            }
        });

        Self {
            job_id,
            cancel,
            task,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Releases the timer. Equivalent to dropping it.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        caf_info!("Poll timer released for job {}", self.job_id);
    }
}

/// Owner of the single active [`PollTimer`].
pub struct PollScheduler {
    runtime: Handle,
    period: Duration,
    sink: Arc<dyn EventSink>,
    current: Option<PollTimer>,
}

impl PollScheduler {
    pub fn new(runtime: Handle, period: Duration, sink: Arc<dyn EventSink>) -> Self {
        Self {
            runtime,
            period,
            sink,
            current: None,
        }
    }

    /// Releases any running timer, then starts one for `job_id`.
    pub fn start(&mut self, job_id: &str) {
        self.stop();
        caf_info!(
            "Polling job {} every {} ms",
            job_id,
            self.period.as_millis()
        );
        self.current = Some(PollTimer::start(
            &self.runtime,
            job_id,
            self.period,
            self.sink.clone(),
        ));
    }

    /// Releases the timer if it belongs to `job_id`. Returns whether one was released.
    pub fn stop_for(&mut self, job_id: &str) -> bool {
        if self.active_job() == Some(job_id) {
            self.stop()
        } else {
            false
        }
    }

    /// Releases the current timer, if any. Returns whether one was released.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(timer) => {
                timer.stop();
                true
            }
            None => false,
        }
    }

    pub fn active_job(&self) -> Option<&str> {
        self.current.as_ref().map(PollTimer::job_id)
    }
}
