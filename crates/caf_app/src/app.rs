use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use caf_core::{update, AppState, AppViewModel, JobStatus, Msg};
use caf_logging::{caf_error, caf_info};

use crate::cli::Cli;
use crate::effects::EffectRunner;
use crate::render::Renderer;

const EVENT_WAIT: Duration = Duration::from_millis(200);

/// Where the unattended run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uploading,
    Creating,
    Processing,
    Downloading,
    Done(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Succeeded => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}

/// Drives one file through upload, job creation, polling and download,
/// writing progress lines to `out`.
struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    phase: Phase,
    download: bool,
    out: W,
}

/// Uploads `cli.file`, creates a job, follows it to a terminal status and
/// optionally saves the result. Returns the process exit status.
pub fn run(cli: Cli) -> Result<ExitCode> {
    let runner = EffectRunner::new(cli.engine_config())
        .with_context(|| format!("failed to start engine for {}", cli.base_url))?;
    caf_info!("Using service at {}", cli.base_url);

    let mut app = App::new(runner, !cli.no_download, std::io::stdout());
    app.start(&cli.file, cli.prompt);
    let outcome = app.drive();
    app.close();

    Ok(outcome.exit_code())
}

impl<W: Write> App<W> {
    fn new(runner: EffectRunner, download: bool, out: W) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::default(),
            phase: Phase::Uploading,
            download,
            out,
        }
    }

    fn start(&mut self, file: &Path, prompt: Option<String>) {
        self.dispatch(Msg::FileSelected {
            path: file.display().to_string(),
        });
        if let Some(prompt) = prompt {
            self.dispatch(Msg::PromptChanged(prompt));
        }
        let view = self.dispatch(Msg::UploadClicked);
        // A rejected click (no file) leaves nothing in flight.
        if !view.uploading {
            self.finish(Outcome::Failed);
        }
    }

    fn drive(&mut self) -> Outcome {
        loop {
            if let Phase::Done(outcome) = self.phase {
                return outcome;
            }
            self.step(EVENT_WAIT);
        }
    }

    /// Handles at most one engine event.
    fn step(&mut self, wait: Duration) {
        if let Some(msg) = self.runner.next_msg(wait) {
            self.handle(msg);
        }
    }

    /// No-op once the job is terminal.
    fn release_polling(&mut self) -> AppViewModel {
        self.dispatch(Msg::StopRequested)
    }

    fn close(mut self) -> W {
        self.release_polling();
        self.runner.shutdown();
        self.out
    }

    fn dispatch(&mut self, msg: Msg) -> AppViewModel {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.view();
        if state.consume_dirty() {
            let lines = self.renderer.render(&view);
            self.emit(lines);
        }
        self.state = state;
        self.runner.enqueue(effects);
        view
    }

    fn handle(&mut self, msg: Msg) {
        let upload_finished = matches!(msg, Msg::UploadFinished(_));
        let creation_finished = matches!(msg, Msg::JobCreated(_));
        let download_finished = matches!(msg, Msg::DownloadFinished { .. });
        let view = self.dispatch(msg);

        match self.phase {
            Phase::Uploading if upload_finished => {
                if view.can_create_job {
                    self.phase = Phase::Creating;
                    self.dispatch(Msg::CreateJobClicked);
                } else {
                    self.finish(Outcome::Failed);
                }
            }
            Phase::Creating if creation_finished => {
                if view.job.is_some() {
                    self.phase = Phase::Processing;
                    self.on_job_progress(&view);
                } else {
                    self.finish(Outcome::Failed);
                }
            }
            Phase::Processing => self.on_job_progress(&view),
            Phase::Downloading if download_finished => {
                if view.downloaded_to.is_some() {
                    self.finish(Outcome::Succeeded);
                } else {
                    self.finish(Outcome::Failed);
                }
            }
            _ => {}
        }
    }

    fn on_job_progress(&mut self, view: &AppViewModel) {
        let Some(job) = &view.job else {
            return;
        };
        match job.status {
            JobStatus::Completed if self.download => {
                self.phase = Phase::Downloading;
                let view = self.dispatch(Msg::DownloadClicked);
                if !view.downloading {
                    self.finish(Outcome::Failed);
                }
            }
            JobStatus::Completed => {
                let url = self.runner.download_url(&job.job_id);
                self.emit(vec![format!("Download: {url}")]);
                self.finish(Outcome::Succeeded);
            }
            JobStatus::Failed => self.finish(Outcome::Failed),
            JobStatus::Queued | JobStatus::Processing | JobStatus::Other(_) => {}
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if outcome == Outcome::Failed {
            if let Some(message) = self.state.view().last_error {
                caf_error!("Run failed: {}", message);
            }
        }
        self.phase = Phase::Done(outcome);
    }

    fn emit(&mut self, lines: Vec<String>) {
        for line in lines {
            let _ = writeln!(self.out, "{line}");
        }
        let _ = self.out.flush();
    }
}
