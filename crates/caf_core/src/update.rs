use crate::{
    AppState, Effect, JobCreationError, JobSnapshot, JobStatus, Msg, PollingSession, UploadResult,
    UploadState,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected { path } => {
            state.select_file(path);
            Vec::new()
        }
        Msg::PromptChanged(prompt) => {
            state.set_prompt(prompt);
            Vec::new()
        }
        Msg::UploadClicked => upload_clicked(&mut state),
        Msg::UploadFinished(result) => {
            match &result {
                UploadResult::Uploaded { .. } => state.clear_error(),
                UploadResult::Failed { message } => state.set_error(message.clone()),
            }
            state.set_upload(UploadState::Finished(result));
            Vec::new()
        }
        Msg::CreateJobClicked => create_job_clicked(&mut state),
        Msg::JobCreated(Ok(job)) => job_created(&mut state, job),
        Msg::JobCreated(Err(err)) => {
            state.set_creating_job(false);
            state.set_error(err.to_string());
            Vec::new()
        }
        Msg::PollTick { job_id } => match state.session_mut() {
            Some(session) if session.targets(&job_id) => {
                let seq = session.issue();
                vec![Effect::PollJob { job_id, seq }]
            }
            // Tick from a timer that has already been released.
            _ => Vec::new(),
        },
        Msg::PollCompleted {
            job_id,
            seq,
            result,
        } => poll_completed(&mut state, job_id, seq, result),
        Msg::DownloadClicked => download_clicked(&mut state),
        Msg::DownloadFinished { job_id, result } => {
            download_finished(&mut state, &job_id, result)
        }
        Msg::StopRequested => match state.session_mut() {
            Some(session) if session.is_active() => {
                session.deactivate();
                let job_id = session.target_job_id().to_string();
                state.mark_dirty();
                vec![Effect::StopPolling { job_id }]
            }
            _ => Vec::new(),
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn upload_clicked(state: &mut AppState) -> Vec<Effect> {
    if *state.upload() == UploadState::InFlight {
        return Vec::new();
    }
    let Some(path) = state.selected_file().map(ToOwned::to_owned) else {
        state.set_error("choose a file first");
        return Vec::new();
    };
    state.clear_error();
    state.set_upload(UploadState::InFlight);
    vec![Effect::UploadFile { path }]
}

fn create_job_clicked(state: &mut AppState) -> Vec<Effect> {
    if state.creating_job() {
        return Vec::new();
    }
    let Some(file_id) = state.uploaded_file_id().map(ToOwned::to_owned) else {
        state.set_error(JobCreationError::MissingFileId.to_string());
        return Vec::new();
    };
    let prompt = state.effective_prompt();
    state.clear_error();
    state.set_creating_job(true);
    vec![Effect::CreateJob { file_id, prompt }]
}

fn download_clicked(state: &mut AppState) -> Vec<Effect> {
    let completed = state
        .job()
        .is_some_and(|job| job.status == JobStatus::Completed);
    if !completed {
        state.set_error("result not available yet");
        return Vec::new();
    }
    if state.downloading() {
        return Vec::new();
    }
    let Some(effect) = state.job().map(|job| Effect::DownloadResult {
        job_id: job.job_id.clone(),
        filename: job.result.as_ref().map(|result| result.filename.clone()),
    }) else {
        return Vec::new();
    };
    state.clear_error();
    state.set_downloading(true);
    vec![effect]
}

fn download_finished(
    state: &mut AppState,
    job_id: &str,
    result: Result<String, String>,
) -> Vec<Effect> {
    // Outcome of a download started for a job that has since been replaced.
    if state.job().map(|job| job.job_id.as_str()) != Some(job_id) {
        return Vec::new();
    }
    state.set_downloading(false);
    match result {
        Ok(path) => {
            state.clear_error();
            state.set_downloaded_to(path);
        }
        Err(message) => state.set_error(message),
    }
    Vec::new()
}

fn job_created(state: &mut AppState, job: JobSnapshot) -> Vec<Effect> {
    state.set_creating_job(false);
    state.clear_error();
    state.reset_download();

    let job_id = job.job_id.clone();
    let terminal = job.is_terminal();
    state.replace_job(job);

    // The old session must be released before the new one is acquired.
    let next = (!terminal).then(|| PollingSession::start(job_id.clone()));
    let mut effects = Vec::with_capacity(2);
    if let Some(previous) = state.replace_session(next) {
        effects.push(Effect::StopPolling {
            job_id: previous.target_job_id().to_string(),
        });
    }
    if !terminal {
        effects.push(Effect::StartPolling { job_id });
    }
    effects
}

fn poll_completed(
    state: &mut AppState,
    job_id: String,
    seq: u64,
    result: Result<JobSnapshot, String>,
) -> Vec<Effect> {
    let Some(session) = state.session_mut() else {
        return Vec::new();
    };
    if !session.accepts(&job_id, seq) {
        return Vec::new();
    }
    // Failed polls are background noise; the next tick retries.
    let Ok(job) = result else {
        return Vec::new();
    };
    if job.job_id != job_id {
        return Vec::new();
    }

    session.mark_applied(seq);
    let terminal = job.is_terminal();
    if terminal {
        session.deactivate();
    }
    state.replace_job(job);

    if terminal {
        vec![Effect::StopPolling { job_id }]
    } else {
        Vec::new()
    }
}
