use caf_core::{
    update, AppState, Effect, JobCreationError, JobResult, JobSnapshot, JobStatus, Msg,
    UploadResult, VisualCategory,
};
use pretty_assertions::assert_eq;

fn snapshot(job_id: &str, status: JobStatus) -> JobSnapshot {
    JobSnapshot::new(job_id, status, 1_700_000_000)
}

fn completed(job_id: &str, filename: &str, size: u64) -> JobSnapshot {
    JobSnapshot {
        result: Some(JobResult {
            filename: filename.to_string(),
            size,
        }),
        ..snapshot(job_id, JobStatus::Completed)
    }
}

/// Drives upload and job creation, returning the state with an active session.
fn start_job(state: AppState, file_id: &str, job: JobSnapshot) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::UploadFinished(UploadResult::uploaded(file_id)));
    let (state, _) = update(state, Msg::CreateJobClicked);
    update(state, Msg::JobCreated(Ok(job)))
}

fn poll(state: AppState, job_id: &str) -> (AppState, u64) {
    let (state, effects) = update(
        state,
        Msg::PollTick {
            job_id: job_id.to_string(),
        },
    );
    let seq = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::PollJob { seq, .. } => Some(*seq),
            _ => None,
        })
        .expect("poll effect");
    (state, seq)
}

fn respond(state: AppState, job_id: &str, seq: u64, job: JobSnapshot) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::PollCompleted {
            job_id: job_id.to_string(),
            seq,
            result: Ok(job),
        },
    )
}

#[test]
fn happy_path_polls_until_completed() {
    caf_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::PromptChanged("convert to webp".into()));
    let (state, effects) = start_job(state, "f1", snapshot("j1", JobStatus::Queued));
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: "j1".to_string()
        }]
    );
    assert!(state.view().polling);
    assert!(!state.view().can_download);

    let (state, seq) = poll(state, "j1");
    assert_eq!(seq, 1);
    let (state, effects) = respond(state, "j1", seq, snapshot("j1", JobStatus::Processing));
    assert!(effects.is_empty());
    assert_eq!(
        state.view().job.unwrap().badge.category,
        VisualCategory::Processing
    );

    let (state, seq) = poll(state, "j1");
    assert_eq!(seq, 2);
    let (state, effects) = respond(state, "j1", seq, completed("j1", "out.webp", 12345));
    assert_eq!(
        effects,
        vec![Effect::StopPolling {
            job_id: "j1".to_string()
        }]
    );

    let view = state.view();
    assert!(!view.polling);
    assert!(view.can_download);
    assert_eq!(
        view.job.unwrap().result,
        Some(JobResult {
            filename: "out.webp".to_string(),
            size: 12345
        })
    );

    let (_state, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(
        effects,
        vec![Effect::DownloadResult {
            job_id: "j1".to_string(),
            filename: Some("out.webp".to_string()),
        }]
    );
}

#[test]
fn failure_path_stops_polling_and_exposes_reason() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f2", snapshot("j2", JobStatus::Processing));

    let (state, seq) = poll(state, "j2");
    let failed = JobSnapshot {
        logs: vec![
            "Job created and queued.".to_string(),
            "conversion error: unsupported codec".to_string(),
        ],
        ..snapshot("j2", JobStatus::Failed)
    };
    let (state, effects) = respond(state, "j2", seq, failed);
    assert_eq!(
        effects,
        vec![Effect::StopPolling {
            job_id: "j2".to_string()
        }]
    );

    let view = state.view();
    let job = view.job.unwrap();
    assert!(!view.polling);
    assert!(!view.can_download);
    assert_eq!(job.result, None);
    assert_eq!(job.badge.category, VisualCategory::Failed);
    assert_eq!(
        job.failure_reason.as_deref(),
        Some("conversion error: unsupported codec")
    );
}

#[test]
fn no_polls_are_issued_after_terminal_status() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));
    let (state, seq) = poll(state, "j1");
    let (state, _) = respond(state, "j1", seq, completed("j1", "a.pdf", 1));

    let (state, effects) = update(
        state,
        Msg::PollTick {
            job_id: "j1".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.session().unwrap().issued(), 1);
}

#[test]
fn result_is_stripped_from_non_completed_snapshots() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));
    let (state, seq) = poll(state, "j1");
    let premature = JobSnapshot {
        result: Some(JobResult {
            filename: "partial.bin".to_string(),
            size: 10,
        }),
        ..snapshot("j1", JobStatus::Processing)
    };
    let (state, _) = respond(state, "j1", seq, premature);

    assert_eq!(state.job().unwrap().result, None);
    assert!(state.session().unwrap().is_active());
}

#[test]
fn new_job_releases_previous_session_first() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Processing));
    let (state, _) = update(state, Msg::CreateJobClicked);
    let (state, effects) = update(state, Msg::JobCreated(Ok(snapshot("j2", JobStatus::Queued))));

    assert_eq!(
        effects,
        vec![
            Effect::StopPolling {
                job_id: "j1".to_string()
            },
            Effect::StartPolling {
                job_id: "j2".to_string()
            },
        ]
    );
    assert_eq!(state.session().unwrap().target_job_id(), "j2");
}

#[test]
fn new_job_after_terminal_does_not_release_twice() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));
    let (state, seq) = poll(state, "j1");
    let (state, _) = respond(state, "j1", seq, snapshot("j1", JobStatus::Failed));

    let (state, _) = update(state, Msg::CreateJobClicked);
    let (_state, effects) = update(state, Msg::JobCreated(Ok(snapshot("j2", JobStatus::Queued))));
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: "j2".to_string()
        }]
    );
}

#[test]
fn stale_response_for_previous_job_is_ignored() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Processing));
    let (state, old_seq) = poll(state, "j1");
    let (state, _) = update(state, Msg::CreateJobClicked);
    let (state, _) = update(state, Msg::JobCreated(Ok(snapshot("j2", JobStatus::Queued))));

    let (mut state, effects) = respond(state, "j1", old_seq, completed("j1", "old.pdf", 9));
    assert!(effects.is_empty());
    assert_eq!(state.job().unwrap().job_id, "j2");
    assert_eq!(state.job().unwrap().status, JobStatus::Queued);
    assert!(state.session().unwrap().is_active());
    // Creation marked dirty; the ignored response must not.
    state.consume_dirty();
    let (mut state, _) = respond(state, "j1", old_seq + 1, completed("j1", "old.pdf", 9));
    assert!(!state.consume_dirty());
}

#[test]
fn out_of_order_responses_keep_the_newest() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));
    let (state, first) = poll(state, "j1");
    let (state, second) = poll(state, "j1");

    let newer = JobSnapshot {
        logs: vec!["a".into(), "b".into()],
        ..snapshot("j1", JobStatus::Processing)
    };
    let older = JobSnapshot {
        logs: vec!["a".into()],
        ..snapshot("j1", JobStatus::Queued)
    };
    let (state, _) = respond(state, "j1", second, newer.clone());
    let (state, effects) = respond(state, "j1", first, older);

    assert!(effects.is_empty());
    assert_eq!(state.job(), Some(&newer));
    assert_eq!(state.session().unwrap().last_applied(), Some(second));
}

#[test]
fn poll_errors_are_swallowed_and_polling_continues() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));
    let (state, seq) = poll(state, "j1");
    let before = state.job().cloned();

    let (state, effects) = update(
        state,
        Msg::PollCompleted {
            job_id: "j1".to_string(),
            seq,
            result: Err("connection refused".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.job().cloned(), before);
    assert_eq!(state.view().last_error, None);

    let (_state, next_seq) = poll(state, "j1");
    assert_eq!(next_seq, seq + 1);
}

#[test]
fn logs_are_replaced_not_merged() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));
    let (state, seq) = poll(state, "j1");
    let (state, _) = respond(
        state,
        "j1",
        seq,
        JobSnapshot {
            logs: vec!["one".into(), "two".into()],
            ..snapshot("j1", JobStatus::Processing)
        },
    );
    let (state, seq) = poll(state, "j1");
    let (state, _) = respond(
        state,
        "j1",
        seq,
        JobSnapshot {
            logs: vec!["rewritten".into()],
            ..snapshot("j1", JobStatus::Processing)
        },
    );

    assert_eq!(state.job().unwrap().logs, vec!["rewritten".to_string()]);
}

#[test]
fn stop_is_idempotent() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Queued));

    let (mut state, effects) = update(state, Msg::StopRequested);
    assert_eq!(
        effects,
        vec![Effect::StopPolling {
            job_id: "j1".to_string()
        }]
    );
    assert!(!state.view().polling);

    state.consume_dirty();
    let before = state.clone();
    let (state, effects) = update(state, Msg::StopRequested);
    assert!(effects.is_empty());
    assert_eq!(state, before);

    // A tick or response racing the stop is ignored.
    let (state, effects) = update(
        state,
        Msg::PollTick {
            job_id: "j1".to_string(),
        },
    );
    assert!(effects.is_empty());
    let (state, _) = respond(state, "j1", 1, completed("j1", "late.pdf", 1));
    assert_eq!(state.job().unwrap().status, JobStatus::Queued);
}

#[test]
fn creation_failure_stores_no_job() {
    caf_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::UploadFinished(UploadResult::uploaded("f1")));
    let (state, _) = update(state, Msg::CreateJobClicked);
    let (state, effects) = update(
        state,
        Msg::JobCreated(Err(JobCreationError::Rejected {
            status: 404,
            message: "Uploaded file not found".to_string(),
        })),
    );

    assert!(effects.is_empty());
    assert!(state.job().is_none());
    assert!(state.session().is_none());
    let view = state.view();
    assert!(!view.creating_job);
    assert_eq!(view.last_error.as_deref(), Some("Uploaded file not found"));
}

#[test]
fn creation_failure_keeps_running_session() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Processing));
    let (state, _) = update(state, Msg::CreateJobClicked);
    let (state, effects) = update(
        state,
        Msg::JobCreated(Err(JobCreationError::Transport("connection reset".into()))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.session().unwrap().target_job_id(), "j1");
    assert!(state.session().unwrap().is_active());
}

#[test]
fn terminal_creation_response_does_not_start_polling() {
    caf_logging::initialize_for_tests();
    let (state, effects) = start_job(AppState::new(), "f1", completed("j1", "fast.pdf", 3));

    assert!(effects.is_empty());
    assert!(!state.view().polling);
    assert!(state.view().can_download);
}

#[test]
fn download_before_completion_is_rejected_locally() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", snapshot("j1", JobStatus::Processing));
    let (state, effects) = update(state, Msg::DownloadClicked);

    assert!(effects.is_empty());
    assert_eq!(
        state.view().last_error.as_deref(),
        Some("result not available yet")
    );
}

#[test]
fn download_outcome_is_reported() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", completed("j1", "out.pdf", 10));
    let (state, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(effects.len(), 1);
    assert!(state.view().downloading);

    // In flight: a second click does nothing.
    let (state, effects) = update(state, Msg::DownloadClicked);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::DownloadFinished {
            job_id: "j1".to_string(),
            result: Ok("output/out.pdf".to_string()),
        },
    );
    let view = state.view();
    assert!(!view.downloading);
    assert_eq!(view.downloaded_to.as_deref(), Some("output/out.pdf"));
}

#[test]
fn late_download_for_replaced_job_is_ignored() {
    caf_logging::initialize_for_tests();
    let (state, _) = start_job(AppState::new(), "f1", completed("j1", "out.pdf", 10));
    let (state, _) = update(state, Msg::DownloadClicked);
    assert!(state.view().downloading);

    let (state, _) = update(
        state,
        Msg::JobCreated(Ok(snapshot("j2", JobStatus::Processing))),
    );
    let view = state.view();
    assert!(!view.downloading);
    assert_eq!(view.downloaded_to, None);

    let (state, effects) = update(
        state,
        Msg::DownloadFinished {
            job_id: "j1".to_string(),
            result: Ok("output/out.pdf".to_string()),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.downloaded_to, None);
    assert_eq!(view.last_error, None);
    assert_eq!(view.job.unwrap().job_id, "j2");
}
