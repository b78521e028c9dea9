use caf_core::{AppViewModel, JobStatus, UploadResult, VisualCategory};
use chrono::DateTime;

/// Turns successive view models into the progress lines printed on stdout.
/// Only changes since the previous call produce output.
#[derive(Debug, Default)]
pub struct Renderer {
    uploading_shown: bool,
    upload_shown: bool,
    job_status: Option<(String, JobStatus)>,
    logs_shown: usize,
    outcome_shown: bool,
    downloaded_shown: Option<String>,
    last_error: Option<String>,
}

impl Renderer {
    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        if view.uploading && !self.uploading_shown {
            self.uploading_shown = true;
            let file = view.selected_file.as_deref().unwrap_or("file");
            lines.push(format!("Uploading {file}..."));
        }
        if let Some(UploadResult::Uploaded { file_id }) = &view.upload {
            if !self.upload_shown {
                self.upload_shown = true;
                lines.push(format!("Uploaded (file id {file_id})"));
            }
        }

        if let Some(job) = &view.job {
            let current = (job.job_id.clone(), job.status.clone());
            let is_new_job = self
                .job_status
                .as_ref()
                .map_or(true, |(id, _)| *id != job.job_id);
            if is_new_job {
                self.logs_shown = 0;
                self.outcome_shown = false;
                lines.push(format!(
                    "Job {} created {}",
                    job.job_id,
                    format_timestamp(job.created_at)
                ));
            }
            if self.job_status.as_ref() != Some(&current) {
                lines.push(format!("Job {} [{}]", job.job_id, job.badge.label));
                self.job_status = Some(current);
            }

            if job.logs.len() > self.logs_shown {
                for line in &job.logs[self.logs_shown..] {
                    lines.push(format!("  > {line}"));
                }
            }
            self.logs_shown = job.logs.len();

            if !self.outcome_shown {
                match job.badge.category {
                    VisualCategory::Completed => {
                        self.outcome_shown = true;
                        if let Some(result) = &job.result {
                            lines.push(format!(
                                "Result: {} ({})",
                                result.filename,
                                format_size(result.size)
                            ));
                        }
                    }
                    VisualCategory::Failed => {
                        self.outcome_shown = true;
                        let reason = job.failure_reason.as_deref().unwrap_or("no reason given");
                        lines.push(format!("Failed: {reason}"));
                    }
                    VisualCategory::Processing | VisualCategory::None => {}
                }
            }
        }

        if view.downloaded_to.is_some() && view.downloaded_to != self.downloaded_shown {
            self.downloaded_shown = view.downloaded_to.clone();
            if let Some(path) = &view.downloaded_to {
                lines.push(format!("Saved to {path}"));
            }
        }

        if view.last_error != self.last_error {
            self.last_error = view.last_error.clone();
            if let Some(message) = &view.last_error {
                lines.push(format!("error: {message}"));
            }
        }

        lines
    }
}

/// Unix seconds as a UTC wall-clock time.
pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
