use std::fmt;

/// Job status as reported by the service.
///
/// `Other` keeps values this client does not know about; they are never
/// terminal, so polling continues until a known terminal value arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    /// Case-insensitive parse of a wire status value.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("queued") {
            JobStatus::Queued
        } else if normalized.eq_ignore_ascii_case("processing") {
            JobStatus::Processing
        } else if normalized.eq_ignore_ascii_case("completed") {
            JobStatus::Completed
        } else if normalized.eq_ignore_ascii_case("failed") {
            JobStatus::Failed
        } else {
            JobStatus::Other(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualCategory {
    Processing,
    Completed,
    Failed,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: String,
    pub category: VisualCategory,
}

/// Maps any status string to a display label and category.
///
/// Total over all inputs: `queued` and unknown values land in
/// [`VisualCategory::None`], and unknown values keep their own text as label.
pub fn classify_status(status: &str) -> StatusBadge {
    let (label, category) = match JobStatus::parse(status) {
        JobStatus::Queued => ("Queued", VisualCategory::None),
        JobStatus::Processing => ("Processing", VisualCategory::Processing),
        JobStatus::Completed => ("Completed", VisualCategory::Completed),
        JobStatus::Failed => ("Failed", VisualCategory::Failed),
        JobStatus::Other(raw) => {
            return StatusBadge {
                label: raw,
                category: VisualCategory::None,
            }
        }
    };
    StatusBadge {
        label: label.to_string(),
        category,
    }
}
