use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Local development instance of the processing service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Environment variable the CLI reads `--base-url` from.
pub const BASE_URL_ENV: &str = "CHANGEANYFILE_API_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid service base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    HttpClient(String),
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_download_bytes: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1500),
            max_download_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        Endpoints::new(&self.base_url)
    }
}

/// Addresses of the remote service routes, derived from one validated base url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let base = Url::parse(base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http or https url".to_string()));
        }
        Ok(Self { base })
    }

    pub fn upload(&self) -> Url {
        self.join(&["upload"])
    }

    pub fn jobs(&self) -> Url {
        self.join(&["jobs"])
    }

    pub fn job(&self, job_id: &str) -> Url {
        self.join(&["jobs", job_id])
    }

    /// Where the processed file of `job_id` can be fetched. Only meaningful
    /// once the job has completed; callers gate on status.
    pub fn download_url(&self, job_id: &str) -> String {
        self.join(&["download", "result", job_id]).to_string()
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Cannot fail: `new` rejects cannot-be-a-base urls.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
