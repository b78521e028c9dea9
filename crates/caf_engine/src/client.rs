use std::path::Path;

use caf_core::{JobCreationError, JobSnapshot, UploadResult, DEFAULT_PROMPT};
use caf_logging::{caf_debug, caf_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};

use crate::config::{ConfigError, Endpoints, ServiceConfig};
use crate::wire::{detail_message, CreateJobRequest, JobRecord, UploadResponse};
use crate::ServiceError;

/// Multipart field the service reads the upload from.
const UPLOAD_FIELD: &str = "file";

/// A local file ready to be sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(ToOwned::to_owned);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin");
        Ok(Self::new(file_name, bytes))
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let (_, extension) = file_name.rsplit_once('.')?;
    let content_type = match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(content_type)
}

/// Processed file returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedResult {
    /// Name announced in `Content-Disposition`, if any.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait JobService: Send + Sync {
    /// Sends one file; every failure is folded into [`UploadResult::Failed`].
    async fn submit_upload(&self, file: UploadFile) -> UploadResult;

    async fn create_job(
        &self,
        file_id: &str,
        prompt: &str,
    ) -> Result<JobSnapshot, JobCreationError>;

    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, ServiceError>;

    async fn download_result(&self, job_id: &str) -> Result<DownloadedResult, ServiceError>;

    fn download_url(&self, job_id: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobService {
    endpoints: Endpoints,
    client: reqwest::Client,
    max_download_bytes: u64,
}

impl ReqwestJobService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let endpoints = config.endpoints()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
        Ok(Self {
            endpoints,
            client,
            max_download_bytes: config.max_download_bytes,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Sends a request and returns the status and full body.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(reqwest::StatusCode, bytes::Bytes), ServiceError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok((status, body))
    }
}

#[async_trait::async_trait]
impl JobService for ReqwestJobService {
    async fn submit_upload(&self, file: UploadFile) -> UploadResult {
        if file.bytes.is_empty() {
            return UploadResult::failed(format!("{} is empty", file.file_name));
        }
        let url = self.endpoints.upload();
        caf_debug!(
            "POST {} file={} bytes={}",
            url,
            file.file_name,
            file.bytes.len()
        );

        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = match part.mime_str(content_type) {
                Ok(part) => part,
                Err(err) => return UploadResult::failed(err.to_string()),
            };
        }
        let form = Form::new().part(UPLOAD_FIELD, part);

        let (status, body) = match self.send(self.client.post(url).multipart(form)).await {
            Ok(response) => response,
            Err(err) => {
                caf_warn!("Upload failed: {}", err);
                return UploadResult::failed(err.to_string());
            }
        };
        if !status.is_success() {
            let message = detail_message(&body)
                .unwrap_or_else(|| format!("upload failed with status {status}"));
            caf_warn!("Upload rejected ({}): {}", status, message);
            return UploadResult::failed(message);
        }

        match serde_json::from_slice::<UploadResponse>(&body) {
            Ok(parsed) if !parsed.file_id.is_empty() => UploadResult::uploaded(parsed.file_id),
            Ok(_) => UploadResult::failed("upload response carried an empty fileId"),
            Err(err) => UploadResult::failed(format!("unexpected upload response: {err}")),
        }
    }

    async fn create_job(
        &self,
        file_id: &str,
        prompt: &str,
    ) -> Result<JobSnapshot, JobCreationError> {
        if file_id.trim().is_empty() {
            return Err(JobCreationError::MissingFileId);
        }
        let prompt = match prompt.trim() {
            "" => DEFAULT_PROMPT,
            trimmed => trimmed,
        };
        let url = self.endpoints.jobs();
        caf_debug!("POST {} fileId={} prompt_len={}", url, file_id, prompt.len());

        let request = self
            .client
            .post(url)
            .json(&CreateJobRequest { file_id, prompt });
        let (status, body) = self
            .send(request)
            .await
            .map_err(|err| JobCreationError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(JobCreationError::Rejected {
                status: status.as_u16(),
                message: detail_message(&body)
                    .unwrap_or_else(|| format!("job creation failed with status {status}")),
            });
        }

        let record: JobRecord = serde_json::from_slice(&body).map_err(|err| {
            JobCreationError::Transport(format!("unexpected job creation response: {err}"))
        })?;
        Ok(record.into())
    }

    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        if job_id.is_empty() {
            return Err(ServiceError::InvalidRequest("empty job id".to_string()));
        }
        let url = self.endpoints.job(job_id);
        caf_debug!("GET {}", url);

        let (status, body) = self.send(self.client.get(url)).await?;
        if !status.is_success() {
            return Err(ServiceError::HttpStatus {
                status: status.as_u16(),
                message: detail_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }
        let record: JobRecord =
            serde_json::from_slice(&body).map_err(|err| ServiceError::Decode(err.to_string()))?;
        Ok(record.into())
    }

    async fn download_result(&self, job_id: &str) -> Result<DownloadedResult, ServiceError> {
        if job_id.is_empty() {
            return Err(ServiceError::InvalidRequest("empty job id".to_string()));
        }
        let url = self.download_url(job_id);
        caf_debug!("GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ServiceError::HttpStatus {
                status: status.as_u16(),
                message: detail_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        let max_bytes = self.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ServiceError::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                });
            }
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(content_disposition_filename);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ServiceError::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(DownloadedResult { filename, bytes })
    }

    fn download_url(&self, job_id: &str) -> String {
        self.endpoints.download_url(job_id)
    }
}

/// Reads the plain `filename=` parameter of a `Content-Disposition` header.
fn content_disposition_filename(value: &str) -> Option<String> {
    value.split(';').find_map(|param| {
        let (key, raw) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = raw.trim().trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::Timeout(err.to_string());
    }
    if err.is_decode() {
        return ServiceError::Decode(err.to_string());
    }
    ServiceError::Network(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(guess_content_type("Photo.PNG"), Some("image/png"));
        assert_eq!(guess_content_type("scan.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("archive.tar.gz"), None);
        assert_eq!(guess_content_type("README"), None);
    }

    #[test]
    fn disposition_filename_is_extracted() {
        assert_eq!(
            content_disposition_filename(r#"attachment; filename="out.webp""#).as_deref(),
            Some("out.webp")
        );
        assert_eq!(
            content_disposition_filename("attachment; FILENAME=report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(content_disposition_filename("inline"), None);
        assert_eq!(
            content_disposition_filename("attachment; filename*=utf-8''a%20b.pdf"),
            None
        );
    }
}
