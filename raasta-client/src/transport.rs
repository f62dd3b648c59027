//! One upload attempt over HTTP
//!
//! [`Transport`] sends a prepared submission once and classifies the outcome. The retry
//! policy lives in the pipeline, so tests can swap in a scripted transport.

use async_trait::async_trait;
use futures::StreamExt;
use raasta_common::Report;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClientConfig;
use crate::draft::PreparedSubmission;
use crate::SubmitError;

const USER_AGENT: &str = concat!("raasta-client/", env!("CARGO_PKG_VERSION"));

/// Photo bytes are streamed in chunks of this size so progress can be reported
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Upload progress of one attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub attempt: u32,
    /// 0.0 to 1.0
    pub fraction: f64,
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Progress sink handed to a single attempt
#[derive(Clone)]
pub struct UploadProgress {
    attempt: u32,
    callback: Option<ProgressFn>,
}

impl UploadProgress {
    pub fn new(attempt: u32, callback: Option<ProgressFn>) -> Self {
        Self { attempt, callback }
    }

    pub fn silent() -> Self {
        Self::new(1, None)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn report(&self, sent: usize, total: usize) {
        if let Some(callback) = &self.callback {
            let fraction = if total == 0 {
                1.0
            } else {
                (sent as f64 / total as f64).min(1.0)
            };
            callback(Progress {
                attempt: self.attempt,
                fraction,
            });
        }
    }
}

/// Sends one create request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_report(
        &self,
        submission: &PreparedSubmission,
        bearer_token: Option<String>,
        progress: UploadProgress,
    ) -> Result<Report, SubmitError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Result<Self, SubmitError> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    fn build_form(submission: &PreparedSubmission, progress: &UploadProgress) -> Result<Form, SubmitError> {
        let mut form = Form::new();
        for (name, value) in &submission.fields {
            form = form.text(*name, value.clone());
        }

        if let Some(photo) = &submission.photo {
            let total = photo.bytes.len();
            let chunks: Vec<Vec<u8>> = photo
                .bytes
                .chunks(UPLOAD_CHUNK_BYTES)
                .map(<[u8]>::to_vec)
                .collect();

            let progress = progress.clone();
            let mut sent = 0usize;
            let stream = futures::stream::iter(chunks).map(move |chunk| {
                sent += chunk.len();
                progress.report(sent, total);
                Ok::<_, std::io::Error>(chunk)
            });

            let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total as u64)
                .file_name(photo.file_name.clone())
                .mime_str(&photo.content_type)?;
            form = form.part("photo", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send_report(
        &self,
        submission: &PreparedSubmission,
        bearer_token: Option<String>,
        progress: UploadProgress,
    ) -> Result<Report, SubmitError> {
        let form = Self::build_form(submission, &progress)?;

        let mut request = self
            .http
            .post(self.config.url("reports"))
            .header("Idempotency-Key", &submission.idempotency_key)
            .multipart(form);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        debug!(
            attempt = progress.attempt(),
            idempotency_key = %submission.idempotency_key,
            "Sending report"
        );
        let response = request.send().await?;
        let data: ReportData = read_envelope(response).await?;
        progress.report(1, 1);
        Ok(data.report)
    }
}

pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, SubmitError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| SubmitError::Unknown(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportData {
    pub report: Report,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    field: Option<String>,
}

/// Decode `{"status":"success","data":...}`, or classify the error response
pub(crate) async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SubmitError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| SubmitError::Unknown(format!("unexpected response body: {}", e)))?;
        return Ok(envelope.data);
    }

    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
    let (message, field) = match parsed {
        Some(ErrorBody {
            error: Some(detail), ..
        }) => (detail.message, detail.field),
        Some(ErrorBody {
            message: Some(message),
            ..
        }) => (message, None),
        _ => (
            status
                .canonical_reason()
                .unwrap_or("Server error occurred")
                .to_string(),
            None,
        ),
    };

    // Server-side validation keeps its field so callers can point at it.
    if let (400, Some(field)) = (status.as_u16(), field) {
        return Err(SubmitError::Validation { field, message });
    }
    Err(SubmitError::from_status(status.as_u16(), message))
}
