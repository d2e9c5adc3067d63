use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use blogmover_core::repair_url;
use blogmover_logging::{migrate_debug, migrate_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, JobId, JobProgress, Stage};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Limit for HTML pages.
    pub max_bytes: u64,
    /// Limit for downloaded images and attachments.
    pub max_asset_bytes: u64,
    /// Accepted page content types; assets are not checked.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            max_asset_bytes: 64 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Forwards engine events to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(progress) => {
                migrate_debug!(
                    "Job {} at {:?} ({:?} bytes)",
                    progress.job_id,
                    progress.stage,
                    progress.bytes
                );
            }
            EngineEvent::PageCompleted { job_id, result } => match result {
                Ok(outcome) => migrate_debug!("Job {job_id} wrote {}", outcome.post_dir.display()),
                Err(message) => migrate_debug!("Job {job_id} failed: {message}"),
            },
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch an HTML page.
    async fn fetch(
        &self,
        job_id: JobId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError>;

    /// Fetch an image or attachment; any content type is accepted.
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Page,
    Asset,
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    /// Site whose permalinks get repaired after a failed request.
    website: Option<String>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            settings,
            website: None,
        }
    }

    /// Retry failed requests below `website` once with a repaired URL.
    pub fn with_repair(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    /// The repaired form of `url`, when it differs from the original.
    fn repaired(&self, url: &str) -> Option<String> {
        let website = self.website.as_deref()?;
        repair_url(website, url).filter(|fixed| fixed != url)
    }

    /// One request, then one more with the repaired URL if the failure looks
    /// like a mangled permalink.
    async fn get_with_repair(
        &self,
        job_id: JobId,
        url: &str,
        body: Body,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let first = self.get(job_id, url, url, body, sink).await;
        let err = match first {
            Ok(output) => return Ok(output),
            Err(err) => err,
        };
        if !err.kind.suggests_malformed_url() {
            return Err(err);
        }
        let Some(fixed) = self.repaired(url) else {
            return Err(err);
        };
        migrate_warn!("Request for {url} failed ({err}), retrying as {fixed}");
        self.get(job_id, url, &fixed, body, sink).await
    }

    async fn get(
        &self,
        job_id: JobId,
        original_url: &str,
        url: &str,
        body: Body,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;
        let max_bytes = match body {
            Body::Page => self.settings.max_bytes,
            Body::Asset => self.settings.max_asset_bytes,
        };

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if body == Body::Page {
            if let Some(ct) = content_type.as_deref() {
                if !self.is_content_type_allowed(ct) {
                    return Err(FetchError::new(
                        FailureKind::UnsupportedContentType {
                            content_type: ct.to_string(),
                        },
                        "unsupported content type",
                    ));
                }
            }
        }

        sink.emit(EngineEvent::Progress(JobProgress {
            job_id,
            stage: Stage::Downloading,
            bytes: Some(0),
        }));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
            sink.emit(EngineEvent::Progress(JobProgress {
                job_id,
                stage: Stage::Downloading,
                bytes: Some(bytes.len() as u64),
            }));
        }

        let metadata = FetchMetadata {
            original_url: original_url.to_string(),
            requested_url: url.to_string(),
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

/// Discards progress of asset downloads.
struct Silent;

impl ProgressSink for Silent {
    fn emit(&self, _event: EngineEvent) {}
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        job_id: JobId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        self.get_with_repair(job_id, url, Body::Page, sink).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let output = self.get(0, url, url, Body::Asset, &Silent).await?;
        Ok(output.bytes)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
