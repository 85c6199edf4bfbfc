//! Bounded upstream fetching with atomic writes into the cache

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ImageCacheConfig;
use crate::errors::{AppError, AppResult, ImageCacheError, ImageCacheResult};
use crate::utils::url::UrlUtils;

/// Why a fetch did not produce a cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// 200 without an `image/*` content type
    InvalidContentType,
    TooSmall { len: u64 },
    TooLarge { len: u64 },
    /// 404 or 410: the upstream image is gone for good
    NotFound(u16),
    /// 429 or 5xx
    ServerError(u16),
    /// Any other non-200 status
    UnexpectedStatus(u16),
    Timeout,
    NetworkError,
    WriteFailed,
}

impl FetchFailure {
    /// Permanent failures are recorded with a negative marker; everything
    /// else is retried on the next request.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn reason(&self) -> String {
        match self {
            Self::InvalidContentType => "invalid_content_type".to_string(),
            Self::TooSmall { .. } => "too_small".to_string(),
            Self::TooLarge { .. } => "too_large".to_string(),
            Self::NotFound(code) => format!("not_found_{code}"),
            Self::ServerError(code) => format!("server_error_{code}"),
            Self::UnexpectedStatus(code) => format!("unexpected_status_{code}"),
            Self::Timeout => "timeout".to_string(),
            Self::NetworkError => "network_error".to_string(),
            Self::WriteFailed => "write_failed".to_string(),
        }
    }

    /// Map a response status to a failure, `None` for 200
    pub fn from_status(status: StatusCode) -> Option<Self> {
        let code = status.as_u16();
        match status {
            StatusCode::OK => None,
            StatusCode::NOT_FOUND | StatusCode::GONE => Some(Self::NotFound(code)),
            StatusCode::TOO_MANY_REQUESTS => Some(Self::ServerError(code)),
            s if s.is_server_error() => Some(Self::ServerError(code)),
            _ => Some(Self::UnexpectedStatus(code)),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The body was validated and is now on disk at the destination
    Stored(Bytes),
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Stored(_))
    }

    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Stored(_) => None,
            Self::Failed(failure) => Some(failure.reason()),
        }
    }

    /// Metrics label: `stored` or the failure reason
    pub fn label(&self) -> String {
        self.failure_reason().unwrap_or_else(|| "stored".to_string())
    }
}

/// Fetches upstream images under a global concurrency ceiling
///
/// Cloning is cheap and clones share the same permits.
#[derive(Clone)]
pub struct ContentFetcher {
    client: Client,
    permits: Arc<Semaphore>,
    min_image_bytes: u64,
    max_image_bytes: u64,
}

impl ContentFetcher {
    pub fn new(config: &ImageCacheConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
            min_image_bytes: config.min_image_bytes,
            max_image_bytes: config.max_image_bytes,
        })
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Fetch `url` and store it atomically at `destination`
    ///
    /// Waits for a permit first; the permit is held until the write finishes
    /// or the attempt fails.
    pub async fn fetch(&self, url: &str, destination: &Path, timeout: Duration) -> FetchOutcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return FetchOutcome::Failed(FetchFailure::NetworkError);
        };

        let outcome = match self.download(url, timeout).await {
            Ok(body) => match write_atomically(destination, &body).await {
                Ok(()) => FetchOutcome::Stored(body),
                Err(e) => {
                    warn!("Failed to store fetched image: {}", e);
                    FetchOutcome::Failed(FetchFailure::WriteFailed)
                }
            },
            Err(failure) => FetchOutcome::Failed(failure),
        };

        debug!(
            url = %UrlUtils::obfuscate_credentials(url),
            destination = %destination.display(),
            outcome = %outcome.label(),
            "Upstream fetch finished"
        );
        outcome
    }

    async fn download(&self, url: &str, timeout: Duration) -> Result<Bytes, FetchFailure> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        if let Some(failure) = FetchFailure::from_status(response.status()) {
            return Err(failure);
        }

        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().to_ascii_lowercase().starts_with("image/"));
        if !is_image {
            return Err(FetchFailure::InvalidContentType);
        }

        if let Some(len) = response.content_length()
            && len > self.max_image_bytes
        {
            return Err(FetchFailure::TooLarge { len });
        }

        // Content-Length may be absent or wrong; cap while reading
        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| classify_transport_error(url, &e))?;
            let len = (body.len() + chunk.len()) as u64;
            if len > self.max_image_bytes {
                return Err(FetchFailure::TooLarge { len });
            }
            body.extend_from_slice(&chunk);
        }

        let len = body.len() as u64;
        if len < self.min_image_bytes {
            return Err(FetchFailure::TooSmall { len });
        }

        Ok(body.freeze())
    }
}

fn classify_transport_error(url: &str, error: &reqwest::Error) -> FetchFailure {
    let failure = if error.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::NetworkError
    };
    debug!(
        "Request to {} failed ({}): {}",
        UrlUtils::obfuscate_credentials(url),
        failure,
        error
    );
    failure
}

/// Hidden temp file in the destination's directory so the rename stays on
/// one filesystem
fn temp_path_for(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()))
}

/// Readers see either no file or the complete file, never a partial one
pub(crate) async fn write_atomically(destination: &Path, body: &[u8]) -> ImageCacheResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ImageCacheError::io(parent, e))?;
    }

    let temp = temp_path_for(destination);
    let result = async {
        fs::write(&temp, body)
            .await
            .map_err(|e| ImageCacheError::io(&temp, e))?;
        fs::rename(&temp, destination)
            .await
            .map_err(|e| ImageCacheError::io(destination, e))
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp).await;
    }
    result
}
