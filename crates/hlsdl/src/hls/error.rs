use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

/// Statuses worth another attempt when fetching playlists.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, thiserror::Error, Clone)]
pub enum HlsDownloaderError {
    #[error("Network error: {source}")]
    NetworkError {
        #[from]
        source: Arc<reqwest::Error>,
    },
    #[error("No data from {url} for {timeout:?}")]
    TimeoutError { url: String, timeout: Duration },
    #[error("HTTP status {code} for {url}")]
    HttpStatusError { code: StatusCode, url: String },
    #[error("Playlist parse error: {0}")]
    ParseError(String),
    #[error("Media playlist contains no segments")]
    EmptyPlaylistError,
    #[error("Segment {index} failed: {reason}")]
    SegmentDownloadError { index: usize, reason: String },
    #[error("Too many failed segments: {failed}/{total}")]
    TooManyFailures { failed: usize, total: usize },
    #[error("Assembly failed (exit code {exit_code:?}): {stderr}")]
    AssemblyError {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("Multiplexer not found: {}", tool.display())]
    ToolNotFoundError { tool: PathBuf },
    #[error("Assembly timed out after {timeout:?}")]
    AssemblyTimeout { timeout: Duration },
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: Arc<std::io::Error>,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl HlsDownloaderError {
    /// Whether a fresh attempt of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HlsDownloaderError::NetworkError { source } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            HlsDownloaderError::HttpStatusError { code, .. } => {
                RETRYABLE_STATUSES.contains(&code.as_u16())
            }
            HlsDownloaderError::TimeoutError { .. } => true,
            _ => false,
        }
    }
}

// Manual implementation of From<reqwest::Error> for HlsDownloaderError
// because of the Arc wrapping.
impl From<reqwest::Error> for HlsDownloaderError {
    fn from(err: reqwest::Error) -> Self {
        HlsDownloaderError::NetworkError {
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for HlsDownloaderError {
    fn from(err: std::io::Error) -> Self {
        HlsDownloaderError::IoError {
            source: Arc::new(err),
        }
    }
}
