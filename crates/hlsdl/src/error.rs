use std::error::Error as StdError;

use crate::hls::HlsDownloaderError;

// Errors raised while setting up a download (client, URLs, proxy).
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(String),

    #[error("Invalid proxy configuration: {0}")]
    ProxyError(String),

    #[error("TLS configuration error: {0}")]
    TlsError(Box<dyn StdError + Send + Sync>),

    #[error("HLS error: {0}")]
    HlsError(#[from] HlsDownloaderError),
}

impl From<url::ParseError> for DownloadError {
    fn from(err: url::ParseError) -> Self {
        DownloadError::UrlError(err.to_string())
    }
}
