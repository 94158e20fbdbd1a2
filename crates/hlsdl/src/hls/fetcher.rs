// HLS Playlist Fetcher: retrieves playlist text over HTTP with bounded retries.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::playlist::PlaylistDocument;

#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<PlaylistDocument, HlsDownloaderError>;
}

pub struct PlaylistFetcher {
    http_client: Client,
    config: Arc<HlsConfig>,
}

impl PlaylistFetcher {
    pub fn new(http_client: Client, config: Arc<HlsConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<PlaylistDocument, HlsDownloaderError> {
        let response = self
            .http_client
            .get(url.clone())
            .timeout(self.config.playlist_config.playlist_fetch_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HlsDownloaderError::HttpStatusError {
                code: status,
                url: url.to_string(),
            });
        }

        // Relative references resolve against where the playlist actually lives.
        let base = response.url().clone();
        let text = response.text().await?;
        Ok(PlaylistDocument::new(text, base))
    }

    /// HEAD request used as a connectivity check. Never retried.
    pub async fn probe(&self, url: &Url) -> Result<StatusCode, HlsDownloaderError> {
        let response = self
            .http_client
            .head(url.clone())
            .timeout(self.config.playlist_config.playlist_fetch_timeout)
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl PlaylistSource for PlaylistFetcher {
    /// Fetches a playlist, retrying timeouts, connection failures and
    /// transient statuses with exponential backoff.
    async fn fetch(&self, url: &Url) -> Result<PlaylistDocument, HlsDownloaderError> {
        let max_attempts = self.config.playlist_config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(document) => {
                    debug!(url = %url, bytes = document.text.len(), attempt, "Playlist fetched");
                    return Ok(document);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.playlist_config.retry_delay_base
                        * 2_u32.pow(attempt - 1);
                    warn!(url = %url, attempt, error = %e, ?delay, "Playlist fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
