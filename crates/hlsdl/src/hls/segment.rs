// HLS Segment Downloader: streams one media segment to disk with retry logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::playlist::Segment;

/// Outcome of downloading one segment. Failures are recorded here, not raised.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub segment: Segment,
    pub path: PathBuf,
    pub bytes: u64,
    pub success: bool,
    pub error: Option<HlsDownloaderError>,
}

impl SegmentResult {
    pub fn succeeded(segment: Segment, path: PathBuf, bytes: u64) -> Self {
        Self {
            segment,
            path,
            bytes,
            success: true,
            error: None,
        }
    }

    pub fn failed(segment: Segment, path: PathBuf, error: HlsDownloaderError) -> Self {
        Self {
            segment,
            path,
            bytes: 0,
            success: false,
            error: Some(error),
        }
    }
}

#[async_trait]
pub trait SegmentDownloader: Send + Sync {
    /// Downloads `segment` into `dest`. Never fails the run: exhaustion is
    /// reported through `SegmentResult::success`.
    async fn download(&self, segment: &Segment, dest: &Path) -> SegmentResult;
}

pub struct HttpSegmentDownloader {
    http_client: Client,
    config: Arc<HlsConfig>,
}

impl HttpSegmentDownloader {
    pub fn new(http_client: Client, config: Arc<HlsConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// One attempt; the destination is truncated so a retry overwrites it.
    ///
    /// `segment_download_timeout` bounds the wait for the response head and
    /// each gap between body chunks, not the whole transfer.
    async fn fetch_to_file(&self, segment: &Segment, dest: &Path) -> Result<u64, HlsDownloaderError> {
        let idle_timeout = self.config.fetcher_config.segment_download_timeout;
        let stalled = || HlsDownloaderError::TimeoutError {
            url: segment.uri.to_string(),
            timeout: idle_timeout,
        };

        let response = tokio::time::timeout(
            idle_timeout,
            self.http_client.get(segment.uri.clone()).send(),
        )
        .await
        .map_err(|_| stalled())??;

        let status = response.status();
        if !status.is_success() {
            return Err(HlsDownloaderError::HttpStatusError {
                code: status,
                url: segment.uri.to_string(),
            });
        }

        let mut file = File::create(dest).await?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = tokio::time::timeout(idle_timeout, body.next())
            .await
            .map_err(|_| stalled())?
        {
            let chunk: Bytes = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl SegmentDownloader for HttpSegmentDownloader {
    async fn download(&self, segment: &Segment, dest: &Path) -> SegmentResult {
        let max_attempts = self.config.fetcher_config.max_segment_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_to_file(segment, dest).await {
                Ok(bytes) => {
                    debug!(index = segment.index, bytes, attempt, "Segment downloaded");
                    return SegmentResult::succeeded(segment.clone(), dest.to_path_buf(), bytes);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.fetcher_config.retry_delay(attempt);
                    warn!(
                        index = segment.index,
                        uri = %segment.uri,
                        attempt,
                        error = %e,
                        ?delay,
                        "Segment attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(index = segment.index, uri = %segment.uri, attempt, error = %e, "Segment failed");
                    // A partial file must never reach the manifest.
                    let _ = tokio::fs::remove_file(dest).await;
                    let error = HlsDownloaderError::SegmentDownloadError {
                        index: segment.index,
                        reason: e.to_string(),
                    };
                    return SegmentResult::failed(segment.clone(), dest.to_path_buf(), error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StubResponse, spawn_stub_server};
    use crate::{DownloaderConfig, create_client};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn downloader() -> HttpSegmentDownloader {
        let config = HlsConfig::builder()
            .with_base_config(DownloaderConfig::builder().with_system_proxy(false).build())
            .segment_retry_delay(Duration::from_millis(10), Duration::from_millis(40))
            .build();
        let client = create_client(&config.base).unwrap();
        HttpSegmentDownloader::new(client, Arc::new(config))
    }

    #[tokio::test]
    async fn streams_body_to_destination() {
        crate::init_test_tracing!();
        let payload = vec![0x47u8; 64 * 1024];
        let server = spawn_stub_server(vec![StubResponse::ok(payload.clone())]).await;
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            index: 7,
            uri: server.url("/seg7.ts"),
        };
        let dest = dir.path().join(segment.file_name());

        let result = downloader().download(&segment, &dest).await;

        assert!(result.success);
        assert_eq!(result.bytes, payload.len() as u64);
        assert_eq!(result.path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), payload);
    }

    #[tokio::test]
    async fn retry_overwrites_previous_attempt() {
        let server = spawn_stub_server(vec![
            StubResponse::status(500),
            StubResponse::ok("second"),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("segment_0000000000.ts");
        std::fs::write(&dest, "stale content from somewhere else").unwrap();
        let segment = Segment {
            index: 0,
            uri: server.url("/seg0.ts"),
        };

        let result = downloader().download(&segment, &dest).await;

        assert!(result.success);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "second");
        assert_eq!(server.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_is_recorded_not_raised() {
        let server = spawn_stub_server(vec![StubResponse::status(503)]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("segment_0000000003.ts");
        let segment = Segment {
            index: 3,
            uri: server.url("/seg3.ts"),
        };

        let result = downloader().download(&segment, &dest).await;

        assert!(!result.success);
        assert_eq!(result.bytes, 0);
        assert!(matches!(
            result.error,
            Some(HlsDownloaderError::SegmentDownloadError { index: 3, .. })
        ));
        assert_eq!(server.hits.load(Ordering::SeqCst), 3);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = spawn_stub_server(vec![StubResponse::status(404)]).await;
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            index: 1,
            uri: server.url("/gone.ts"),
        };

        let result = downloader()
            .download(&segment, &dir.path().join(segment.file_name()))
            .await;

        assert!(!result.success);
        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_but_steady_body_is_not_cut_off() {
        // 10 bytes at 150 ms intervals: longer overall than the timeout,
        // but never idle for that long.
        let server = spawn_stub_server(vec![StubResponse::trickle(
            vec![0x47u8; 10],
            Duration::from_millis(150),
        )])
        .await;
        let config = HlsConfig::builder()
            .with_base_config(DownloaderConfig::builder().with_system_proxy(false).build())
            .segment_timeout(Duration::from_secs(1))
            .segment_retry_delay(Duration::from_millis(10), Duration::from_millis(40))
            .build();
        let client = create_client(&config.base).unwrap();
        let downloader = HttpSegmentDownloader::new(client, Arc::new(config));
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            index: 0,
            uri: server.url("/seg0.ts"),
        };

        let result = downloader
            .download(&segment, &dir.path().join(segment.file_name()))
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.bytes, 10);
        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_body_is_retried() {
        let server = spawn_stub_server(vec![
            StubResponse::stall(vec![0x47u8; 4], 188),
            StubResponse::ok(vec![0x47u8; 188]),
        ])
        .await;
        let config = HlsConfig::builder()
            .with_base_config(DownloaderConfig::builder().with_system_proxy(false).build())
            .segment_timeout(Duration::from_millis(300))
            .segment_retry_delay(Duration::from_millis(10), Duration::from_millis(40))
            .build();
        let client = create_client(&config.base).unwrap();
        let downloader = HttpSegmentDownloader::new(client, Arc::new(config));
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            index: 2,
            uri: server.url("/seg2.ts"),
        };
        let dest = dir.path().join(segment.file_name());

        let result = downloader.download(&segment, &dest).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.bytes, 188);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 188);
        assert_eq!(server.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stalled_body_exhausts_attempts() {
        let server = spawn_stub_server(vec![StubResponse::stall(vec![0x47u8; 4], 188)]).await;
        let config = HlsConfig::builder()
            .with_base_config(DownloaderConfig::builder().with_system_proxy(false).build())
            .segment_timeout(Duration::from_millis(200))
            .segment_retry_delay(Duration::from_millis(10), Duration::from_millis(40))
            .build();
        let client = create_client(&config.base).unwrap();
        let downloader = HttpSegmentDownloader::new(client, Arc::new(config));
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment {
            index: 5,
            uri: server.url("/seg5.ts"),
        };
        let dest = dir.path().join(segment.file_name());

        let result = downloader.download(&segment, &dest).await;

        assert!(!result.success);
        assert_eq!(server.hits.load(Ordering::SeqCst), 3);
        assert!(!dest.exists());
    }
}
