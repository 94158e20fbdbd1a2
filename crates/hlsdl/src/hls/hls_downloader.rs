use std::path::Path;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::{DownloadError, create_client};

use super::{
    DownloadCoordinator, DownloadOutcome, FfmpegAssembler, HlsConfig, HttpSegmentDownloader,
    OnEvent, PlaylistFetcher,
};

/// Entry point for downloading one HLS stream to a file.
pub struct HlsDownloader {
    client: Client,
    config: HlsConfig,
}

impl HlsDownloader {
    pub fn new(config: HlsConfig) -> Result<Self, DownloadError> {
        config.validate()?;
        let client = create_client(&config.base)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Connectivity check against the playlist URL (HEAD request).
    pub async fn probe(&self, url: &str) -> Result<StatusCode, DownloadError> {
        let url = Url::parse(url)?;
        let fetcher = PlaylistFetcher::new(self.client.clone(), Arc::new(self.config.clone()));
        Ok(fetcher.probe(&url).await?)
    }

    /// Downloads the stream behind `url` into `output`.
    ///
    /// Progress is reported through `on_event`; cancelling `cancel` aborts the
    /// run, and the scratch directory is removed on every path.
    pub async fn download(
        &self,
        url: &str,
        output: impl AsRef<Path>,
        on_event: Option<OnEvent>,
        cancel: CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        let url = Url::parse(url)?;
        let config = Arc::new(self.config.clone());
        debug!(url = %url, output = %output.as_ref().display(), "Starting HLS download");

        let coordinator = DownloadCoordinator::new(
            Arc::clone(&config),
            Arc::new(PlaylistFetcher::new(self.client.clone(), Arc::clone(&config))),
            Arc::new(HttpSegmentDownloader::new(
                self.client.clone(),
                Arc::clone(&config),
            )),
            Arc::new(FfmpegAssembler::new(&config.assembler_config)),
            on_event,
        );

        Ok(coordinator.run(&url, output.as_ref(), cancel).await?)
    }
}
