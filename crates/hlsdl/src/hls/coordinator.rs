// HLS Download Coordinator: drives one run from the playlist URL to the
// assembled output file and owns the run's scratch directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::HlsDownloaderError;
use crate::hls::assembler::Assembler;
use crate::hls::config::HlsConfig;
use crate::hls::events::{DownloadEvent, DownloadOutcome, OnEvent, RunState};
use crate::hls::fetcher::PlaylistSource;
use crate::hls::playlist::{MediaPlaylist, PlaylistKind, VariantDescriptor};
use crate::hls::scheduler::SegmentScheduler;
use crate::hls::segment::{SegmentDownloader, SegmentResult};
use crate::hls::selector::RenditionSelector;

const PLAYLIST_PREVIEW_LINES: usize = 10;

/// State carried through a single invocation.
struct DownloadRun {
    output: PathBuf,
    work_dir: TempDir,
    selected_variant: Option<VariantDescriptor>,
    /// One entry per segment, in playlist order.
    results: Vec<SegmentResult>,
    failed: usize,
    started: Instant,
}

impl DownloadRun {
    fn new(output: &Path, work_dir: TempDir) -> Self {
        Self {
            output: output.to_path_buf(),
            work_dir,
            selected_variant: None,
            results: Vec::new(),
            failed: 0,
            started: Instant::now(),
        }
    }

    fn record(&mut self, results: Vec<SegmentResult>) {
        self.failed = results.iter().filter(|r| !r.success).count();
        self.results = results;
    }

    fn total(&self) -> usize {
        self.results.len()
    }

    /// Paths of the downloaded segments, in playlist order.
    fn surviving_files(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.path.clone())
            .collect()
    }

    fn total_bytes(&self) -> u64 {
        self.results.iter().filter(|r| r.success).map(|r| r.bytes).sum()
    }
}

pub struct DownloadCoordinator {
    config: Arc<HlsConfig>,
    playlists: Arc<dyn PlaylistSource>,
    segment_downloader: Arc<dyn SegmentDownloader>,
    assembler: Arc<dyn Assembler>,
    on_event: Option<OnEvent>,
}

impl DownloadCoordinator {
    pub fn new(
        config: Arc<HlsConfig>,
        playlists: Arc<dyn PlaylistSource>,
        segment_downloader: Arc<dyn SegmentDownloader>,
        assembler: Arc<dyn Assembler>,
        on_event: Option<OnEvent>,
    ) -> Self {
        Self {
            config,
            playlists,
            segment_downloader,
            assembler,
            on_event,
        }
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    fn transition(&self, state: RunState) {
        debug!(state = %state, "Run state changed");
        self.emit(DownloadEvent::StateChanged(state));
    }

    fn create_work_dir(&self) -> Result<TempDir, HlsDownloaderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hlsdl-");
        let dir = match &self.config.output_config.temp_dir_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(dir)
    }

    /// Runs one download. Whatever the outcome, the scratch directory is gone
    /// by the time this returns.
    pub async fn run(
        &self,
        url: &Url,
        output: &Path,
        cancel: CancellationToken,
    ) -> Result<DownloadOutcome, HlsDownloaderError> {
        self.transition(RunState::Idle);

        let result = match self.create_work_dir() {
            Ok(work_dir) => {
                let mut run = DownloadRun::new(output, work_dir);
                let result = self.execute(&mut run, url, &cancel).await;

                self.transition(RunState::CleaningUp);
                let path = run.work_dir.path().to_path_buf();
                if let Err(e) = run.work_dir.close() {
                    warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
                } else {
                    debug!(path = %path.display(), "Removed scratch directory");
                }
                result
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => {
                info!(
                    output = %outcome.output.display(),
                    segments = outcome.downloaded_segments,
                    failed = outcome.failed_segments,
                    bytes = outcome.total_bytes,
                    elapsed = ?outcome.elapsed,
                    "Download finished"
                );
                self.transition(RunState::Done);
                self.emit(DownloadEvent::Finished(outcome.clone()));
            }
            Err(e) => {
                error!(error = %e, "Download failed");
                self.transition(RunState::Failed);
                self.emit(DownloadEvent::Failed(e.clone()));
            }
        }
        result
    }

    async fn execute(
        &self,
        run: &mut DownloadRun,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, HlsDownloaderError> {
        let media = self.resolve_media_playlist(run, url, cancel).await?;

        self.transition(RunState::Downloading);
        let total = media.len();
        self.emit(DownloadEvent::SegmentsDiscovered { total });
        info!(total, "Downloading segments");

        let scheduler = SegmentScheduler::new(
            Arc::clone(&self.segment_downloader),
            self.config.scheduler_config.download_concurrency,
            run.work_dir.path(),
            self.on_event.clone(),
        );
        run.record(scheduler.run(&media.segments, cancel).await?);
        self.check_failures(run)?;
        let files = run.surviving_files();

        if cancel.is_cancelled() {
            info!("Cancelled before assembly");
            return Err(HlsDownloaderError::Cancelled);
        }

        self.transition(RunState::Assembling);
        self.emit(DownloadEvent::AssemblyStarted {
            segments: files.len(),
        });
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HlsDownloaderError::Cancelled),
            result = self.assembler.assemble(&files, run.work_dir.path(), &run.output) => result?,
        }

        Ok(DownloadOutcome {
            output: run.output.clone(),
            total_segments: total,
            downloaded_segments: files.len(),
            failed_segments: run.failed,
            total_bytes: run.total_bytes(),
            selected_variant: run.selected_variant.clone(),
            elapsed: run.started.elapsed(),
        })
    }

    /// Fetches the input playlist and, for a master playlist, the selected
    /// rendition's media playlist.
    async fn resolve_media_playlist(
        &self,
        run: &mut DownloadRun,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<MediaPlaylist, HlsDownloaderError> {
        self.transition(RunState::FetchingPlaylist);
        let document = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HlsDownloaderError::Cancelled),
            document = self.playlists.fetch(url) => document?,
        };
        self.emit(DownloadEvent::PlaylistFetched {
            url: document.base.clone(),
            bytes: document.text.len(),
        });
        for line in document.preview(PLAYLIST_PREVIEW_LINES) {
            debug!(line, "playlist");
        }

        let variants = match document.parse()? {
            PlaylistKind::Media(media) => {
                info!(segments = media.len(), "Input is a media playlist");
                return Ok(media);
            }
            PlaylistKind::Variant(variants) => variants,
        };

        self.transition(RunState::Selecting);
        info!(variants = variants.len(), "Input is a master playlist");
        self.emit(DownloadEvent::VariantsDiscovered(variants.clone()));

        let selector =
            RenditionSelector::new(self.config.playlist_config.variant_selection_policy.clone());
        let selected = selector.select(&variants)?.clone();
        self.emit(DownloadEvent::VariantSelected(selected.clone()));

        self.transition(RunState::FetchingMedia);
        let document = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HlsDownloaderError::Cancelled),
            document = self.playlists.fetch(&selected.uri) => document?,
        };
        self.emit(DownloadEvent::PlaylistFetched {
            url: document.base.clone(),
            bytes: document.text.len(),
        });
        run.selected_variant = Some(selected);

        match document.parse()? {
            PlaylistKind::Media(media) => Ok(media),
            PlaylistKind::Variant(_) => Err(HlsDownloaderError::ParseError(
                "nested variant playlists are not supported".to_string(),
            )),
        }
    }

    /// Applies the failure policy to the recorded results.
    fn check_failures(&self, run: &DownloadRun) -> Result<(), HlsDownloaderError> {
        let (failed, total) = (run.failed, run.total());
        let threshold = self.config.output_config.failure_threshold;

        if failed as f64 / total as f64 > threshold || failed == total {
            error!(failed, total, threshold, "Too many segments failed");
            return Err(HlsDownloaderError::TooManyFailures { failed, total });
        }
        if failed > 0 {
            warn!(failed, total, "Continuing without failed segments");
        }
        Ok(())
    }
}
