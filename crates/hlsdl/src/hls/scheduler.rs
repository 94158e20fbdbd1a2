// HLS Segment Scheduler: fans segment downloads out over a bounded number of
// concurrent tasks and collects the results back into playlist order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hls::HlsDownloaderError;
use crate::hls::events::{DownloadEvent, OnEvent};
use crate::hls::playlist::Segment;
use crate::hls::segment::{SegmentDownloader, SegmentResult};

pub struct SegmentScheduler {
    segment_downloader: Arc<dyn SegmentDownloader>,
    download_concurrency: usize,
    work_dir: PathBuf,
    on_event: Option<OnEvent>,
}

impl SegmentScheduler {
    pub fn new(
        segment_downloader: Arc<dyn SegmentDownloader>,
        download_concurrency: usize,
        work_dir: &Path,
        on_event: Option<OnEvent>,
    ) -> Self {
        Self {
            segment_downloader,
            download_concurrency: download_concurrency.max(1),
            work_dir: work_dir.to_path_buf(),
            on_event,
        }
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    /// Downloads every segment and returns one result per segment, in the
    /// order of `segments`. Returns `Cancelled` as soon as `cancel` fires;
    /// in-flight requests are dropped.
    pub async fn run(
        &self,
        segments: &[Segment],
        cancel: &CancellationToken,
    ) -> Result<Vec<SegmentResult>, HlsDownloaderError> {
        let total = segments.len();
        // One slot per position so completion order cannot leak into output order.
        let mut slots: Vec<Option<SegmentResult>> = vec![None; total];
        let mut pending = segments.iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut completed = 0usize;

        info!(total, concurrency = self.download_concurrency, "SegmentScheduler started.");

        loop {
            while in_flight.len() < self.download_concurrency {
                if cancel.is_cancelled() {
                    info!(completed, total, "Cancelled before dispatching remaining segments");
                    return Err(HlsDownloaderError::Cancelled);
                }
                let Some((position, segment)) = pending.next() else {
                    break;
                };

                let downloader = Arc::clone(&self.segment_downloader);
                let dest = self.work_dir.join(segment.file_name());
                let segment = segment.clone();
                debug!(index = segment.index, uri = %segment.uri, "Dispatching segment");
                in_flight.push(async move {
                    let result = downloader.download(&segment, &dest).await;
                    (position, result)
                });
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(completed, total, in_flight = in_flight.len(), "Cancellation requested, abandoning in-flight segments");
                    return Err(HlsDownloaderError::Cancelled);
                }

                Some((position, result)) = in_flight.next() => {
                    completed += 1;
                    let index = result.segment.index;
                    if result.success {
                        self.emit(DownloadEvent::SegmentCompleted {
                            index,
                            completed,
                            total,
                            bytes: result.bytes,
                        });
                    } else {
                        let error = result.error.clone().unwrap_or_else(|| {
                            HlsDownloaderError::SegmentDownloadError {
                                index,
                                reason: "unknown failure".to_string(),
                            }
                        });
                        warn!(index, completed, total, error = %error, "Segment permanently failed");
                        self.emit(DownloadEvent::SegmentFailed {
                            index,
                            completed,
                            total,
                            error,
                        });
                    }
                    slots[position] = Some(result);
                }
            }
        }

        info!(completed, total, "SegmentScheduler finished.");
        Ok(slots.into_iter().flatten().collect())
    }
}
