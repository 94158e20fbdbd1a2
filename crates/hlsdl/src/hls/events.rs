use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::HlsDownloaderError;
use super::playlist::VariantDescriptor;

/// Callback through which a run reports progress.
pub type OnEvent = Arc<dyn Fn(DownloadEvent) + Send + Sync>;

/// Lifecycle of a single download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FetchingPlaylist,
    Selecting,
    FetchingMedia,
    Downloading,
    Assembling,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::FetchingPlaylist => "fetching playlist",
            RunState::Selecting => "selecting rendition",
            RunState::FetchingMedia => "fetching media playlist",
            RunState::Downloading => "downloading segments",
            RunState::Assembling => "assembling",
            RunState::CleaningUp => "cleaning up",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary handed back when a run finishes successfully.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub output: PathBuf,
    pub total_segments: usize,
    pub downloaded_segments: usize,
    pub failed_segments: usize,
    pub total_bytes: u64,
    pub selected_variant: Option<VariantDescriptor>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    StateChanged(RunState),
    PlaylistFetched {
        url: Url,
        bytes: usize,
    },
    VariantsDiscovered(Vec<VariantDescriptor>),
    VariantSelected(VariantDescriptor),
    SegmentsDiscovered {
        total: usize,
    },
    SegmentCompleted {
        index: usize,
        completed: usize,
        total: usize,
        bytes: u64,
    },
    SegmentFailed {
        index: usize,
        completed: usize,
        total: usize,
        error: HlsDownloaderError,
    },
    AssemblyStarted {
        segments: usize,
    },
    Finished(DownloadOutcome),
    Failed(HlsDownloaderError),
}
